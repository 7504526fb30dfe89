//! Handlers for the `/templates` resource: CRUD, category composition,
//! Markdown generation and outdated snapshot review.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rulekeeper_core::error::CoreError;
use rulekeeper_core::markdown;
use rulekeeper_core::ordering::ReorderDirection;
use rulekeeper_core::types::DbId;
use rulekeeper_core::validation::validate_input;
use rulekeeper_db::models::template::{CreateTemplate, UpdateTemplate};
use rulekeeper_db::repositories::{SnapshotRepo, TemplateRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::presets::AddCategoryRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for applying a preset to a template.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddPresetRequest {
    pub preset_id: DbId,
}

/// Request body for moving a template category one step.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderCategoriesRequest {
    pub category_id: DbId,
    pub direction: ReorderDirection,
}

/// Rendered Markdown as returned by the generate endpoint.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub content: String,
    pub filename: String,
}

/// Rendered Markdown plus a summary of the template it came from.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub content: String,
    pub template: PreviewSummary,
}

#[derive(Debug, Serialize)]
pub struct PreviewSummary {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub category_count: usize,
    pub rule_count: usize,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Template",
        id,
    })
}

async fn ensure_exists(state: &AppState, id: DbId) -> AppResult<()> {
    TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Template CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/templates
///
/// List templates newest first with their category and rule counts.
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list_summaries(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/templates
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let template = TemplateRepo::create(&state.pool, &input).await?;
    tracing::info!(id = template.id, name = %template.name, "Template created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/templates/{id}
///
/// The template with its full category and rule tree.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let tree = TemplateRepo::find_tree(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: tree }))
}

/// PUT /api/v1/templates/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTemplate>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let template = TemplateRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(id, "Template updated");
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/templates/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !TemplateRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(id, "Template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/copy
///
/// Copies name, description and category memberships. The copy starts
/// without snapshots.
pub async fn copy(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let copy = TemplateRepo::copy(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(source_id = id, id = copy.id, "Template copied");
    Ok((StatusCode::CREATED, Json(DataResponse { data: copy })))
}

// ---------------------------------------------------------------------------
// Category composition
// ---------------------------------------------------------------------------

/// GET /api/v1/templates/{id}/categories
pub async fn list_categories(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_exists(&state, id).await?;

    let memberships = TemplateRepo::list_memberships(&state.pool, id).await?;
    Ok(Json(DataResponse { data: memberships }))
}

/// POST /api/v1/templates/{id}/categories
///
/// Appends the category after the current last one.
pub async fn add_category(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    let membership = TemplateRepo::add_category(&state.pool, id, input.category_id).await?;
    tracing::info!(
        template_id = id,
        category_id = input.category_id,
        sort_order = membership.sort_order,
        "Category added to template"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: membership })))
}

/// PUT /api/v1/templates/{id}/categories/reorder
///
/// Swaps the category with its direct neighbour in `direction`.
pub async fn reorder_categories(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReorderCategoriesRequest>,
) -> AppResult<impl IntoResponse> {
    let memberships =
        TemplateRepo::swap_adjacent(&state.pool, id, input.category_id, input.direction).await?;
    tracing::info!(
        template_id = id,
        category_id = input.category_id,
        direction = %input.direction,
        "Template category moved"
    );
    Ok(Json(DataResponse { data: memberships }))
}

/// DELETE /api/v1/templates/{id}/categories/{category_id}
pub async fn remove_category(
    State(state): State<AppState>,
    Path((id, category_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if !TemplateRepo::remove_category(&state.pool, id, category_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "TemplateCategory",
            id: category_id,
        }));
    }
    tracing::info!(template_id = id, category_id, "Category removed from template");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/add-preset
///
/// Appends every preset category the template does not have yet.
/// Returns 400 `NOTHING_TO_ADD` when all of them are already present.
pub async fn add_preset(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddPresetRequest>,
) -> AppResult<impl IntoResponse> {
    let result = TemplateRepo::apply_preset(&state.pool, id, input.preset_id).await?;
    tracing::info!(
        template_id = id,
        preset_id = input.preset_id,
        added = result.added,
        skipped = result.skipped,
        "Preset applied to template"
    );
    Ok(Json(DataResponse { data: result }))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// POST /api/v1/templates/{id}/generate
///
/// Freezes a snapshot for every rule reachable from the template that has
/// none yet, then renders the template to Markdown.
pub async fn generate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let generated = SnapshotRepo::ensure_for_template(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let document = generated.tree.document();
    let response = GenerateResponse {
        content: markdown::render(&document),
        filename: markdown::filename(document.name),
    };
    tracing::info!(
        id,
        snapshots_created = generated.created,
        rules = document.rule_count(),
        "Template generated"
    );
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/templates/{id}/preview
///
/// Renders the template without touching snapshots.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let tree = TemplateRepo::find_tree(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let document = tree.document();
    let response = PreviewResponse {
        content: markdown::render(&document),
        template: PreviewSummary {
            id: tree.template.id,
            name: tree.template.name.clone(),
            description: tree.template.description.clone(),
            category_count: document.category_count(),
            rule_count: document.rule_count(),
        },
    };
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/templates/{id}/outdated
///
/// Outdated snapshots of the template, each next to the live rule content.
pub async fn list_outdated(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_exists(&state, id).await?;

    let outdated = SnapshotRepo::list_outdated(&state.pool, id).await?;
    Ok(Json(DataResponse { data: outdated }))
}
