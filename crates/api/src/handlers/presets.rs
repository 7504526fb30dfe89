//! Handlers for the `/presets` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rulekeeper_core::error::CoreError;
use rulekeeper_core::types::DbId;
use rulekeeper_core::validation::validate_input;
use rulekeeper_db::models::preset::{CreatePreset, UpdatePreset};
use rulekeeper_db::repositories::PresetRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for adding a category to a preset or a template.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCategoryRequest {
    pub category_id: DbId,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "CategoryPreset",
        id,
    })
}

/// GET /api/v1/presets
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let presets = PresetRepo::list_with_items(&state.pool).await?;
    Ok(Json(DataResponse { data: presets }))
}

/// POST /api/v1/presets
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreatePreset>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let preset = PresetRepo::create(&state.pool, &input).await?;
    tracing::info!(id = preset.id, name = %preset.name, "Preset created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: preset })))
}

/// GET /api/v1/presets/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let preset = PresetRepo::find_with_items(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: preset }))
}

/// PUT /api/v1/presets/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePreset>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let preset = PresetRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(id, "Preset updated");
    Ok(Json(DataResponse { data: preset }))
}

/// DELETE /api/v1/presets/{id}
///
/// Template memberships added through this preset stay, with their
/// provenance cleared.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !PresetRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(id, "Preset deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/presets/{id}/copy
pub async fn copy(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let copy = PresetRepo::copy(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(source_id = id, id = copy.preset.id, "Preset copied");
    Ok((StatusCode::CREATED, Json(DataResponse { data: copy })))
}

/// GET /api/v1/presets/{id}/preview
///
/// The preset's categories in order, each with the titles of its rules.
pub async fn preview(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let preview = PresetRepo::preview(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/presets/{id}/categories
pub async fn add_category(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    let item = PresetRepo::add_category(&state.pool, id, input.category_id).await?;
    tracing::info!(
        preset_id = id,
        category_id = input.category_id,
        sort_order = item.sort_order,
        "Category added to preset"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// DELETE /api/v1/presets/{id}/categories/{category_id}
pub async fn remove_category(
    State(state): State<AppState>,
    Path((id, category_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if !PresetRepo::remove_category(&state.pool, id, category_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "CategoryPresetItem",
            id: category_id,
        }));
    }
    tracing::info!(preset_id = id, category_id, "Category removed from preset");
    Ok(StatusCode::NO_CONTENT)
}
