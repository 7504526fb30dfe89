//! Handlers for the `/snapshots` resource.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use rulekeeper_core::error::CoreError;
use rulekeeper_core::rule::RuleContent;
use rulekeeper_core::snapshot::SnapshotAction;
use rulekeeper_core::types::DbId;
use rulekeeper_core::validation::validate_input;
use rulekeeper_db::repositories::SnapshotRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for resolving a snapshot.
///
/// `action` stays a string so an unknown value reports `INVALID_ACTION`
/// rather than a generic body rejection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveSnapshotRequest {
    pub action: String,
    pub custom_content: Option<RuleContent>,
}

/// GET /api/v1/snapshots/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = SnapshotRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "RuleSnapshot",
            id,
        }))?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// PUT /api/v1/snapshots/{id}
///
/// Resolve a snapshot with `update`, `keep` or `customize`. `customize`
/// requires `custom_content` with all eight content fields.
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResolveSnapshotRequest>,
) -> AppResult<impl IntoResponse> {
    let action: SnapshotAction = input.action.parse()?;
    if let Some(custom) = &input.custom_content {
        validate_input(custom)?;
    }

    let snapshot = SnapshotRepo::resolve(&state.pool, id, action, input.custom_content).await?;
    tracing::info!(
        id,
        template_id = snapshot.template_id,
        action = %action,
        "Snapshot resolved"
    );
    Ok(Json(DataResponse { data: snapshot }))
}
