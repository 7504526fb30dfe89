//! Route definitions for rule snapshots.

use axum::routing::get;
use axum::Router;

use crate::handlers::snapshots;
use crate::state::AppState;

/// Routes mounted at `/snapshots`.
///
/// ```text
/// GET    /{id}  -> get_by_id
/// PUT    /{id}  -> resolve
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(snapshots::get_by_id).put(snapshots::resolve))
}
