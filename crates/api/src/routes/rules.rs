//! Route definitions for master rules.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{rules, stats};
use crate::state::AppState;

/// Routes mounted at `/rules`.
///
/// ```text
/// GET    /            -> list
/// POST   /            -> create
/// GET    /stats       -> stats::rule_usage
/// GET    /{id}        -> get_by_id
/// PUT    /{id}        -> update
/// DELETE /{id}        -> delete
/// POST   /{id}/copy   -> copy
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rules::list).post(rules::create))
        .route("/stats", get(stats::rule_usage))
        .route(
            "/{id}",
            get(rules::get_by_id)
                .put(rules::update)
                .delete(rules::delete),
        )
        .route("/{id}/copy", post(rules::copy))
}
