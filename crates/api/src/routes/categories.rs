//! Route definitions for categories and their rule memberships.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::{categories, stats};
use crate::state::AppState;

/// Routes mounted at `/categories`.
///
/// ```text
/// GET    /                    -> list
/// POST   /                    -> create
/// GET    /stats               -> stats::category_usage
/// GET    /{id}                -> get_by_id
/// PUT    /{id}                -> update
/// DELETE /{id}                -> delete
/// POST   /{id}/copy           -> copy
/// GET    /{id}/rules          -> list_rules
/// POST   /{id}/rules          -> add_rule
/// PUT    /{id}/rules/reorder  -> reorder_rules
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route("/stats", get(stats::category_usage))
        .route(
            "/{id}",
            get(categories::get_by_id)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/{id}/copy", post(categories::copy))
        .route(
            "/{id}/rules",
            get(categories::list_rules).post(categories::add_rule),
        )
        .route("/{id}/rules/reorder", put(categories::reorder_rules))
}

/// Routes mounted at `/category-rules`.
///
/// ```text
/// DELETE /{id}  -> remove_rule
/// ```
pub fn membership_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(categories::remove_rule))
}
