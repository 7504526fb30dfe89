//! Route definitions for category presets.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::presets;
use crate::state::AppState;

/// Routes mounted at `/presets`.
///
/// ```text
/// GET    /                               -> list
/// POST   /                               -> create
/// GET    /{id}                           -> get_by_id
/// PUT    /{id}                           -> update
/// DELETE /{id}                           -> delete
/// POST   /{id}/copy                      -> copy
/// GET    /{id}/preview                   -> preview
/// POST   /{id}/categories                -> add_category
/// DELETE /{id}/categories/{category_id}  -> remove_category
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(presets::list).post(presets::create))
        .route(
            "/{id}",
            get(presets::get_by_id)
                .put(presets::update)
                .delete(presets::delete),
        )
        .route("/{id}/copy", post(presets::copy))
        .route("/{id}/preview", get(presets::preview))
        .route("/{id}/categories", post(presets::add_category))
        .route(
            "/{id}/categories/{category_id}",
            delete(presets::remove_category),
        )
}
