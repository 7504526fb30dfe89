//! Route definitions for templates, their composition and generation.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /                               -> list
/// POST   /                               -> create
/// GET    /{id}                           -> get_by_id
/// PUT    /{id}                           -> update
/// DELETE /{id}                           -> delete
/// POST   /{id}/copy                      -> copy
/// GET    /{id}/categories                -> list_categories
/// POST   /{id}/categories                -> add_category
/// PUT    /{id}/categories/reorder        -> reorder_categories
/// DELETE /{id}/categories/{category_id}  -> remove_category
/// POST   /{id}/add-preset                -> add_preset
/// POST   /{id}/generate                  -> generate
/// GET    /{id}/preview                   -> preview
/// GET    /{id}/outdated                  -> list_outdated
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::list).post(templates::create))
        .route(
            "/{id}",
            get(templates::get_by_id)
                .put(templates::update)
                .delete(templates::delete),
        )
        .route("/{id}/copy", post(templates::copy))
        .route(
            "/{id}/categories",
            get(templates::list_categories).post(templates::add_category),
        )
        .route(
            "/{id}/categories/reorder",
            put(templates::reorder_categories),
        )
        .route(
            "/{id}/categories/{category_id}",
            delete(templates::remove_category),
        )
        .route("/{id}/add-preset", post(templates::add_preset))
        .route("/{id}/generate", post(templates::generate))
        .route("/{id}/preview", get(templates::preview))
        .route("/{id}/outdated", get(templates::list_outdated))
}
