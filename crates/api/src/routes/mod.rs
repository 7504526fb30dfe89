pub mod categories;
pub mod health;
pub mod presets;
pub mod rules;
pub mod snapshots;
pub mod templates;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /stats                                           global row counts
///
/// /rules                                           list, create
/// /rules/stats                                     per-rule usage
/// /rules/{id}                                      get, replace, delete
/// /rules/{id}/copy                                 copy (POST)
///
/// /categories                                      list, create
/// /categories/stats                                per-category usage
/// /categories/{id}                                 get, update, delete
/// /categories/{id}/copy                            copy (POST)
/// /categories/{id}/rules                           list, add rule
/// /categories/{id}/rules/reorder                   dense reorder (PUT)
/// /category-rules/{id}                             remove rule (DELETE)
///
/// /presets                                         list, create
/// /presets/{id}                                    get, update, delete
/// /presets/{id}/copy                               copy (POST)
/// /presets/{id}/preview                            flattened rules
/// /presets/{id}/categories                         append category (POST)
/// /presets/{id}/categories/{category_id}           remove category
///
/// /templates                                       list, create
/// /templates/{id}                                  get tree, update, delete
/// /templates/{id}/copy                             copy (POST)
/// /templates/{id}/categories                       list, append category
/// /templates/{id}/categories/reorder               adjacent swap (PUT)
/// /templates/{id}/categories/{category_id}         remove category
/// /templates/{id}/add-preset                       preset fan-out (POST)
/// /templates/{id}/generate                         snapshot + render (POST)
/// /templates/{id}/preview                          render only
/// /templates/{id}/outdated                         outdated snapshots
///
/// /snapshots/{id}                                  get, resolve (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(handlers::stats::global))
        .nest("/rules", rules::router())
        .nest("/categories", categories::router())
        .nest("/category-rules", categories::membership_router())
        .nest("/presets", presets::router())
        .nest("/templates", templates::router())
        .nest("/snapshots", snapshots::router())
}
