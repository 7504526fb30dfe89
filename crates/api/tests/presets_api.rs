//! HTTP-level integration tests for the `/presets` resource.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create_id, delete, get, post, post_json, put_json, rule_body};
use serde_json::json;
use sqlx::PgPool;

async fn add_category(pool: &PgPool, preset: i64, category: i64) -> StatusCode {
    post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/presets/{preset}/categories"),
        json!({ "category_id": category }),
    )
    .await
    .status()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_update_and_list(pool: PgPool) {
    let id = create_id(&pool, "/api/v1/presets", json!({ "name": "Backend" })).await;

    let response = put_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/presets/{id}"),
        json!({ "description": "Server-side defaults" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Backend");
    assert_eq!(json["data"]["description"], "Server-side defaults");

    let json = body_json(get(build_test_app(pool), "/api/v1/presets").await).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert!(data[0]["items"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn categories_append_in_order(pool: PgPool) {
    let preset = create_id(&pool, "/api/v1/presets", json!({ "name": "P" })).await;
    let c1 = create_id(&pool, "/api/v1/categories", json!({ "name": "One" })).await;
    let c2 = create_id(&pool, "/api/v1/categories", json!({ "name": "Two" })).await;

    assert_eq!(add_category(&pool, preset, c1).await, StatusCode::CREATED);
    assert_eq!(add_category(&pool, preset, c2).await, StatusCode::CREATED);
    assert_eq!(add_category(&pool, preset, c2).await, StatusCode::CONFLICT);

    let json = body_json(get(build_test_app(pool), &format!("/api/v1/presets/{preset}")).await).await;
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["category"]["name"], "One");
    assert_eq!(items[0]["sort_order"], 0);
    assert_eq!(items[1]["category"]["name"], "Two");
    assert_eq!(items[1]["sort_order"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_category_returns_404(pool: PgPool) {
    let preset = create_id(&pool, "/api/v1/presets", json!({ "name": "P" })).await;
    assert_eq!(add_category(&pool, preset, 55555).await, StatusCode::NOT_FOUND);
    assert_eq!(add_category(&pool, 55555, preset).await, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn preview_flattens_rules(pool: PgPool) {
    let preset = create_id(&pool, "/api/v1/presets", json!({ "name": "P" })).await;
    let category = create_id(&pool, "/api/v1/categories", json!({ "name": "Style" })).await;
    for title in ["A", "B"] {
        let rule = create_id(&pool, "/api/v1/rules", rule_body(title, title)).await;
        let response = post_json(
            build_test_app(pool.clone()),
            &format!("/api/v1/categories/{category}/rules"),
            json!({ "rule_id": rule }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    add_category(&pool, preset, category).await;

    let response = get(
        build_test_app(pool),
        &format!("/api/v1/presets/{preset}/preview"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["total_rules"], 2);
    assert_eq!(json["data"]["preset"]["name"], "P");
    let all_rules = json["data"]["all_rules"].as_array().unwrap();
    assert_eq!(all_rules[0]["title"], "A");
    assert_eq!(all_rules[0]["category_name"], "Style");
    assert_eq!(all_rules[1]["title"], "B");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn copy_and_remove_category(pool: PgPool) {
    let preset = create_id(&pool, "/api/v1/presets", json!({ "name": "P" })).await;
    let category = create_id(&pool, "/api/v1/categories", json!({ "name": "C" })).await;
    add_category(&pool, preset, category).await;

    let response = post(build_test_app(pool.clone()), &format!("/api/v1/presets/{preset}/copy")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "P (copy)");
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/presets/{preset}/categories/{category}");
    let response = delete(build_test_app(pool.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete(build_test_app(pool.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(build_test_app(pool), &format!("/api/v1/presets/{preset}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
