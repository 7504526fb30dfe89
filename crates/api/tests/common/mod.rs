#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use rulekeeper_api::config::ServerConfig;
use rulekeeper_api::router::build_app_router;
use rulekeeper_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        db_max_connections: 5,
    }
}

/// Build the full application router on top of the given pool.
///
/// Goes through [`build_app_router`] so tests exercise the production
/// middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: std::sync::Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(json)).await
}

pub async fn put_json(app: Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(json)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A complete rule payload with the given name and title.
pub fn rule_body(name: &str, title: &str) -> Value {
    serde_json::json!({
        "name": name,
        "title": title,
        "priority": "warning",
        "allowed": false,
        "description_detail": format!("{title} in detail"),
        "example_bad": null,
        "example_good": null,
        "violation_action": null,
        "notes": null
    })
}

/// Create a resource via POST and return its `data.id`.
pub async fn create_id(pool: &PgPool, uri: &str, json: Value) -> i64 {
    let response = post_json(build_test_app(pool.clone()), uri, json).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}
