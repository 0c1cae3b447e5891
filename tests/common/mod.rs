// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tapgame::config::Config;
use tapgame::db::SqliteDb;
use tapgame::routes::create_router;
use tapgame::AppState;

/// Create an in-memory test database.
#[allow(dead_code)]
pub async fn test_db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("Failed to open in-memory database")
}

/// Create a test app backed by a fresh in-memory database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_default()).await
}

#[allow(dead_code)]
pub async fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, test_db().await));
    (create_router(state.clone()), state)
}

/// Build a signed initData string for a Telegram user, the way the
/// WebApp client would deliver it.
#[allow(dead_code)]
pub fn signed_init_data(state: &AppState, user_json: &str, auth_date: i64) -> String {
    let fields = HashMap::from([
        ("auth_date".to_string(), auth_date.to_string()),
        ("query_id".to_string(), "AAHdF6IQAAAAAN0XohDhrOrc".to_string()),
        ("user".to_string(), user_json.to_string()),
    ]);
    let hash = state.verifier.sign(&fields);

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .append_pair("hash", &hash)
        .finish()
}

#[allow(dead_code)]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Response body should be JSON")
}
