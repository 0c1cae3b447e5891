// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `POST /api/save-user` tests.
//!
//! These tests verify that:
//! 1. Correctly signed initData registers the user once (201, then 200)
//! 2. Tampered or unsigned initData is rejected with 403
//! 3. Malformed payloads are rejected with 400 and a JSON message

use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;
use tapgame::config::Config;
use tower::ServiceExt;

mod common;
use common::{json_body, now, post_json, signed_init_data};

const USER_JSON: &str = r#"{"id":279058397,"first_name":"Vladislav","last_name":"Kibenko","username":"vdkfrost","language_code":"ru","is_premium":true}"#;

#[tokio::test]
async fn test_save_user_creates_then_returns_existing() {
    let (app, state) = common::create_test_app().await;
    let init_data = signed_init_data(&state, USER_JSON, now());

    let response = app
        .clone()
        .oneshot(post_json("/api/save-user", json!({ "initData": init_data })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["telegramId"], "279058397");
    assert_eq!(body["user"]["firstName"], "Vladislav");
    assert_eq!(body["user"]["lastName"], "Kibenko");
    assert_eq!(body["user"]["username"], "vdkfrost");
    assert_eq!(body["user"]["languageCode"], "ru");
    assert_eq!(body["user"]["isPremium"], true);
    assert_eq!(body["user"]["balance"], 0);
    let id = body["user"]["id"].clone();

    let response = app
        .oneshot(post_json("/api/save-user", json!({ "initData": init_data })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "User already exists");
    assert_eq!(body["user"]["id"], id);
    assert_eq!(state.db.count_all().await.unwrap(), 1);
}

#[tokio::test]
async fn test_save_user_tampered_init_data() {
    let (app, state) = common::create_test_app().await;
    let init_data = signed_init_data(&state, USER_JSON, now());
    let tampered = init_data.replace("Vladislav", "Mallory");

    let response = app
        .oneshot(post_json("/api/save-user", json!({ "initData": tampered })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert!(body["message"].is_string());
    assert_eq!(state.db.count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn test_save_user_missing_hash() {
    let (app, _) = common::create_test_app().await;
    let init_data = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("auth_date", "1700000000")
        .append_pair("user", USER_JSON)
        .finish();

    let response = app
        .oneshot(post_json("/api/save-user", json!({ "initData": init_data })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_save_user_signed_with_other_token() {
    let (app, _) = common::create_test_app().await;

    let mut other_config = Config::test_default();
    other_config.bot_token = secrecy::SecretString::from("999:other-bot".to_string());
    let (_, other_state) = common::create_test_app_with(other_config).await;
    let init_data = signed_init_data(&other_state, USER_JSON, now());

    let response = app
        .oneshot(post_json("/api/save-user", json!({ "initData": init_data })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_save_user_expired_init_data() {
    let mut config = Config::test_default();
    config.init_data_max_age = Some(Duration::from_secs(3600));
    let (app, state) = common::create_test_app_with(config).await;

    let stale = signed_init_data(&state, USER_JSON, now() - 7200);
    let response = app
        .clone()
        .oneshot(post_json("/api/save-user", json!({ "initData": stale })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let fresh = signed_init_data(&state, USER_JSON, now());
    let response = app
        .oneshot(post_json("/api/save-user", json!({ "initData": fresh })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_save_user_missing_init_data() {
    let (app, _) = common::create_test_app().await;

    let response = app
        .oneshot(post_json("/api/save-user", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(!body["errors"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_user_invalid_user_json() {
    let (app, state) = common::create_test_app().await;
    let init_data = signed_init_data(&state, "not json", now());

    let response = app
        .oneshot(post_json("/api/save-user", json!({ "initData": init_data })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_user_malformed_body() {
    let (app, _) = common::create_test_app().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/save-user")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_concurrent_save_user_creates_one_row() {
    let (app, state) = common::create_test_app().await;
    let init_data = signed_init_data(&state, USER_JSON, now());

    let requests = (0..8).map(|_| {
        let app = app.clone();
        let init_data = init_data.clone();
        tokio::spawn(async move {
            app.oneshot(post_json("/api/save-user", json!({ "initData": init_data })))
                .await
                .unwrap()
                .status()
        })
    });

    let statuses: Vec<StatusCode> = futures_util::future::join_all(requests)
        .await
        .into_iter()
        .map(|r| r.expect("Task join failed"))
        .collect();

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1
    );
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::CREATED || *s == StatusCode::OK));
    assert_eq!(state.db.count_all().await.unwrap(), 1);
}
