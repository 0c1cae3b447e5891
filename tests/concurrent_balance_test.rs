// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrency properties of the store: no lost balance updates and exactly
//! one row per Telegram ID under creation races.

use tapgame::db::SqliteDb;
use tapgame::error::AppError;
use tapgame::models::NewUser;

mod common;

const NUM_CONCURRENT_TAPS: i64 = 50;
const NUM_CONCURRENT_CREATES: usize = 10;

fn new_user(telegram_id: &str) -> NewUser {
    NewUser {
        telegram_id: telegram_id.to_string(),
        first_name: "Race".to_string(),
        last_name: Some("Condition".to_string()),
        username: None,
        language_code: None,
        is_premium: false,
    }
}

/// File-backed database so several pooled connections really compete.
async fn shared_file_db() -> (SqliteDb, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("tapgame-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());
    let db = SqliteDb::new(&url, 5)
        .await
        .expect("Failed to open file database");
    (db, path)
}

async fn cleanup(db: SqliteDb, path: std::path::PathBuf) {
    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

async fn assert_no_lost_updates(db: &SqliteDb) {
    db.create(&new_user("42"))
        .await
        .expect("Failed to create test user");

    // Mix of positive and negative taps; sum is known up front
    let amounts: Vec<i64> = (1..=NUM_CONCURRENT_TAPS)
        .map(|i| if i % 5 == 0 { -i } else { i })
        .collect();
    let expected: i64 = amounts.iter().sum();

    let handles = amounts.into_iter().map(|amount| {
        let db = db.clone();
        tokio::spawn(async move { db.increment_balance("42", amount).await })
    });

    for result in futures_util::future::join_all(handles).await {
        result
            .expect("Task join failed")
            .expect("Increment failed");
    }

    let user = db
        .find_by_telegram_id("42")
        .await
        .unwrap()
        .expect("User should exist");
    assert_eq!(user.balance, expected, "Balance mismatch due to lost update");
}

async fn assert_single_row_under_create_race(db: &SqliteDb) {
    let handles = (0..NUM_CONCURRENT_CREATES).map(|_| {
        let db = db.clone();
        tokio::spawn(async move { db.create(&new_user("7")).await })
    });

    let mut created = 0;
    let mut conflicts = 0;
    for result in futures_util::future::join_all(handles).await {
        match result.expect("Task join failed") {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("Unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, NUM_CONCURRENT_CREATES - 1);
    assert!(db.find_by_telegram_id("7").await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_in_memory() {
    let db = common::test_db().await;
    assert_no_lost_updates(&db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_pooled() {
    let (db, path) = shared_file_db().await;
    assert_no_lost_updates(&db).await;
    cleanup(db, path).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_in_memory() {
    let db = common::test_db().await;
    assert_single_row_under_create_race(&db).await;
    assert_eq!(db.count_all().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_pooled() {
    let (db, path) = shared_file_db().await;
    assert_single_row_under_create_race(&db).await;
    assert_eq!(db.count_all().await.unwrap(), 1);
    cleanup(db, path).await;
}
