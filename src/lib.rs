// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tap game backend for a Telegram mini-app.
//!
//! This crate authenticates Telegram WebApp `initData` payloads, keeps one
//! player profile per Telegram ID with an integer tap balance, and serves a
//! leaderboard.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::SqliteDb;
use services::InitDataVerifier;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SqliteDb,
    pub verifier: InitDataVerifier,
}

impl AppState {
    /// Build state from config and an opened database.
    pub fn new(config: Config, db: SqliteDb) -> Self {
        let verifier = InitDataVerifier::new(&config.bot_token, config.key_derivation)
            .with_max_age(config.init_data_max_age);
        Self {
            config,
            db,
            verifier,
        }
    }
}
