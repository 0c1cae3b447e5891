// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player API routes used by the mini-app.

use crate::error::{AppError, Result};
use crate::models::leaderboard::{CurrentUserPosition, LeaderboardResponse};
use crate::models::{NewUser, User};
use crate::routes::extract::{string_or_number, ApiQuery, ValidatedJson};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/save-user", post(save_user))
        .route("/api/update-balance", post(update_balance))
        .route("/api/get-user", get(get_user))
        .route("/api/get-leaderboard", get(get_leaderboard))
}

/// `{message, user}` body returned by the mutating endpoints.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserEnvelope {
    pub message: String,
    pub user: User,
}

impl UserEnvelope {
    fn new(message: &str, user: User) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
            user,
        })
    }
}

#[derive(Deserialize)]
struct TelegramIdQuery {
    #[serde(rename = "telegramId")]
    telegram_id: Option<String>,
}

impl TelegramIdQuery {
    fn require(self) -> Result<String> {
        self.telegram_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("telegramId is required".to_string()))
    }
}

// ─── Save User ───────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct SaveUserRequest {
    #[serde(rename = "initData")]
    #[validate(
        required(message = "initData is required"),
        length(min = 1, message = "initData must not be empty")
    )]
    pub init_data: Option<String>,
}

/// Authenticate initData and register the player on first sight.
///
/// 201 when the player was created, 200 when it already existed. A creation
/// race lost to a concurrent request counts as "already existed".
async fn save_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SaveUserRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>)> {
    let raw = req
        .init_data
        .ok_or_else(|| AppError::BadRequest("initData is required".to_string()))?;

    let init_data = state.verifier.authenticate(&raw).map_err(|err| {
        tracing::warn!(error = %err, "Rejected initData");
        AppError::from(err)
    })?;

    let new_user = NewUser::from(init_data.user);

    if let Some(user) = state.db.find_by_telegram_id(&new_user.telegram_id).await? {
        tracing::debug!(telegram_id = %user.telegram_id, "User already registered");
        return Ok((
            StatusCode::OK,
            UserEnvelope::new("User already exists", user),
        ));
    }

    match state.db.create(&new_user).await {
        Ok(user) => {
            tracing::info!(telegram_id = %user.telegram_id, "User created");
            Ok((
                StatusCode::CREATED,
                UserEnvelope::new("User created successfully", user),
            ))
        }
        Err(AppError::Conflict(_)) => {
            tracing::info!(
                telegram_id = %new_user.telegram_id,
                "Concurrent registration detected, returning existing user"
            );
            let user = state
                .db
                .find_by_telegram_id(&new_user.telegram_id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "User {} missing after unique conflict",
                        new_user.telegram_id
                    ))
                })?;
            Ok((
                StatusCode::OK,
                UserEnvelope::new("User already exists", user),
            ))
        }
        Err(err) => Err(err),
    }
}

// ─── Update Balance ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBalanceRequest {
    #[serde(rename = "telegramId", default, deserialize_with = "string_or_number")]
    #[validate(
        required(message = "telegramId is required"),
        length(min = 1, max = 32, message = "telegramId must be 1-32 characters")
    )]
    pub telegram_id: Option<String>,

    #[validate(
        required(message = "amount is required"),
        range(
            min = -1_000_000_000,
            max = 1_000_000_000,
            message = "amount must be between -1000000000 and 1000000000"
        )
    )]
    pub amount: Option<i64>,
}

/// Apply a signed tap delta to a player's balance.
async fn update_balance(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<UpdateBalanceRequest>,
) -> Result<Json<UserEnvelope>> {
    let (Some(telegram_id), Some(amount)) = (req.telegram_id, req.amount) else {
        return Err(AppError::BadRequest(
            "telegramId and amount are required".to_string(),
        ));
    };

    let user = state.db.increment_balance(&telegram_id, amount).await?;

    tracing::info!(
        telegram_id = %telegram_id,
        amount,
        balance = user.balance,
        "Balance updated"
    );

    Ok(UserEnvelope::new("Balance updated successfully", user))
}

// ─── Get User ────────────────────────────────────────────────

async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TelegramIdQuery>,
) -> Result<Json<User>> {
    let telegram_id = query.require()?;

    let user = state
        .db
        .find_by_telegram_id(&telegram_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", telegram_id)))?;

    Ok(Json(user))
}

// ─── Leaderboard ─────────────────────────────────────────────

/// Top players plus the requesting player's own position.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TelegramIdQuery>,
) -> Result<Json<LeaderboardResponse>> {
    let telegram_id = query.require()?;

    let user = state
        .db
        .find_by_telegram_id(&telegram_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", telegram_id)))?;

    let (leaderboard, position, total_users) = tokio::try_join!(
        state.db.list_top_by_balance(state.config.leaderboard_limit),
        state.db.rank_of(&telegram_id),
        state.db.count_all(),
    )?;

    Ok(Json(LeaderboardResponse {
        leaderboard,
        current_user_position: CurrentUserPosition {
            position,
            balance: user.balance,
        },
        total_users,
    }))
}
