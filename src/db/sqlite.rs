// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite store for player profiles and balances.
//!
//! Provides:
//! - lookups by Telegram ID
//! - creation guarded by the `telegram_id` unique constraint
//! - atomic balance increments (single `UPDATE ... RETURNING`)
//! - leaderboard and rank queries

use crate::error::AppError;
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::user::display_name;
use crate::models::{NewUser, User};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::error::ErrorKind;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

const USER_COLUMNS: &str = "id, telegram_id, first_name, last_name, username, language_code, \
                            is_premium, balance, created_at, updated_at";

/// SQLite database client.
#[derive(Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
}

impl SqliteDb {
    /// Open (creating if missing) the database at `database_url` and apply
    /// pending migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Database(format!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(max_connections, "Connected to SQLite");
        Ok(db)
    }

    /// Private in-memory database for tests and local experiments.
    ///
    /// A single connection is kept alive forever; every SQLite connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::Database(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
    }

    /// Startup connectivity check.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by Telegram ID.
    pub async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?"
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new user with a zero balance.
    ///
    /// The unique constraint on `telegram_id` decides creation races: the
    /// loser gets [`AppError::Conflict`] and no row is written.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now();

        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, telegram_id, first_name, last_name, username, \
             language_code, is_premium, balance, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&id)
        .bind(&new_user.telegram_id)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.username)
        .bind(&new_user.language_code)
        .bind(new_user.is_premium)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Conflict(format!(
                    "User {} already exists",
                    new_user.telegram_id
                )))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Add `delta` (possibly negative) to a user's balance.
    ///
    /// Read-modify-write happens inside one statement, so concurrent
    /// increments on the same user never lose updates. A sum outside the i64
    /// range is written as NULL, which the NOT NULL constraint rejects, so the
    /// statement aborts and the stored balance is left untouched.
    pub async fn increment_balance(&self, telegram_id: &str, delta: i64) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
             balance = CASE WHEN typeof(balance + ?1) = 'integer' THEN balance + ?1 END, \
             updated_at = ?2 \
             WHERE telegram_id = ?3 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(delta)
        .bind(chrono::Utc::now())
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AppError::NotFound(format!("User {} not found", telegram_id))),
            Err(sqlx::Error::Database(db_err))
                if matches!(
                    db_err.kind(),
                    ErrorKind::NotNullViolation | ErrorKind::CheckViolation
                ) =>
            {
                tracing::warn!(telegram_id, delta, "Balance increment would overflow");
                Err(AppError::BadRequest("balance out of range".to_string()))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Top `limit` users by balance, highest first.
    ///
    /// Ties keep a stable order: earlier sign-ups first.
    pub async fn list_top_by_balance(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, AppError> {
        let rows: Vec<(String, String, Option<String>, i64)> = sqlx::query_as(
            "SELECT telegram_id, first_name, last_name, balance FROM users \
             ORDER BY balance DESC, created_at ASC, id ASC \
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(telegram_id, first_name, last_name, balance)| LeaderboardEntry {
                id: telegram_id,
                name: display_name(&first_name, last_name.as_deref()),
                balance,
            })
            .collect())
    }

    /// Number of users whose balance is at least this user's.
    ///
    /// The top balance ranks 1; tied users share the lowest position of their
    /// group (two users tied for first both rank 2).
    pub async fn rank_of(&self, telegram_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT (SELECT COUNT(*) FROM users AS other WHERE other.balance >= me.balance) \
             FROM users AS me WHERE me.telegram_id = ?",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", telegram_id)))
    }

    /// Total number of users.
    pub async fn count_all(&self) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
