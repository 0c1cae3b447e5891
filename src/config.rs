//! Application configuration loaded from environment variables.
//!
//! The bot token is held as a [`SecretString`] so it never ends up in logs or
//! `Debug` output.

use crate::services::init_data::KeyDerivation;
use secrecy::SecretString;
use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// SQLite connection string
    pub database_url: String,
    /// Connection pool size
    pub database_max_connections: u32,
    /// Origins allowed by CORS; empty means any origin
    pub allowed_origins: Vec<String>,
    /// Rows returned by the leaderboard endpoint
    pub leaderboard_limit: u32,
    /// How the initData signing key is derived from the bot token
    pub key_derivation: KeyDerivation,
    /// Maximum accepted initData age; `None` disables the check
    pub init_data_max_age: Option<Duration>,

    // --- Secrets ---
    /// Telegram bot token, the initData shared secret
    pub bot_token: SecretString,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            allowed_origins: Vec::new(),
            leaderboard_limit: 100,
            key_derivation: KeyDerivation::WebAppData,
            init_data_max_age: None,
            bot_token: SecretString::from("123456:TEST-bot-token".to_string()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map(|v| v.trim().to_string())
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let key_derivation = match env::var("TELEGRAM_KEY_DERIVATION") {
            Ok(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: "TELEGRAM_KEY_DERIVATION",
                reason,
            })?,
            Err(_) => KeyDerivation::default(),
        };

        let max_age_secs: u64 = parse_or("INIT_DATA_MAX_AGE_SECS", 0)?;

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tapgame.db".to_string()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            leaderboard_limit: parse_or("LEADERBOARD_LIMIT", 100)?,
            key_derivation,
            init_data_max_age: (max_age_secs > 0).then(|| Duration::from_secs(max_age_secs)),
            bot_token: SecretString::from(bot_token),
        })
    }
}

/// Read `name` and parse it, falling back to `default` when unset.
fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated origin list. `*` alone means any origin.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
