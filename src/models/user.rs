//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::init_data::WebAppUser;

/// Player profile stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    /// Generated on creation (UUID v4)
    pub id: String,
    /// Telegram user ID, decimal
    pub telegram_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
    /// Tap balance; only changed through signed increments
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown on the leaderboard.
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, self.last_name.as_deref())
    }
}

pub(crate) fn display_name(first_name: &str, last_name: Option<&str>) -> String {
    match last_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(last) => format!("{first_name} {last}"),
        None => first_name.to_string(),
    }
}

/// Profile fields supplied when a user is first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub telegram_id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
}

/// Telegram sends empty strings for unset optional fields on some clients.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<WebAppUser> for NewUser {
    fn from(user: WebAppUser) -> Self {
        Self {
            telegram_id: user.id.to_string(),
            first_name: user.first_name,
            last_name: non_empty(user.last_name),
            username: non_empty(user.username),
            language_code: non_empty(user.language_code),
            is_premium: user.is_premium,
        }
    }
}
