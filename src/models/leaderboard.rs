//! Leaderboard rows and the leaderboard response body.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    /// Telegram ID of the player
    pub id: String,
    pub name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub balance: i64,
}

/// Where the requesting player stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CurrentUserPosition {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub position: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub current_user_position: CurrentUserPosition,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_users: i64,
}
