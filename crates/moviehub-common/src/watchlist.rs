//! User and watchlist records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Viewing state of a watchlist entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    WantToWatch,
    Watching,
    Watched,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::WantToWatch => "want_to_watch",
            WatchStatus::Watching => "watching",
            WatchStatus::Watched => "watched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// One movie on one user's watchlist. `(user_id, movie_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub id: Uuid,
    pub user_id: String,
    pub movie_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_title: Option<String>,
    pub status: WatchStatus,
    /// Percent watched, 0-100.
    pub progress: u8,
    /// Personal rating, 1-10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts of a user's watchlist entries per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistStats {
    pub total: usize,
    pub want_to_watch: usize,
    pub watching: usize,
    pub watched: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&WatchStatus::WantToWatch).unwrap();
        assert_eq!(json, "\"want_to_watch\"");
        let parsed: WatchStatus = serde_json::from_str("\"watched\"").unwrap();
        assert_eq!(parsed, WatchStatus::Watched);
        assert_eq!(WatchStatus::Watching.as_str(), "watching");
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = WatchlistStats {
            total: 3,
            want_to_watch: 1,
            watching: 1,
            watched: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["wantToWatch"], 1);
    }
}
