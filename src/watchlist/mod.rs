//! In-memory user and watchlist store.

use std::collections::HashMap;

use chrono::Utc;
use moviehub_common::{Error, Result, User, WatchStatus, WatchlistItem, WatchlistStats};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The user every fresh store starts with.
pub const DEMO_USER_ID: &str = "demo-user-1";

/// Body of a watchlist create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchlistItem {
    #[serde(default)]
    pub movie_id: String,
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of a watchlist entry. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistUpdate {
    #[serde(default)]
    pub status: Option<WatchStatus>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn validate_rating(rating: Option<u8>) -> Result<()> {
    match rating {
        Some(r) if !(1..=10).contains(&r) => {
            Err(Error::Validation(format!("rating must be between 1 and 10, got {r}")))
        }
        _ => Ok(()),
    }
}

fn validate_progress(progress: Option<u8>) -> Result<()> {
    match progress {
        Some(p) if p > 100 => Err(Error::Validation(format!(
            "progress must be between 0 and 100, got {p}"
        ))),
        _ => Ok(()),
    }
}

/// Users and their watchlists.
///
/// One entry per `(user_id, movie_id)`; a second create for the same pair is
/// a conflict.
pub struct WatchlistStore {
    users: RwLock<HashMap<String, User>>,
    items: RwLock<HashMap<Uuid, WatchlistItem>>,
}

impl WatchlistStore {
    /// A store seeded with the demo user.
    pub fn new() -> Self {
        let demo = User {
            id: DEMO_USER_ID.to_string(),
            username: "demo".to_string(),
            email: "demo@moviehub.local".to_string(),
            created_at: Utc::now(),
        };
        Self {
            users: RwLock::new(HashMap::from([(demo.id.clone(), demo)])),
            items: RwLock::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn user(&self, user_id: &str) -> Result<User> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::not_found("user", user_id))
    }

    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    // ------------------------------------------------------------------
    // Watchlist
    // ------------------------------------------------------------------

    /// A user's entries, most recently updated first, optionally filtered.
    pub fn list(&self, user_id: &str, status: Option<WatchStatus>) -> Vec<WatchlistItem> {
        let mut items: Vec<WatchlistItem> = self
            .items
            .read()
            .values()
            .filter(|item| item.user_id == user_id)
            .filter(|item| status.map_or(true, |s| item.status == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        items
    }

    pub fn stats(&self, user_id: &str) -> WatchlistStats {
        let items = self.items.read();
        let mut stats = WatchlistStats::default();
        for item in items.values().filter(|i| i.user_id == user_id) {
            stats.total += 1;
            match item.status {
                WatchStatus::WantToWatch => stats.want_to_watch += 1,
                WatchStatus::Watching => stats.watching += 1,
                WatchStatus::Watched => stats.watched += 1,
            }
        }
        stats
    }

    pub fn get(&self, item_id: Uuid) -> Result<WatchlistItem> {
        self.items
            .read()
            .get(&item_id)
            .cloned()
            .ok_or_else(|| Error::not_found("watchlist item", item_id))
    }

    pub fn add(&self, user_id: &str, new: NewWatchlistItem) -> Result<WatchlistItem> {
        if new.movie_id.trim().is_empty() {
            return Err(Error::Validation("movieId is required".into()));
        }
        validate_rating(new.rating)?;

        let mut items = self.items.write();
        if items
            .values()
            .any(|i| i.user_id == user_id && i.movie_id == new.movie_id)
        {
            return Err(Error::Conflict(format!(
                "movie {} already in watchlist",
                new.movie_id
            )));
        }

        let now = Utc::now();
        let item = WatchlistItem {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            movie_id: new.movie_id,
            movie_title: new.movie_title,
            status: new.status,
            progress: 0,
            rating: new.rating,
            notes: new.notes,
            added_at: now,
            updated_at: now,
        };
        items.insert(item.id, item.clone());
        tracing::info!(user_id, movie_id = %item.movie_id, "Added to watchlist");
        Ok(item)
    }

    pub fn update(&self, item_id: Uuid, update: WatchlistUpdate) -> Result<WatchlistItem> {
        validate_rating(update.rating)?;
        validate_progress(update.progress)?;

        let mut items = self.items.write();
        let item = items
            .get_mut(&item_id)
            .ok_or_else(|| Error::not_found("watchlist item", item_id))?;

        if let Some(status) = update.status {
            item.status = status;
        }
        if let Some(progress) = update.progress {
            item.progress = progress;
        }
        if update.rating.is_some() {
            item.rating = update.rating;
        }
        if update.notes.is_some() {
            item.notes = update.notes;
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    pub fn remove(&self, item_id: Uuid) -> Result<()> {
        self.items
            .write()
            .remove(&item_id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found("watchlist item", item_id))
    }
}

impl Default for WatchlistStore {
    fn default() -> Self {
        Self::new()
    }
}
