//! Locally persisted leaderboard for the reaction test.
//!
//! Entries are stored as a JSON array of `{ "id", "averageReactionTime" }`
//! objects, lowest (best) average first.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GameError, GameResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    #[serde(rename = "id")]
    pub identifier: String,
    #[serde(rename = "averageReactionTime")]
    pub average_reaction_time_ms: f64,
}

impl RankingEntry {
    pub fn new(identifier: impl Into<String>, average_reaction_time_ms: f64) -> Self {
        Self { identifier: identifier.into(), average_reaction_time_ms }
    }

    /// Leaderboard line, e.g. `1. alice - 287.40ms`.
    pub fn display_line(&self, rank: usize) -> String {
        format!("{}. {} - {:.2}ms", rank, self.identifier, self.average_reaction_time_ms)
    }
}

/// Stable ascending sort by average (lower is better).
pub fn sort_entries(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| a.average_reaction_time_ms.total_cmp(&b.average_reaction_time_ms));
}

pub fn encode(entries: &[RankingEntry]) -> GameResult<String> {
    Ok(serde_json::to_string(entries)?)
}

/// Decode a persisted list; anything malformed degrades to an empty list.
pub fn decode(raw: Option<&str>) -> Vec<RankingEntry> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<RankingEntry>>(raw) {
        Ok(mut entries) => {
            sort_entries(&mut entries);
            entries
        }
        Err(e) => {
            warn!(error = %e, "discarding malformed ranking data");
            Vec::new()
        }
    }
}

pub trait RankingStore {
    fn load(&self) -> Vec<RankingEntry>;
    fn save(&self, entries: &[RankingEntry]) -> GameResult<()>;
}

/// In-memory store holding the same JSON encoding the browser store writes.
#[derive(Debug, Default)]
pub struct MemoryRankingStore {
    raw: RefCell<Option<String>>,
}

impl MemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an arbitrary raw value (used to exercise malformed data).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { raw: RefCell::new(Some(raw.into())) }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.borrow().clone()
    }
}

impl RankingStore for MemoryRankingStore {
    fn load(&self) -> Vec<RankingEntry> {
        decode(self.raw.borrow().as_deref())
    }

    fn save(&self, entries: &[RankingEntry]) -> GameResult<()> {
        *self.raw.borrow_mut() = Some(encode(entries)?);
        Ok(())
    }
}

/// `window.localStorage` backed store.
#[derive(Debug, Clone)]
pub struct LocalStorageRankingStore {
    key: String,
}

impl LocalStorageRankingStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage() -> GameResult<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| GameError::Storage("no window".into()))?
            .local_storage()
            .map_err(|_| GameError::Storage("localStorage access denied".into()))?
            .ok_or_else(|| GameError::Storage("localStorage unavailable".into()))
    }

    /// Whether `localStorage` can be reached at all from this page.
    pub fn is_available() -> bool {
        Self::storage().is_ok()
    }
}

impl RankingStore for LocalStorageRankingStore {
    fn load(&self) -> Vec<RankingEntry> {
        let raw = match Self::storage() {
            Ok(s) => s.get_item(&self.key).ok().flatten(),
            Err(e) => {
                warn!(error = %e, "rankings not loaded");
                None
            }
        };
        decode(raw.as_deref())
    }

    fn save(&self, entries: &[RankingEntry]) -> GameResult<()> {
        let raw = encode(entries)?;
        Self::storage()?
            .set_item(&self.key, &raw)
            .map_err(|_| GameError::Storage(format!("could not write '{}'", self.key)))
    }
}
