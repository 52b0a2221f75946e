pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{Match, MsOdds, Score};

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

/// Persistence contract for the ingestion pipeline.
///
/// The repository is the single source of truth for a fixture's lifecycle
/// state; `is_done` / `has_ms_odds` / `has_score` are the only gates the job
/// engine consults. All mutating operations are idempotent upserts —
/// re-running a phase for the same day must leave state unchanged.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist a fixture into the raw audit pool (insert-or-replace).
    async fn save_raw_fixture(&self, m: &Match) -> Result<()>;

    /// The raw pool for one calendar day, with the done/ignored mirror
    /// flags filled from flag state. Ordering is not guaranteed.
    async fn list_raw_fixtures(&self, day: NaiveDate) -> Result<Vec<Match>>;

    /// Insert-or-replace a selected match.
    async fn upsert_match(&self, m: &Match) -> Result<()>;

    /// Store 1X2 odds, last write wins.
    async fn save_ms_odds(&self, match_id: i64, odds: &MsOdds) -> Result<()>;

    async fn has_ms_odds(&self, match_id: i64) -> Result<bool>;

    /// Store a score, merging incrementally — a later partial write never
    /// clears goal counts that are already present.
    async fn save_score(&self, match_id: i64, score: &Score) -> Result<()>;

    /// True only when both full-time goal counts are stored — the gate a
    /// finished fixture must pass before it can be marked done.
    async fn has_score(&self, match_id: i64) -> Result<bool>;

    /// Terminal lock. A done fixture is never mutated again.
    async fn mark_done(&self, match_id: i64) -> Result<()>;

    async fn is_done(&self, match_id: i64) -> Result<bool>;

    /// Terminal routing for postponed/cancelled/no-market fixtures.
    async fn mark_ignored(&self, match_id: i64, reason: &str) -> Result<()>;

    /// Panel counter: selected matches added for `day`.
    async fn today_added_count(&self, day: NaiveDate) -> Result<i64>;

    /// Panel counter: all selected matches ever stored.
    async fn total_matches_count(&self) -> Result<i64>;
}
