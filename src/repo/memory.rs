use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};

use crate::error::Result;
use crate::repo::Repository;
use crate::types::{Match, MsOdds, Score};

/// In-memory repository for dev runs and tests. Mirrors the SQLite
/// implementation's semantics: idempotent upserts, incremental score merge,
/// full-time-gated `has_score`.
#[derive(Default)]
pub struct MemoryRepository {
    raw: DashMap<i64, Match>,
    selected: DashMap<i64, Match>,
    odds: DashMap<i64, MsOdds>,
    scores: DashMap<i64, Score>,
    done: DashSet<i64>,
    ignored: DashMap<i64, String>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // Read accessors used by dev tooling and tests.

    pub fn ms_odds(&self, match_id: i64) -> Option<MsOdds> {
        self.odds.get(&match_id).map(|o| o.value().clone())
    }

    pub fn score(&self, match_id: i64) -> Option<Score> {
        self.scores.get(&match_id).map(|s| s.value().clone())
    }

    pub fn selected_match(&self, match_id: i64) -> Option<Match> {
        self.selected.get(&match_id).map(|m| m.value().clone())
    }

    pub fn ignore_reason(&self, match_id: i64) -> Option<String> {
        self.ignored.get(&match_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_raw_fixture(&self, m: &Match) -> Result<()> {
        self.raw.insert(m.match_id, m.clone());
        Ok(())
    }

    async fn list_raw_fixtures(&self, day: NaiveDate) -> Result<Vec<Match>> {
        let mut fixtures: Vec<Match> = self
            .raw
            .iter()
            .filter(|entry| entry.value().day() == day)
            .map(|entry| {
                let mut m = entry.value().clone();
                m.is_done = self.done.contains(&m.match_id);
                m.is_ignored = self.ignored.contains_key(&m.match_id);
                m
            })
            .collect();
        // DashMap iteration order is arbitrary; keep listings deterministic.
        fixtures.sort_by_key(|m| m.match_id);
        Ok(fixtures)
    }

    async fn upsert_match(&self, m: &Match) -> Result<()> {
        self.selected.insert(m.match_id, m.clone());
        Ok(())
    }

    async fn save_ms_odds(&self, match_id: i64, odds: &MsOdds) -> Result<()> {
        self.odds.insert(match_id, odds.clone());
        Ok(())
    }

    async fn has_ms_odds(&self, match_id: i64) -> Result<bool> {
        Ok(self.odds.contains_key(&match_id))
    }

    async fn save_score(&self, match_id: i64, score: &Score) -> Result<()> {
        let mut entry = self.scores.entry(match_id).or_default();
        entry.ht_home = score.ht_home.or(entry.ht_home);
        entry.ht_away = score.ht_away.or(entry.ht_away);
        entry.ft_home = score.ft_home.or(entry.ft_home);
        entry.ft_away = score.ft_away.or(entry.ft_away);
        entry.went_extra_time = score.went_extra_time;
        entry.went_penalties = score.went_penalties;
        Ok(())
    }

    async fn has_score(&self, match_id: i64) -> Result<bool> {
        Ok(self
            .scores
            .get(&match_id)
            .is_some_and(|s| s.has_full_time()))
    }

    async fn mark_done(&self, match_id: i64) -> Result<()> {
        self.done.insert(match_id);
        Ok(())
    }

    async fn is_done(&self, match_id: i64) -> Result<bool> {
        Ok(self.done.contains(&match_id))
    }

    async fn mark_ignored(&self, match_id: i64, reason: &str) -> Result<()> {
        self.ignored.insert(match_id, reason.to_string());
        Ok(())
    }

    async fn today_added_count(&self, day: NaiveDate) -> Result<i64> {
        Ok(self.selected.iter().filter(|m| m.value().day() == day).count() as i64)
    }

    async fn total_matches_count(&self) -> Result<i64> {
        Ok(self.selected.len() as i64)
    }
}
