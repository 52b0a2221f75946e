use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::budget::BudgetTracker;
use crate::config::Config;
use crate::error::Result;
use crate::repo::Repository;
use crate::source::DataSource;
use crate::types::{Match, MatchStatus};

pub const JOB_ACQUISITION: &str = "01:00";
pub const JOB_SELECTION: &str = "15:00";
pub const JOB_FINALIZATION: &str = "23:00";

/// Ignore reason for a finished fixture whose 1X2 market never existed.
pub const REASON_NO_MS_ODDS: &str = "NO_MS_ODDS";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub day: NaiveDate,
    pub job_name: &'static str,
    pub fixtures_count: usize,
    pub processed_count: usize,
    pub selected_count: usize,
    pub ignored_count: usize,
    pub done_count: usize,
    pub requests_used: u32,
}

impl JobSummary {
    fn empty(day: NaiveDate, job_name: &'static str) -> Self {
        Self {
            day,
            job_name,
            fixtures_count: 0,
            processed_count: 0,
            selected_count: 0,
            ignored_count: 0,
            done_count: 0,
            requests_used: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Stable sort — fixtures with equal kickoff keep provider order.
fn sort_by_kickoff(mut matches: Vec<Match>) -> Vec<Match> {
    matches.sort_by_key(|m| m.kickoff_utc);
    matches
}

/// One fixtures call, reduced to a `match_id → status` map.
async fn refresh_status_map(
    source: &dyn DataSource,
    day: NaiveDate,
) -> Result<HashMap<i64, MatchStatus>> {
    let bundle = source.get_fixtures(day).await?;
    Ok(bundle.matches.into_iter().map(|m| (m.match_id, m.status)).collect())
}

/// Overwrite statuses on the in-memory snapshot. Fixtures the provider no
/// longer reports keep their stored status.
fn apply_status(matches: &mut [Match], status_map: &HashMap<i64, MatchStatus>) {
    for m in matches.iter_mut() {
        if let Some(status) = status_map.get(&m.match_id) {
            m.status = *status;
        }
    }
}

// ---------------------------------------------------------------------------
// 01:00 — Acquisition: fill the raw pool for the day
// ---------------------------------------------------------------------------

pub async fn run_acquisition(
    _cfg: &Config,
    source: &dyn DataSource,
    repo: &dyn Repository,
    budget: &mut BudgetTracker,
    day: NaiveDate,
) -> Result<JobSummary> {
    if !budget.can_consume(1) {
        return Ok(JobSummary::empty(day, JOB_ACQUISITION));
    }
    budget.consume(1)?;
    let bundle = source.get_fixtures(day).await?;
    let fixtures = sort_by_kickoff(bundle.matches);

    let mut processed = 0usize;
    let mut ignored = 0usize;

    for m in &fixtures {
        // Raw pool is a full audit copy — saved even when routed to ignored.
        if let Err(e) = repo.save_raw_fixture(m).await {
            warn!(match_id = m.match_id, "raw fixture save failed, skipping: {e}");
            continue;
        }
        processed += 1;

        if m.status.should_ignore() {
            match repo.mark_ignored(m.match_id, m.status.as_str()).await {
                Ok(()) => ignored += 1,
                Err(e) => warn!(match_id = m.match_id, "mark_ignored failed: {e}"),
            }
        }
    }

    Ok(JobSummary {
        day,
        job_name: JOB_ACQUISITION,
        fixtures_count: fixtures.len(),
        processed_count: processed,
        selected_count: 0,
        ignored_count: ignored,
        done_count: 0,
        requests_used: budget.used(),
    })
}

// ---------------------------------------------------------------------------
// 15:00 — Selection: the main daily job
// ---------------------------------------------------------------------------

enum SelectOutcome {
    AlreadyDone,
    IgnoredStatus,
    NoOdds,
    Selected { completed: bool },
    Deferred,
    BudgetExhausted,
}

pub async fn run_selection(
    cfg: &Config,
    source: &dyn DataSource,
    repo: &dyn Repository,
    budget: &mut BudgetTracker,
    day: NaiveDate,
) -> Result<JobSummary> {
    let mut raw = sort_by_kickoff(repo.list_raw_fixtures(day).await?);

    // One bulk status refresh for the whole pool, budget permitting.
    if budget.can_consume(1) {
        budget.consume(1)?;
        let status_map = refresh_status_map(source, day).await?;
        apply_status(&mut raw, &status_map);
    }

    let mut processed = 0usize;
    let mut selected = 0usize;
    let mut ignored = 0usize;
    let mut done = 0usize;

    for m in &raw {
        if selected >= cfg.max_matches_per_day {
            break;
        }

        match select_fixture(source, repo, budget, m).await {
            Ok(SelectOutcome::AlreadyDone) => {}
            Ok(SelectOutcome::IgnoredStatus) => ignored += 1,
            Ok(SelectOutcome::NoOdds) => {
                processed += 1;
                ignored += 1;
            }
            Ok(SelectOutcome::Selected { completed }) => {
                processed += 1;
                selected += 1;
                if completed {
                    done += 1;
                }
            }
            Ok(SelectOutcome::Deferred) => processed += 1,
            Ok(SelectOutcome::BudgetExhausted) => break,
            Err(e) => {
                // Fixture stays raw; a transient outage degrades throughput,
                // not stored state.
                warn!(match_id = m.match_id, "fixture enrichment failed: {e}");
            }
        }
    }

    Ok(JobSummary {
        day,
        job_name: JOB_SELECTION,
        fixtures_count: raw.len(),
        processed_count: processed,
        selected_count: selected,
        ignored_count: ignored,
        done_count: done,
        requests_used: budget.used(),
    })
}

async fn select_fixture(
    source: &dyn DataSource,
    repo: &dyn Repository,
    budget: &mut BudgetTracker,
    m: &Match,
) -> Result<SelectOutcome> {
    if repo.is_done(m.match_id).await? {
        return Ok(SelectOutcome::AlreadyDone);
    }
    if m.status.should_ignore() {
        repo.mark_ignored(m.match_id, m.status.as_str()).await?;
        return Ok(SelectOutcome::IgnoredStatus);
    }

    // Finished: odds are mandatory, then the score can close it out.
    if m.status.is_finished() {
        if !budget.can_consume(1) {
            return Ok(SelectOutcome::BudgetExhausted);
        }
        budget.consume(1)?;
        let Some(odds) = source.get_ms_odds(m.match_id).await? else {
            repo.mark_ignored(m.match_id, REASON_NO_MS_ODDS).await?;
            return Ok(SelectOutcome::NoOdds);
        };
        repo.upsert_match(m).await?;
        repo.save_ms_odds(m.match_id, &odds).await?;

        // The fixture is selected either way; a score failure here just
        // leaves the close-out to finalization.
        let completed = match capture_score(source, repo, budget, m.match_id).await {
            Ok(completed) => completed,
            Err(e) => {
                warn!(match_id = m.match_id, "score capture failed, deferring: {e}");
                false
            }
        };
        return Ok(SelectOutcome::Selected { completed });
    }

    // Not started: snapshot the pre-match market if one exists.
    if m.status.is_not_started() {
        if !budget.can_consume(1) {
            return Ok(SelectOutcome::BudgetExhausted);
        }
        budget.consume(1)?;
        let Some(odds) = source.get_ms_odds(m.match_id).await? else {
            // No market for a future fixture — counted, but left in the raw
            // pool rather than flagged.
            return Ok(SelectOutcome::NoOdds);
        };
        repo.upsert_match(m).await?;
        repo.save_ms_odds(m.match_id, &odds).await?;
        return Ok(SelectOutcome::Selected { completed: false });
    }

    // In play (1H/HT/2H) or unrecognized — finalization picks it up.
    Ok(SelectOutcome::Deferred)
}

/// Opportunistic score fetch for a just-selected fixture. Marks the fixture
/// done only when the score carries both full-time goal counts.
async fn capture_score(
    source: &dyn DataSource,
    repo: &dyn Repository,
    budget: &mut BudgetTracker,
    match_id: i64,
) -> Result<bool> {
    if !budget.can_consume(1) {
        return Ok(false);
    }
    budget.consume(1)?;
    let Some(score) = source.get_score(match_id).await? else {
        return Ok(false);
    };
    repo.save_score(match_id, &score).await?;
    if score.has_full_time() {
        repo.mark_done(match_id).await?;
        return Ok(true);
    }
    Ok(false)
}

// ---------------------------------------------------------------------------
// 23:00 — Finalization: close out selected fixtures
// ---------------------------------------------------------------------------

enum FinalizeOutcome {
    NotSelected,
    AlreadyDone,
    IgnoredStatus,
    Done,
    Pending,
}

pub async fn run_finalization(
    _cfg: &Config,
    source: &dyn DataSource,
    repo: &dyn Repository,
    budget: &mut BudgetTracker,
    day: NaiveDate,
) -> Result<JobSummary> {
    let mut raw = sort_by_kickoff(repo.list_raw_fixtures(day).await?);

    if budget.can_consume(1) {
        budget.consume(1)?;
        let status_map = refresh_status_map(source, day).await?;
        apply_status(&mut raw, &status_map);
    }

    let mut processed = 0usize;
    let mut ignored = 0usize;
    let mut done = 0usize;

    for m in &raw {
        match finalize_fixture(source, repo, budget, m).await {
            Ok(FinalizeOutcome::NotSelected) => {}
            Ok(FinalizeOutcome::AlreadyDone) => {}
            Ok(FinalizeOutcome::IgnoredStatus) => ignored += 1,
            Ok(FinalizeOutcome::Done) => {
                processed += 1;
                done += 1;
            }
            Ok(FinalizeOutcome::Pending) => processed += 1,
            Err(e) => {
                warn!(match_id = m.match_id, "fixture finalization failed: {e}");
            }
        }
    }

    Ok(JobSummary {
        day,
        job_name: JOB_FINALIZATION,
        fixtures_count: raw.len(),
        processed_count: processed,
        selected_count: 0,
        ignored_count: ignored,
        done_count: done,
        requests_used: budget.used(),
    })
}

async fn finalize_fixture(
    source: &dyn DataSource,
    repo: &dyn Repository,
    budget: &mut BudgetTracker,
    m: &Match,
) -> Result<FinalizeOutcome> {
    // Only fixtures already selected are considered here; anything unselected
    // waits for the next acquisition/selection cycle.
    if !repo.has_ms_odds(m.match_id).await? {
        return Ok(FinalizeOutcome::NotSelected);
    }
    if repo.is_done(m.match_id).await? {
        return Ok(FinalizeOutcome::AlreadyDone);
    }
    if m.status.should_ignore() {
        repo.mark_ignored(m.match_id, m.status.as_str()).await?;
        return Ok(FinalizeOutcome::IgnoredStatus);
    }

    // The repository is re-consulted per step — odds can have been lost to a
    // partial failure since the pool gate above ran.
    if !repo.has_ms_odds(m.match_id).await? && budget.can_consume(1) {
        budget.consume(1)?;
        if let Some(odds) = source.get_ms_odds(m.match_id).await? {
            repo.save_ms_odds(m.match_id, &odds).await?;
        }
    }

    if m.status.is_finished() {
        if !repo.has_score(m.match_id).await? && budget.can_consume(1) {
            budget.consume(1)?;
            if let Some(score) = source.get_score(m.match_id).await? {
                repo.save_score(m.match_id, &score).await?;
            }
        }
        if repo.has_score(m.match_id).await? {
            repo.mark_done(m.match_id).await?;
            return Ok(FinalizeOutcome::Done);
        }
    }

    Ok(FinalizeOutcome::Pending)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
