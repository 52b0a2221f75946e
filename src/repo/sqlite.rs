use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::repo::Repository;
use crate::types::{Match, MatchStatus, MsOdds, Score};

/// SQLite-backed repository. One row per fixture per table, keyed by the
/// provider match id; every write is an upsert so phase re-runs are safe.
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct RawFixtureRow {
    match_id: i64,
    league_id: i64,
    kickoff_utc: DateTime<Utc>,
    home_team_id: i64,
    away_team_id: i64,
    status: String,
    done: bool,
    ignored: bool,
}

impl From<RawFixtureRow> for Match {
    fn from(row: RawFixtureRow) -> Self {
        Match {
            match_id: row.match_id,
            league_id: row.league_id,
            kickoff_utc: row.kickoff_utc,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            status: MatchStatus::parse(&row.status),
            is_done: row.done,
            is_ignored: row.ignored,
        }
    }
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) and migrate the database at `db_path`.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn save_raw_fixture(&self, m: &Match) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO raw_fixtures (match_id, day, league_id, kickoff_utc, home_team_id, away_team_id, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                day = excluded.day,
                league_id = excluded.league_id,
                kickoff_utc = excluded.kickoff_utc,
                home_team_id = excluded.home_team_id,
                away_team_id = excluded.away_team_id,
                status = excluded.status
            "#,
        )
        .bind(m.match_id)
        .bind(m.day())
        .bind(m.league_id)
        .bind(m.kickoff_utc)
        .bind(m.home_team_id)
        .bind(m.away_team_id)
        .bind(m.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_raw_fixtures(&self, day: NaiveDate) -> Result<Vec<Match>> {
        let rows: Vec<RawFixtureRow> = sqlx::query_as(
            r#"
            SELECT r.match_id, r.league_id, r.kickoff_utc, r.home_team_id, r.away_team_id, r.status,
                   COALESCE(f.done, 0) AS done,
                   COALESCE(f.ignored, 0) AS ignored
            FROM raw_fixtures r
            LEFT JOIN match_flags f ON f.match_id = r.match_id
            WHERE r.day = ?
            ORDER BY r.kickoff_utc ASC, r.match_id ASC
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Match::from).collect())
    }

    async fn upsert_match(&self, m: &Match) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO matches (match_id, day, league_id, kickoff_utc, home_team_id, away_team_id, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                day = excluded.day,
                league_id = excluded.league_id,
                kickoff_utc = excluded.kickoff_utc,
                home_team_id = excluded.home_team_id,
                away_team_id = excluded.away_team_id,
                status = excluded.status
            "#,
        )
        .bind(m.match_id)
        .bind(m.day())
        .bind(m.league_id)
        .bind(m.kickoff_utc)
        .bind(m.home_team_id)
        .bind(m.away_team_id)
        .bind(m.status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_ms_odds(&self, match_id: i64, odds: &MsOdds) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ms_odds (match_id, home, draw, away, taken_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                home = excluded.home,
                draw = excluded.draw,
                away = excluded.away,
                taken_at = excluded.taken_at
            "#,
        )
        .bind(match_id)
        .bind(odds.home)
        .bind(odds.draw)
        .bind(odds.away)
        .bind(odds.taken_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_ms_odds(&self, match_id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ms_odds WHERE match_id = ?)")
                .bind(match_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn save_score(&self, match_id: i64, score: &Score) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scores (match_id, ht_home, ht_away, ft_home, ft_away, went_extra_time, went_penalties)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                ht_home = COALESCE(excluded.ht_home, scores.ht_home),
                ht_away = COALESCE(excluded.ht_away, scores.ht_away),
                ft_home = COALESCE(excluded.ft_home, scores.ft_home),
                ft_away = COALESCE(excluded.ft_away, scores.ft_away),
                went_extra_time = excluded.went_extra_time,
                went_penalties = excluded.went_penalties
            "#,
        )
        .bind(match_id)
        .bind(score.ht_home)
        .bind(score.ht_away)
        .bind(score.ft_home)
        .bind(score.ft_away)
        .bind(score.went_extra_time)
        .bind(score.went_penalties)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_score(&self, match_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM scores WHERE match_id = ? AND ft_home IS NOT NULL AND ft_away IS NOT NULL)",
        )
        .bind(match_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn mark_done(&self, match_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO match_flags (match_id, done, updated_at)
            VALUES (?, 1, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                done = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(match_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_done(&self, match_id: i64) -> Result<bool> {
        let done: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM match_flags WHERE match_id = ? AND done = 1)",
        )
        .bind(match_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(done)
    }

    async fn mark_ignored(&self, match_id: i64, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO match_flags (match_id, ignored, ignore_reason, updated_at)
            VALUES (?, 1, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                ignored = 1,
                ignore_reason = excluded.ignore_reason,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(match_id)
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn today_added_count(&self, day: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE day = ?")
            .bind(day)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn total_matches_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    // ":memory:" databases are per-connection, so tests pin the pool to one.
    async fn test_repo() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        SqliteRepository::new(pool)
    }

    fn test_match(match_id: i64, hour: u32, status: MatchStatus) -> Match {
        Match {
            match_id,
            league_id: 7,
            kickoff_utc: Utc.with_ymd_and_hms(2026, 8, 28, hour, 0, 0).single().unwrap(),
            home_team_id: 100,
            away_team_id: 200,
            status,
            is_done: false,
            is_ignored: false,
        }
    }

    #[tokio::test]
    async fn raw_fixture_upsert_overwrites_status_in_place() {
        let repo = test_repo().await;
        repo.save_raw_fixture(&test_match(1, 12, MatchStatus::NotStarted)).await.unwrap();
        repo.save_raw_fixture(&test_match(1, 12, MatchStatus::FullTime)).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        let listed = repo.list_raw_fixtures(day).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, MatchStatus::FullTime);
    }

    #[tokio::test]
    async fn listing_is_day_scoped_and_kickoff_ordered() {
        let repo = test_repo().await;
        repo.save_raw_fixture(&test_match(2, 20, MatchStatus::NotStarted)).await.unwrap();
        repo.save_raw_fixture(&test_match(1, 12, MatchStatus::NotStarted)).await.unwrap();
        let mut tomorrow = test_match(3, 12, MatchStatus::NotStarted);
        tomorrow.kickoff_utc = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).single().unwrap();
        repo.save_raw_fixture(&tomorrow).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        let listed = repo.list_raw_fixtures(day).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|m| m.match_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn flags_round_trip_onto_listed_fixtures() {
        let repo = test_repo().await;
        repo.save_raw_fixture(&test_match(1, 12, MatchStatus::FullTime)).await.unwrap();
        repo.save_raw_fixture(&test_match(2, 13, MatchStatus::Cancelled)).await.unwrap();
        repo.mark_done(1).await.unwrap();
        repo.mark_ignored(2, "CANC").await.unwrap();
        // Idempotent re-marks.
        repo.mark_done(1).await.unwrap();
        repo.mark_ignored(2, "CANC").await.unwrap();

        assert!(repo.is_done(1).await.unwrap());
        assert!(!repo.is_done(2).await.unwrap());

        let day = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        let listed = repo.list_raw_fixtures(day).await.unwrap();
        assert!(listed[0].is_done && !listed[0].is_ignored);
        assert!(!listed[1].is_done && listed[1].is_ignored);
    }

    #[tokio::test]
    async fn odds_save_is_idempotent_and_gates_has_ms_odds() {
        let repo = test_repo().await;
        assert!(!repo.has_ms_odds(1).await.unwrap());

        let odds = MsOdds { home: 1.85, draw: 3.4, away: 4.1, taken_at: Utc::now() };
        repo.save_ms_odds(1, &odds).await.unwrap();
        repo.save_ms_odds(1, &odds).await.unwrap();
        assert!(repo.has_ms_odds(1).await.unwrap());
    }

    #[tokio::test]
    async fn score_merges_incrementally_and_gates_on_full_time() {
        let repo = test_repo().await;
        let halftime = Score { ht_home: Some(1), ht_away: Some(0), ..Score::default() };
        repo.save_score(1, &halftime).await.unwrap();
        assert!(!repo.has_score(1).await.unwrap());

        let fulltime = Score { ft_home: Some(2), ft_away: Some(1), ..Score::default() };
        repo.save_score(1, &fulltime).await.unwrap();
        assert!(repo.has_score(1).await.unwrap());
    }

    #[tokio::test]
    async fn panel_counters_count_selected_matches_per_day() {
        let repo = test_repo().await;
        repo.upsert_match(&test_match(1, 12, MatchStatus::FullTime)).await.unwrap();
        repo.upsert_match(&test_match(1, 12, MatchStatus::FullTime)).await.unwrap();
        repo.upsert_match(&test_match(2, 15, MatchStatus::NotStarted)).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        assert_eq!(repo.today_added_count(day).await.unwrap(), 2);
        assert_eq!(
            repo.today_added_count(NaiveDate::from_ymd_opt(2026, 8, 29).unwrap())
                .await
                .unwrap(),
            0
        );
        assert_eq!(repo.total_matches_count().await.unwrap(), 2);
    }
}
