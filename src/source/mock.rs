use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use dashmap::DashMap;

use crate::error::Result;
use crate::source::DataSource;
use crate::types::{FixtureBundle, Match, MatchStatus, MsOdds, Score};

/// Deterministic offline data source for dev runs and local testing.
///
/// The same `(seed, day)` pair always yields the same bundle, and odds/score
/// availability is a pure function of the match id, so repeated calls within
/// a run and across phases agree with each other. Roughly `ms_odds_ratio` of
/// fixtures carry a 1X2 market (lower-league fixtures often have none), and
/// a small share of finished fixtures have no score yet, which exercises the
/// finalization backfill path.
pub struct MockSource {
    fixtures_per_day: usize,
    ms_odds_ratio: f64,
    seed: u64,
    cache: DashMap<NaiveDate, FixtureBundle>,
}

impl MockSource {
    pub fn new(fixtures_per_day: usize, ms_odds_ratio: f64, seed: u64) -> Self {
        Self {
            fixtures_per_day,
            ms_odds_ratio: ms_odds_ratio.clamp(0.0, 1.0),
            seed,
            cache: DashMap::new(),
        }
    }

    fn generate_bundle(&self, day: NaiveDate) -> FixtureBundle {
        let epoch_day = day
            .signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch"))
            .num_days() as u64;
        let day_base = (epoch_day * 100_000) as i64;

        let mut matches = Vec::with_capacity(self.fixtures_per_day);
        for i in 0..self.fixtures_per_day {
            let match_id = day_base + i as i64;
            let h = mix(self.seed, match_id as u64);

            // Kickoffs spread over 10:00–22:00 UTC; earlier fixtures are
            // further along in their lifecycle by mid-day job time.
            let hour = 10 + (i % 12) as i64;
            let minute = ((h >> 8) % 4) as i64 * 15;
            let kickoff_utc = day
                .and_hms_opt(0, 0, 0)
                .expect("midnight exists")
                .and_utc()
                + Duration::hours(hour)
                + Duration::minutes(minute);

            let status = match h % 20 {
                0 => MatchStatus::Postponed,
                1 => MatchStatus::Cancelled,
                2 => MatchStatus::FirstHalf,
                3 => MatchStatus::HalfTime,
                4 => MatchStatus::SecondHalf,
                n if n < 12 => MatchStatus::FullTime,
                _ => MatchStatus::NotStarted,
            };

            matches.push(Match {
                match_id,
                league_id: (h % 50) as i64 + 1,
                kickoff_utc,
                home_team_id: ((h >> 16) % 1000) as i64,
                away_team_id: ((h >> 32) % 1000) as i64,
                status,
                is_done: false,
                is_ignored: false,
            });
        }

        FixtureBundle { day, matches }
    }

    fn has_odds(&self, match_id: i64) -> bool {
        let h = mix(self.seed ^ 0x0DD5, match_id as u64);
        (h % 1000) as f64 / 1000.0 < self.ms_odds_ratio
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn get_fixtures(&self, day: NaiveDate) -> Result<FixtureBundle> {
        let bundle = self
            .cache
            .entry(day)
            .or_insert_with(|| self.generate_bundle(day))
            .clone();
        Ok(bundle)
    }

    async fn get_ms_odds(&self, match_id: i64) -> Result<Option<MsOdds>> {
        if !self.has_odds(match_id) {
            return Ok(None);
        }
        let h = mix(self.seed, match_id as u64);
        Ok(Some(MsOdds {
            home: 1.60 + (h % 20) as f64 * 0.03,
            draw: 3.00 + (h % 15) as f64 * 0.04,
            away: 3.20 + (h % 25) as f64 * 0.05,
            taken_at: chrono::Utc::now(),
        }))
    }

    async fn get_score(&self, match_id: i64) -> Result<Option<Score>> {
        let h = mix(self.seed ^ 0x5C0E, match_id as u64);
        // Some finished fixtures report their score late.
        if h % 10 == 7 {
            return Ok(None);
        }
        let ft_home = (h % 4) as i64;
        let ft_away = ((h >> 8) % 3) as i64;
        Ok(Some(Score {
            ht_home: Some(ft_home.min(1)),
            ht_away: Some(ft_away.min(1)),
            ft_home: Some(ft_home),
            ft_away: Some(ft_away),
            went_extra_time: false,
            went_penalties: false,
        }))
    }
}

/// splitmix64-style mixer — cheap, stable across runs.
fn mix(seed: u64, value: u64) -> u64 {
    let mut z = seed.wrapping_add(value.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
    }

    #[tokio::test]
    async fn same_day_yields_identical_bundles() {
        let source = MockSource::new(50, 0.6, 42);
        let a = source.get_fixtures(day()).await.unwrap();
        let b = source.get_fixtures(day()).await.unwrap();
        assert_eq!(a.matches.len(), 50);
        let ids_a: Vec<i64> = a.matches.iter().map(|m| m.match_id).collect();
        let ids_b: Vec<i64> = b.matches.iter().map(|m| m.match_id).collect();
        assert_eq!(ids_a, ids_b);
        for (x, y) in a.matches.iter().zip(&b.matches) {
            assert_eq!(x.status, y.status);
            assert_eq!(x.kickoff_utc, y.kickoff_utc);
        }
    }

    #[tokio::test]
    async fn odds_ratio_gates_market_availability() {
        let source = MockSource::new(200, 0.6, 42);
        let bundle = source.get_fixtures(day()).await.unwrap();
        let mut with_odds = 0usize;
        for m in &bundle.matches {
            if source.get_ms_odds(m.match_id).await.unwrap().is_some() {
                with_odds += 1;
            }
        }
        let ratio = with_odds as f64 / bundle.matches.len() as f64;
        assert!((0.4..0.8).contains(&ratio), "ratio={ratio}");
    }

    #[tokio::test]
    async fn everything_has_odds_at_ratio_one() {
        let source = MockSource::new(30, 1.0, 7);
        let bundle = source.get_fixtures(day()).await.unwrap();
        for m in &bundle.matches {
            assert!(source.get_ms_odds(m.match_id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn scores_are_complete_when_present() {
        let source = MockSource::new(100, 0.6, 42);
        let bundle = source.get_fixtures(day()).await.unwrap();
        for m in &bundle.matches {
            if let Some(score) = source.get_score(m.match_id).await.unwrap() {
                assert!(score.has_full_time());
            }
        }
    }
}
