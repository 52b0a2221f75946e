use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::source::DataSource;
use crate::types::{FixtureBundle, Match, MatchStatus, MsOdds, Score};

/// HTTP data source against the odds provider's REST service.
///
/// The provider wraps every response as `{"status": .., "data": ..}` and can
/// report `"failure"` inside an HTTP 200 body, so the status field is checked
/// on every call rather than relying on the HTTP status code.
pub struct ProviderSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ProviderSource {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = cfg
            .provider_api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("PROVIDER_API_KEY is not set".to_string()))?;
        Self::new(&cfg.provider_base_url, api_key)
    }

    /// GET an endpoint with the API key appended, unwrap the `data` payload.
    async fn get_data(&self, endpoint: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("apiKey", self.api_key.clone()));

        let body: serde_json::Value = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .json()
            .await?;

        let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("failure");
        if status != "success" {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("provider reported failure");
            return Err(AppError::Provider(format!("{endpoint}: {message}")));
        }

        Ok(body.get("data").cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl DataSource for ProviderSource {
    async fn get_fixtures(&self, day: NaiveDate) -> Result<FixtureBundle> {
        let data = self
            .get_data("fixtures/date", &[("date", day.format("%Y-%m-%d").to_string())])
            .await?;

        let items = data
            .as_array()
            .ok_or_else(|| AppError::Provider("fixtures/date: data was not an array".to_string()))?;

        let mut matches = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for item in items {
            match parse_fixture_item(item) {
                Some(m) => matches.push(m),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(day = %day, skipped, "skipped structurally unusable fixture items");
        }

        Ok(FixtureBundle { day, matches })
    }

    async fn get_ms_odds(&self, match_id: i64) -> Result<Option<MsOdds>> {
        let data = self
            .get_data("match/odds", &[("matchID", match_id.to_string())])
            .await?;
        Ok(parse_odds(&data))
    }

    async fn get_score(&self, match_id: i64) -> Result<Option<Score>> {
        let data = self
            .get_data("match/score", &[("matchID", match_id.to_string())])
            .await?;
        Ok(parse_score(&data))
    }
}

/// Parse one fixture item. Returns None when the item is structurally
/// unusable (no match id, no parseable kickoff time).
fn parse_fixture_item(v: &serde_json::Value) -> Option<Match> {
    let match_id = field_i64(v, "MatchID")?;
    let kickoff_utc = parse_kickoff(v.get("DateTime")?.as_str()?)?;

    let status = v
        .get("Status")
        .and_then(|s| s.as_str())
        .map(MatchStatus::parse)
        .unwrap_or(MatchStatus::NotStarted);

    Some(Match {
        match_id,
        league_id: field_i64(v, "LeagueID").unwrap_or(0),
        kickoff_utc,
        home_team_id: field_i64(v, "HomeTeamID").unwrap_or(0),
        away_team_id: field_i64(v, "AwayTeamID").unwrap_or(0),
        status,
        is_done: false,
        is_ignored: false,
    })
}

/// `YYYY-MM-DD HH:MM[:SS]`, provider times are UTC.
fn parse_kickoff(s: &str) -> Option<chrono::DateTime<Utc>> {
    let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .ok()?;
    Some(parsed.and_utc())
}

/// An odds payload needs all three prices to form a usable 1X2 market;
/// a null/empty payload or a partial one means the market does not exist.
fn parse_odds(data: &serde_json::Value) -> Option<MsOdds> {
    let home = field_f64(data, "HomeWin")?;
    let draw = field_f64(data, "Draw")?;
    let away = field_f64(data, "AwayWin")?;
    Some(MsOdds { home, draw, away, taken_at: Utc::now() })
}

fn parse_score(data: &serde_json::Value) -> Option<Score> {
    if !data.is_object() {
        return None;
    }
    let score = Score {
        ht_home: field_i64(data, "HTHome"),
        ht_away: field_i64(data, "HTAway"),
        ft_home: field_i64(data, "FTHome"),
        ft_away: field_i64(data, "FTAway"),
        went_extra_time: data.get("ExtraTime").and_then(|b| b.as_bool()).unwrap_or(false),
        went_penalties: data.get("Penalties").and_then(|b| b.as_bool()).unwrap_or(false),
    };
    // No goal data at all means "no score yet", not an empty score.
    if score.ht_home.is_none() && score.ht_away.is_none() && !score.has_full_time() {
        return None;
    }
    Some(score)
}

/// Providers are inconsistent about numeric fields — accept both numbers
/// and numeric strings.
fn field_i64(v: &serde_json::Value, key: &str) -> Option<i64> {
    v.get(key)
        .and_then(|x| x.as_i64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
}

fn field_f64(v: &serde_json::Value, key: &str) -> Option<f64> {
    v.get(key)
        .and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixture_item_parses_core_fields() {
        let item = json!({
            "MatchID": 9001,
            "LeagueID": "77",
            "HomeTeamID": 12,
            "AwayTeamID": 34,
            "DateTime": "2026-08-28 18:30",
            "Status": "NS",
        });
        let m = parse_fixture_item(&item).expect("parseable fixture");
        assert_eq!(m.match_id, 9001);
        assert_eq!(m.league_id, 77);
        assert_eq!(m.status, MatchStatus::NotStarted);
        assert_eq!(m.kickoff_utc.to_rfc3339(), "2026-08-28T18:30:00+00:00");
    }

    #[test]
    fn fixture_item_without_match_id_is_skipped() {
        let item = json!({ "DateTime": "2026-08-28 18:30", "Status": "NS" });
        assert!(parse_fixture_item(&item).is_none());
    }

    #[test]
    fn fixture_item_accepts_seconds_in_kickoff() {
        let item = json!({ "MatchID": 1, "DateTime": "2026-08-28 18:30:45" });
        let m = parse_fixture_item(&item).unwrap();
        assert_eq!(m.kickoff_utc.to_rfc3339(), "2026-08-28T18:30:45+00:00");
    }

    #[test]
    fn odds_parse_accepts_numeric_strings() {
        let data = json!({ "HomeWin": "1.85", "Draw": 3.4, "AwayWin": "4.1" });
        let odds = parse_odds(&data).unwrap();
        assert!((odds.home - 1.85).abs() < 1e-9);
        assert!((odds.draw - 3.4).abs() < 1e-9);
        assert!((odds.away - 4.1).abs() < 1e-9);
    }

    #[test]
    fn partial_odds_payload_is_no_market() {
        assert!(parse_odds(&json!({ "HomeWin": 1.85, "Draw": 3.4 })).is_none());
        assert!(parse_odds(&serde_json::Value::Null).is_none());
        assert!(parse_odds(&json!({})).is_none());
    }

    #[test]
    fn score_parse_fills_partial_halftime_data() {
        let data = json!({ "HTHome": 1, "HTAway": 0 });
        let score = parse_score(&data).unwrap();
        assert_eq!(score.ht_home, Some(1));
        assert!(!score.has_full_time());
    }

    #[test]
    fn empty_score_payload_is_none() {
        assert!(parse_score(&serde_json::Value::Null).is_none());
        assert!(parse_score(&json!({})).is_none());
        assert!(parse_score(&json!({ "ExtraTime": false })).is_none());
    }

    #[test]
    fn full_score_parses_extra_time_flags() {
        let data = json!({
            "HTHome": 0, "HTAway": 0, "FTHome": 2, "FTAway": 2,
            "ExtraTime": true, "Penalties": true,
        });
        let score = parse_score(&data).unwrap();
        assert!(score.has_full_time());
        assert!(score.went_extra_time);
        assert!(score.went_penalties);
    }
}
