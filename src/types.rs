use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Match status
// ---------------------------------------------------------------------------

/// Provider status codes for a fixture. `LIVE` is accepted as an alias for
/// first half on the wire; anything unrecognized collapses into `Other` and
/// is deferred the same way as an in-play status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(rename = "NS")]
    NotStarted,
    #[serde(rename = "1H", alias = "LIVE")]
    FirstHalf,
    #[serde(rename = "HT")]
    HalfTime,
    #[serde(rename = "2H")]
    SecondHalf,
    #[serde(rename = "FT")]
    FullTime,
    #[serde(rename = "PST")]
    Postponed,
    #[serde(rename = "CANC")]
    Cancelled,
    #[serde(other, rename = "OTHER")]
    Other,
}

impl MatchStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "NS" => MatchStatus::NotStarted,
            "1H" | "LIVE" => MatchStatus::FirstHalf,
            "HT" => MatchStatus::HalfTime,
            "2H" => MatchStatus::SecondHalf,
            "FT" => MatchStatus::FullTime,
            "PST" => MatchStatus::Postponed,
            "CANC" => MatchStatus::Cancelled,
            _ => MatchStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::NotStarted => "NS",
            MatchStatus::FirstHalf => "1H",
            MatchStatus::HalfTime => "HT",
            MatchStatus::SecondHalf => "2H",
            MatchStatus::FullTime => "FT",
            MatchStatus::Postponed => "PST",
            MatchStatus::Cancelled => "CANC",
            MatchStatus::Other => "OTHER",
        }
    }

    /// Postponed and cancelled fixtures are routed straight to ignored.
    pub fn should_ignore(&self) -> bool {
        matches!(self, MatchStatus::Postponed | MatchStatus::Cancelled)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, MatchStatus::FullTime)
    }

    pub fn is_not_started(&self) -> bool {
        matches!(self, MatchStatus::NotStarted)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: i64,
    pub league_id: i64,
    pub kickoff_utc: DateTime<Utc>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub status: MatchStatus,
    /// Convenience mirrors of repository flag state. The repository is the
    /// single source of truth; these are filled on read and never written back.
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub is_ignored: bool,
}

impl Match {
    /// Calendar day this fixture belongs to (kickoff date, UTC).
    pub fn day(&self) -> NaiveDate {
        self.kickoff_utc.date_naive()
    }
}

// ---------------------------------------------------------------------------
// MS (1X2) odds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub taken_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Score {
    pub ht_home: Option<i64>,
    pub ht_away: Option<i64>,
    pub ft_home: Option<i64>,
    pub ft_away: Option<i64>,
    pub went_extra_time: bool,
    pub went_penalties: bool,
}

impl Score {
    /// Both full-time goal counts present — the done-gate for finished matches.
    pub fn has_full_time(&self) -> bool {
        self.ft_home.is_some() && self.ft_away.is_some()
    }
}

// ---------------------------------------------------------------------------
// Fixture bundle — the output of one day-level fixtures call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FixtureBundle {
    pub day: NaiveDate,
    pub matches: Vec<Match>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_codes_round_trip() {
        for code in ["NS", "1H", "HT", "2H", "FT", "PST", "CANC"] {
            assert_eq!(MatchStatus::parse(code).as_str(), code);
        }
    }

    #[test]
    fn live_is_an_alias_for_first_half() {
        assert_eq!(MatchStatus::parse("LIVE"), MatchStatus::FirstHalf);
    }

    #[test]
    fn unknown_code_collapses_to_other() {
        let status = MatchStatus::parse("AET");
        assert_eq!(status, MatchStatus::Other);
        assert!(!status.should_ignore());
        assert!(!status.is_finished());
    }

    #[test]
    fn only_postponed_and_cancelled_are_ignorable() {
        assert!(MatchStatus::Postponed.should_ignore());
        assert!(MatchStatus::Cancelled.should_ignore());
        assert!(!MatchStatus::NotStarted.should_ignore());
        assert!(!MatchStatus::FullTime.should_ignore());
        assert!(!MatchStatus::HalfTime.should_ignore());
    }

    #[test]
    fn score_full_time_gate_requires_both_goals()  {
        let mut score = Score::default();
        assert!(!score.has_full_time());
        score.ft_home = Some(2);
        assert!(!score.has_full_time());
        score.ft_away = Some(0);
        assert!(score.has_full_time());
    }

    #[test]
    fn match_day_is_the_kickoff_date() {
        let m = Match {
            match_id: 1,
            league_id: 10,
            kickoff_utc: Utc.with_ymd_and_hms(2026, 8, 28, 18, 30, 0).single().unwrap(),
            home_team_id: 100,
            away_team_id: 200,
            status: MatchStatus::NotStarted,
            is_done: false,
            is_ignored: false,
        };
        assert_eq!(m.day(), NaiveDate::from_ymd_opt(2026, 8, 28).unwrap());
    }
}
