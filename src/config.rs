use crate::error::{AppError, Result};

pub const PROVIDER_BASE_URL: &str = "https://www.nosyapi.com/apiv2/service";

/// Timeout for provider HTTP calls (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Mock source shape used when no provider key is configured:
/// fixtures generated per day and the share of them carrying a 1X2 market.
pub const MOCK_FIXTURES_PER_DAY: usize = 420;
pub const MOCK_MS_ODDS_RATIO: f64 = 0.6;
pub const MOCK_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct Config {
    /// Request budget a single job run may spend (MAX_DAILY_REQUESTS).
    pub max_daily_requests: u32,
    /// The provider's real ceiling (HARD_API_LIMIT). Informational only —
    /// the tracker enforces `max_daily_requests`, this is the buffer above it.
    pub hard_api_limit: u32,
    /// Cap on newly selected fixtures per selection run (MAX_MATCHES_PER_DAY).
    pub max_matches_per_day: usize,
    pub log_level: String,
    pub db_path: String,
    pub provider_base_url: String,
    /// Provider API key (PROVIDER_API_KEY). When unset the mock source is used.
    pub provider_api_key: Option<String>,
    /// Trigger-time labels for the external scheduler (JOB_TIME_1 / JOB_TIME_2).
    /// Not consumed by the job engine itself.
    pub job_time_1: String,
    pub job_time_2: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            max_daily_requests: std::env::var("MAX_DAILY_REQUESTS")
                .unwrap_or_else(|_| "600".to_string())
                .parse::<u32>()
                .map_err(|_| {
                    AppError::Config("MAX_DAILY_REQUESTS must be a non-negative integer".to_string())
                })?,
            hard_api_limit: std::env::var("HARD_API_LIMIT")
                .unwrap_or_else(|_| "650".to_string())
                .parse::<u32>()
                .unwrap_or(650),
            max_matches_per_day: std::env::var("MAX_MATCHES_PER_DAY")
                .unwrap_or_else(|_| "500".to_string())
                .parse::<usize>()
                .unwrap_or(500),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "matchmotor.db".to_string()),
            provider_base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| PROVIDER_BASE_URL.to_string()),
            provider_api_key: std::env::var("PROVIDER_API_KEY").ok().filter(|k| !k.is_empty()),
            job_time_1: std::env::var("JOB_TIME_1").unwrap_or_else(|_| "15:00".to_string()),
            job_time_2: std::env::var("JOB_TIME_2").unwrap_or_else(|_| "23:00".to_string()),
        })
    }
}
