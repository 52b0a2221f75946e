pub mod api;
pub mod mock;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{FixtureBundle, MsOdds, Score};

pub use api::ProviderSource;
pub use mock::MockSource;

/// External-provider contract. Each method represents exactly one provider
/// call and therefore exactly one unit against the request budget; the job
/// engine checks and consumes the budget before calling, never in here.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Every fixture the provider reports for `day`.
    async fn get_fixtures(&self, day: NaiveDate) -> Result<FixtureBundle>;

    /// 1X2 odds for a fixture. `Ok(None)` when the provider has no market
    /// for it — that is a routing signal, not an error.
    async fn get_ms_odds(&self, match_id: i64) -> Result<Option<MsOdds>>;

    /// Halftime/fulltime score. `Ok(None)` while no score is available yet.
    async fn get_score(&self, match_id: i64) -> Result<Option<Score>>;
}
