mod budget;
mod config;
mod error;
mod jobs;
mod repo;
mod source;
mod types;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use budget::BudgetTracker;
use config::Config;
use jobs::JobSummary;
use repo::{Repository, SqliteRepository};
use source::{DataSource, MockSource, ProviderSource};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(phase) = args.next() else {
        eprintln!("usage: matchmotor <acquire|select|finalize> [YYYY-MM-DD]");
        std::process::exit(2);
    };
    let day = match args.next() {
        Some(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(day) => day,
            Err(_) => {
                eprintln!("invalid day {s:?}, expected YYYY-MM-DD");
                std::process::exit(2);
            }
        },
        None => Utc::now().date_naive(),
    };

    if let Err(e) = run(&cfg, &phase, day).await {
        error!("job failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: &Config, phase: &str, day: NaiveDate) -> error::Result<()> {
    let repo = SqliteRepository::connect(&cfg.db_path).await?;

    let source: Box<dyn DataSource> = match &cfg.provider_api_key {
        Some(_) => Box::new(ProviderSource::from_config(cfg)?),
        None => {
            warn!("PROVIDER_API_KEY not set, running against the mock source");
            Box::new(MockSource::new(
                config::MOCK_FIXTURES_PER_DAY,
                config::MOCK_MS_ODDS_RATIO,
                config::MOCK_SEED,
            ))
        }
    };

    // Each run gets its own budget; nothing carries over between triggers.
    let mut budget = BudgetTracker::new(cfg.max_daily_requests);

    info!(%day, phase, limit = budget.limit(), "starting job");
    let summary = match phase {
        "acquire" | jobs::JOB_ACQUISITION => {
            jobs::run_acquisition(cfg, source.as_ref(), &repo, &mut budget, day).await?
        }
        "select" | jobs::JOB_SELECTION => {
            jobs::run_selection(cfg, source.as_ref(), &repo, &mut budget, day).await?
        }
        "finalize" | jobs::JOB_FINALIZATION => {
            jobs::run_finalization(cfg, source.as_ref(), &repo, &mut budget, day).await?
        }
        other => {
            eprintln!("unknown phase {other:?}, expected acquire, select or finalize");
            std::process::exit(2);
        }
    };

    report(&repo, &summary).await?;
    Ok(())
}

async fn report(repo: &SqliteRepository, summary: &JobSummary) -> error::Result<()> {
    info!(
        job = summary.job_name,
        day = %summary.day,
        fixtures = summary.fixtures_count,
        processed = summary.processed_count,
        selected = summary.selected_count,
        ignored = summary.ignored_count,
        done = summary.done_count,
        requests = summary.requests_used,
        "job finished"
    );
    let today_added = repo.today_added_count(summary.day).await?;
    let total = repo.total_matches_count().await?;
    info!(today_added, total, "match counters");
    Ok(())
}
