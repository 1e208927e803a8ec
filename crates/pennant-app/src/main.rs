// `pennant` binary: logs go to a file, the headline count goes to stdout.
//
// The fetch session is opened once, throttled, handed to the pipeline and
// released before the result is reported.

use pennant_app::config;
use pennant_app::pipeline;
use pennant_core::http::HttpSession;
use pennant_core::{ScopedSession, Throttled};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "pennant.log";
const DEFAULT_LOG_FILTER: &str = "pennant=info,warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Pennant starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {}-{} from {}",
        config.seasons.start_year, config.seasons.end_year, config.source.base_url
    );

    let settings = config.http_settings();
    let session = ScopedSession::acquire(|| HttpSession::open(&settings))
        .context("failed to open fetch session")?;
    let fetcher = Throttled::new(session, config.rate_limiter());

    let outcome = pipeline::run(&fetcher, &config).await;

    fetcher.into_inner().release();
    let outcome = outcome?;

    for failure in &outcome.failures {
        info!(
            "Skipped {} {}: {}",
            failure.year,
            failure.team.as_deref().unwrap_or("standings"),
            failure.message
        );
    }

    let summary = &outcome.summary;
    println!(
        "{} teams won a playoff series after a month-{} win rate below {:.3} ({} postseason teams, {}-{})",
        summary.losing_april_series_winners,
        summary.month,
        summary.win_pct_threshold,
        summary.total_playoff_teams,
        summary.start_year,
        summary.end_year
    );
    println!("Exports written to {}", outcome.exports.summary.display());

    info!("Pennant finished");
    Ok(())
}

/// Send log output to `logs/pennant.log`; stdout carries only the result.
fn init_tracing() -> anyhow::Result<()> {
    let log_dir = std::env::current_dir()?.join(LOG_DIR);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("cannot create {}", log_dir.display()))?;
    let log_path = log_dir.join(LOG_FILE);
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("cannot create {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}
