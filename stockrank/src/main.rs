//! stockrank - equity fundamentals ranking service.
//!
//! Serves `GET /stocks`: the configured universe scored on fundamentals,
//! normalized onto `[1, 10]`, ranked, and paired with a buy price.

use anyhow::Result;
use stockrank::RankingService;
use stockrank_common::config::Config;
use stockrank_common::logging::init_logging_with_exclusions;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = Config::load_and_validate()?;

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("stockrank v{}", env!("CARGO_PKG_VERSION"));

    let service = RankingService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
