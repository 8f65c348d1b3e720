//! `track` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use handshake::TcpHandshake;

use crate::cli::TrackArgs;
use crate::error::CliError;
use crate::pipeline::{build_tracker, drive_tracker, load_config, open_dataset};

/// Execute the `track` command
pub async fn run_track(args: &TrackArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Loading configuration");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.config.display()))?;

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        println!("{:#?}", config.to_tracker_config());
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let dataset = open_dataset(&args.source).context("Failed to open dataset")?;

    info!(
        address = %config.handshake.address,
        format = config.handshake.format.as_str(),
        "Connecting to mapper..."
    );
    let channel = TcpHandshake::connect_with_retry(
        &config.handshake.address,
        config.handshake.format,
        args.connect_attempts.max(1),
        Duration::from_millis(args.connect_delay_ms),
    )
    .await
    .map_err(|e| CliError::mapper_connection(&config.handshake.address, e.to_string()))?;

    let mut tracker =
        build_tracker(&config, args.source.size, channel).context("Failed to set up tracker")?;

    info!("Starting tracker...");
    let stats = drive_tracker(&mut tracker, &dataset)
        .await
        .context("Tracking session failed")?;

    stats.print_summary();
    info!("SLAM Coord tracker finished");
    Ok(())
}
