//! `simulate` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use contracts::{MappingBackend, SlamConfig};
use mapper::{JournalBackend, LogBackend};

use crate::cli::SimulateArgs;
use crate::pipeline::{build_tracker, drive_tracker, load_config, open_dataset, serve_mapper};

/// Execute the `simulate` command
///
/// Tracker and mapper share one runtime over the in-process link.
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Loading configuration");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.config.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    match args.journal {
        Some(ref path) => {
            let backend = JournalBackend::create(path)
                .await
                .with_context(|| format!("Failed to create journal {}", path.display()))?;
            info!(journal = %path.display(), "Journaling mapper requests");
            simulate_with(&config, args, backend).await
        }
        None => simulate_with(&config, args, LogBackend::default()).await,
    }
}

async fn simulate_with<B>(config: &SlamConfig, args: &SimulateArgs, backend: B) -> Result<()>
where
    B: MappingBackend + Send + 'static,
{
    let dataset = open_dataset(&args.source).context("Failed to open dataset")?;
    let (tracker_link, mapper_link) = handshake::pair();

    let mapper_task = tokio::spawn(serve_mapper(mapper_link, backend));

    let mut tracker =
        build_tracker(config, args.source.size, tracker_link).context("Failed to set up tracker")?;

    info!(backend = "in-process", "Starting simulation...");
    let tracked = drive_tracker(&mut tracker, &dataset).await;

    // The mapper stops on the terminal message or when the tracker link drops.
    drop(tracker);
    let mapped = mapper_task.await.context("Mapper task panicked")?;

    let mut stats = tracked.context("Tracking session failed")?;
    let mapper_stats = mapped.context("Mapper session failed")?;
    stats.mapper = mapper_stats.mapper;
    stats.interrupted |= mapper_stats.interrupted;

    stats.print_summary();
    info!("SLAM Coord simulation finished");
    Ok(())
}
