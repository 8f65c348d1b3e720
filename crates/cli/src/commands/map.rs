//! `map` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use handshake::MapperListener;
use mapper::{JournalBackend, LogBackend};

use crate::cli::MapArgs;
use crate::error::CliError;
use crate::pipeline::{load_config, serve_mapper, shutdown_signal};

/// Execute the `map` command
pub async fn run_map(args: &MapArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Loading configuration");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.config.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let listener = MapperListener::bind(config.handshake.address.as_str(), config.handshake.format)
        .await
        .map_err(|e| CliError::mapper_connection(&config.handshake.address, e.to_string()))?;
    info!(
        address = %listener.local_addr()?,
        format = config.handshake.format.as_str(),
        "Mapper listening, waiting for tracker..."
    );

    let endpoint = tokio::select! {
        accepted = listener.accept() => accepted.context("Failed to accept tracker connection")?,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal before a tracker connected");
            return Ok(());
        }
    };

    let stats = match args.journal {
        Some(ref path) => {
            let backend = JournalBackend::create(path)
                .await
                .with_context(|| format!("Failed to create journal {}", path.display()))?;
            info!(journal = %path.display(), "Journaling mapper requests");
            serve_mapper(endpoint, backend).await
        }
        None => serve_mapper(endpoint, LogBackend::default()).await,
    }
    .context("Mapper session failed")?;

    stats.print_summary();
    info!("SLAM Coord mapper finished");
    Ok(())
}
