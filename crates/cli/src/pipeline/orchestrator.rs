//! Session orchestrator - assembles collaborators and drives both sides.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use collaborators::mono_prior::load_estimator;
use collaborators::{
    ListingDataset, LoggingGlobalRefiner, MonoPriorWriter, SharedVideoStore, SyntheticDataset,
    SyntheticDatasetConfig, ThresholdMotionGate, WindowedFrontend,
};
use config_loader::ConfigLoader;
use contracts::{
    Dataset, HandshakeChannel, Intrinsics, MapperEndpoint, MappingBackend, SlamConfig,
};
use mapper::{MapperReport, MapperService};
use tracing::{info, warn};
use tracking::{Collaborators, TrackingLoop};

use super::SessionStats;
use crate::cli::{ConfigArgs, SourceArgs};
use crate::error::{CliError, Result};

/// Tracking loop wired to the runnable collaborators
pub type SlamTracker<C> =
    TrackingLoop<ThresholdMotionGate, WindowedFrontend, LoggingGlobalRefiner, C>;

/// Frame source selected on the command line
pub type BoxedDataset = Box<dyn Dataset + Send + Sync>;

/// Load the config file and apply command-line overrides
///
/// The result is validated again after the overrides.
pub fn load_config(args: &ConfigArgs) -> Result<SlamConfig> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()));
    }

    let mut config = ConfigLoader::load_from_path(&args.config)?;

    if let Some(clear_init) = args.clear_init {
        info!(clear_init, "Overriding clear_init from CLI");
        config.clear_init = clear_init;
    }
    if let Some(only_tracking) = args.only_tracking {
        info!(only_tracking, "Overriding only_tracking from CLI");
        config.only_tracking = only_tracking;
    }
    if let Some(ref address) = args.address {
        info!(address = %address, "Overriding handshake address from CLI");
        config.handshake.address = address.clone();
    }
    if let Some(ack_timeout_ms) = args.ack_timeout_ms {
        info!(ack_timeout_ms, "Overriding ack timeout from CLI");
        config.handshake.ack_timeout_ms = ack_timeout_ms;
    }

    ConfigLoader::validate(&config).map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        scene = %config.scene,
        clear_init = config.clear_init,
        only_tracking = config.only_tracking,
        every_keyframe = config.mapping.every_keyframe,
        ba_freq = config.tracking.backend.ba_freq,
        address = %config.handshake.address,
        "Configuration loaded"
    );
    Ok(config)
}

/// Open the dataset named by the source arguments
pub fn open_dataset(source: &SourceArgs) -> Result<BoxedDataset> {
    if let Some(ref listing) = source.listing {
        let dataset = ListingDataset::open(listing, None)?;
        info!(listing = %listing.display(), frames = dataset.len(), "Listing dataset opened");
        return Ok(Box::new(dataset));
    }

    let (width, height) = source.size;
    let config = SyntheticDatasetConfig {
        frames: source.frames,
        fps: source.fps,
        motion_per_frame: source.motion,
        width,
        height,
        intrinsics: Intrinsics::new(
            f64::from(width.max(height)) * 1.2,
            f64::from(width.max(height)) * 1.2,
            f64::from(width) / 2.0,
            f64::from(height) / 2.0,
        ),
    };
    info!(
        frames = config.frames,
        fps = config.fps,
        motion = config.motion_per_frame,
        "Synthetic dataset configured"
    );
    Ok(Box::new(SyntheticDataset::new(config)))
}

/// Build the motion gate, frontend and global refiner over one video store
pub fn build_collaborators(
    config: &SlamConfig,
    size: (u32, u32),
) -> Result<Collaborators<ThresholdMotionGate, WindowedFrontend, LoggingGlobalRefiner>> {
    let store = SharedVideoStore::new();

    let thresh = config.tracking.motion_filter.thresh;
    let mut motion_gate = ThresholdMotionGate::new(store.clone(), thresh);
    if let Some(ref mono_prior) = config.mono_prior {
        let estimator = load_estimator(mono_prior, size.0, size.1)?;
        let writer = MonoPriorWriter::new(estimator, config.scene_output_dir())?;
        info!(
            model = %mono_prior.depth,
            output = %config.scene_output_dir().display(),
            "Mono depth prior enabled"
        );
        motion_gate = motion_gate.with_depth_prior(writer);
    }

    let frontend = WindowedFrontend::new(
        store.clone(),
        config.tracking.frontend.window,
        config.tracking.frontend.keyframe_thresh,
    );
    let backend = LoggingGlobalRefiner::new(store);

    Ok(Collaborators::new(motion_gate, frontend, backend))
}

/// Build a tracking loop over `channel`
pub fn build_tracker<C: HandshakeChannel>(
    config: &SlamConfig,
    size: (u32, u32),
    channel: C,
) -> Result<SlamTracker<C>> {
    let collaborators = build_collaborators(config, size)?;
    Ok(TrackingLoop::new(config.to_tracker_config(), collaborators, channel)?)
}

/// Run the tracker over the whole dataset until done or interrupted
///
/// The first signal stops the loop after the current frame and the terminal
/// message is still sent, so the mapper can stop. A second signal abandons
/// the tracker where it is (e.g. stuck waiting for an acknowledgement)
/// without touching the channel again.
pub async fn drive_tracker<C: HandshakeChannel>(
    tracker: &mut SlamTracker<C>,
    dataset: &BoxedDataset,
) -> Result<SessionStats> {
    let start_time = Instant::now();
    let stop = Arc::new(AtomicBool::new(false));
    let mut signals = tokio::spawn(watch_signals(Arc::clone(&stop)));

    let completed = tokio::select! {
        result = tracker.run_until(dataset.as_ref(), &stop) => Some(result),
        _ = &mut signals => None,
    };
    signals.abort();

    let tracking = match completed {
        Some(result) => result?,
        None => {
            warn!("Second shutdown signal, abandoning tracker without terminal message");
            let mut stats = tracker.stats().clone();
            stats.stopped_early = true;
            stats
        }
    };

    let stats = SessionStats {
        interrupted: tracking.stopped_early,
        tracking: Some(tracking),
        mapper: None,
        frames_total: dataset.len(),
        duration: start_time.elapsed(),
    };

    info!(
        frames = tracker.stats().frames_processed,
        keyframes = tracker.stats().keyframes,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Tracker stopped"
    );
    Ok(stats)
}

/// Raise `stop` on the first signal, return on the second
async fn watch_signals(stop: Arc<AtomicBool>) {
    shutdown_signal().await;
    warn!("Received shutdown signal, stopping tracker after the current frame...");
    stop.store(true, Ordering::SeqCst);
    shutdown_signal().await;
}

/// Serve one tracker session until it ends or the process is interrupted
pub async fn serve_mapper<E, B>(endpoint: E, backend: B) -> Result<SessionStats>
where
    E: MapperEndpoint + Send + 'static,
    B: MappingBackend + Send + 'static,
{
    let start_time = Instant::now();
    let handle = MapperService::new(endpoint, backend).spawn();
    let metrics = handle.metrics().clone();

    let (report, interrupted) = tokio::select! {
        result = handle.join() => (result?, false),
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping mapper...");
            (MapperReport::from(metrics.snapshot()), true)
        }
    };

    Ok(SessionStats {
        tracking: None,
        mapper: Some(report),
        frames_total: 0,
        duration: start_time.elapsed(),
        interrupted,
    })
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
