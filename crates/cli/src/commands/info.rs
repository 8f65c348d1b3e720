//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SlamConfig, TrackerConfig};

use crate::cli::InfoArgs;
use crate::pipeline::load_config;

/// Effective configuration for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    config: &'a SlamConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracker: Option<TrackerInfo>,
}

#[derive(Serialize)]
struct TrackerInfo {
    enable_online_ba: bool,
    ba_freq: u64,
    every_keyframe: u64,
    clear_init: bool,
    only_tracking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ack_timeout_ms: Option<u128>,
}

impl From<TrackerConfig> for TrackerInfo {
    fn from(config: TrackerConfig) -> Self {
        Self {
            enable_online_ba: config.enable_online_ba,
            ba_freq: config.ba_freq,
            every_keyframe: config.every_keyframe,
            clear_init: config.clear_init,
            only_tracking: config.only_tracking,
            ack_timeout_ms: config.ack_timeout.map(|d| d.as_millis()),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Loading configuration info");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.config.display()))?;

    let tracker = args
        .tracker
        .then(|| TrackerInfo::from(config.to_tracker_config()));

    if args.json {
        let info = ConfigInfo {
            config: &config,
            tracker,
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        let toml = config_loader::ConfigLoader::to_toml(&config)
            .context("Failed to render effective configuration")?;
        println!("# Effective configuration: {}\n", args.config.config.display());
        println!("{}", toml);
        if let Some(tracker) = tracker {
            print_tracker_info(&tracker);
        }
    }

    Ok(())
}

fn print_tracker_info(tracker: &TrackerInfo) {
    println!("# Tracker settings");
    println!("#   clear_init: {}", tracker.clear_init);
    println!("#   only_tracking: {}", tracker.only_tracking);
    println!("#   every_keyframe: {}", tracker.every_keyframe);
    println!(
        "#   global BA: {} (ba_freq {})",
        if tracker.enable_online_ba { "on" } else { "off" },
        tracker.ba_freq
    );
    match tracker.ack_timeout_ms {
        Some(ms) => println!("#   ack timeout: {} ms", ms),
        None => println!("#   ack timeout: none"),
    }
}
