//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

/// SLAM Coord - tracker/mapper coordination for keyframe-based SLAM
#[derive(Parser, Debug)]
#[command(
    name = "slam-coord",
    author,
    version,
    about = "Tracker/mapper coordination for keyframe-based SLAM",
    long_about = "Drives the per-frame tracking loop and the blocking keyframe handshake \n\
                  with a mapping process.\n\n\
                  Run `map` and `track` as two processes connected over TCP, or \n\
                  `simulate` to run both sides in one process."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SLAM_COORD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (json, pretty, compact)
    #[arg(
        long,
        default_value = "pretty",
        global = true,
        env = "SLAM_COORD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tracker and connect to a mapper over TCP
    Track(TrackArgs),

    /// Run the mapper and wait for a tracker
    Map(MapArgs),

    /// Run tracker and mapper in one process
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Configuration file plus command-line overrides
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "SLAM_COORD_CONFIG"
    )]
    pub config: PathBuf,

    /// Override `clear_init`
    #[arg(long, env = "SLAM_COORD_CLEAR_INIT")]
    pub clear_init: Option<bool>,

    /// Override `only_tracking`
    #[arg(long, env = "SLAM_COORD_ONLY_TRACKING")]
    pub only_tracking: Option<bool>,

    /// Override `handshake.address`
    #[arg(long, env = "SLAM_COORD_ADDRESS")]
    pub address: Option<String>,

    /// Override `handshake.ack_timeout_ms` (0 = wait forever)
    #[arg(long, env = "SLAM_COORD_ACK_TIMEOUT_MS")]
    pub ack_timeout_ms: Option<u64>,
}

/// Where frames come from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// TUM-style `timestamp path` listing; synthetic frames when omitted
    #[arg(long, env = "SLAM_COORD_LISTING")]
    pub listing: Option<PathBuf>,

    /// Number of synthetic frames
    #[arg(long, default_value = "300", env = "SLAM_COORD_FRAMES")]
    pub frames: usize,

    /// Synthetic frame rate
    #[arg(long, default_value = "30.0")]
    pub fps: f64,

    /// Synthetic intensity change per frame
    #[arg(long, default_value = "1.5")]
    pub motion: f64,

    /// Image size as WIDTHxHEIGHT (raw 8-bit grayscale)
    #[arg(long, default_value = "64x48", value_parser = parse_size)]
    pub size: (u32, u32),
}

/// Arguments for the `track` command
#[derive(Parser, Debug, Clone)]
pub struct TrackArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Connection attempts before giving up on the mapper
    #[arg(long, default_value = "10", env = "SLAM_COORD_CONNECT_ATTEMPTS")]
    pub connect_attempts: u32,

    /// Delay between connection attempts in milliseconds
    #[arg(long, default_value = "500")]
    pub connect_delay_ms: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SLAM_COORD_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `map` command
#[derive(Parser, Debug, Clone)]
pub struct MapArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Append every mapper request to this JSONL file
    #[arg(long, env = "SLAM_COORD_JOURNAL")]
    pub journal: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SLAM_COORD_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Append every mapper request to this JSONL file
    #[arg(long)]
    pub journal: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SLAM_COORD_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Also show the derived tracker settings
    #[arg(long)]
    pub tracker: bool,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("image size must be non-zero".to_string());
    }
    Ok((w, h))
}
