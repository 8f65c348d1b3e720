//! Session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{
    build_tracker, drive_tracker, load_config, open_dataset, serve_mapper, shutdown_signal,
};
pub use stats::SessionStats;
