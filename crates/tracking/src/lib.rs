//! # Tracking
//!
//! Tracker-side control loop of the tracker/mapper pipeline.
//!
//! Responsibilities:
//! - one control decision per input frame, in stream order
//! - keyframe gating and the delayed-dispatch buffer (gap tracking)
//! - throttled global bundle adjustment
//! - synchronous send→ack handshakes with the mapper, including the
//!   clear-init special case and the terminal shutdown message
//!
//! ## Example
//!
//! ```ignore
//! use tracking::{Collaborators, TrackingLoop};
//!
//! let collaborators = Collaborators::new(motion_gate, frontend, backend);
//! let mut tracker = TrackingLoop::new(config.to_tracker_config(), collaborators, link)?;
//! let stats = tracker.run(&dataset).await?;
//! println!("{stats}");
//! ```

mod buffer;
mod dispatch;
mod error;
mod scheduler;
mod stats;
mod tracker;

pub use buffer::{KeyframeBuffer, KEYFRAME_BUFFER_CAPACITY};
pub use dispatch::Dispatch;
pub use error::{Stage, TrackingError};
pub use scheduler::{GlobalBaScheduler, GLOBAL_BA_WINDOW};
pub use stats::TrackingStats;
pub use tracker::{Collaborators, TrackingLoop, PROGRESS_LOG_INTERVAL};

pub use contracts::{KeyframeEntry, TrackerConfig};
