//! # Collaborators
//!
//! Runnable stand-ins for the tracker's external collaborators, so the
//! coordination protocol can run end to end without neural networks:
//!
//! - [`SharedVideoStore`]: keyframe store with the shared monotonic counter
//! - [`ThresholdMotionGate`]: admits frames whose intensity changed enough
//! - [`WindowedFrontend`]: initialization window and keyframe deletion
//! - [`LoggingGlobalRefiner`]: records global BA requests
//! - [`SyntheticDataset`] / [`ListingDataset`]: frame sources
//! - [`mono_prior`]: depth prior post-processing and persistence

mod backend;
mod dataset;
mod frontend;
mod motion_gate;
pub mod mono_prior;
mod video_store;

pub use backend::{BaRun, LoggingGlobalRefiner, RECENT_BA_RUNS};
pub use dataset::{ListingDataset, SyntheticDataset, SyntheticDatasetConfig};
pub use frontend::WindowedFrontend;
pub use motion_gate::ThresholdMotionGate;
pub use mono_prior::{IntensityDepthEstimator, MonoPriorWriter};
pub use video_store::{SharedVideoStore, StoredFrame};
