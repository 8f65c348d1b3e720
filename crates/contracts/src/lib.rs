//! # Contracts
//!
//! Frozen interface contracts shared by the tracker and mapper processes.
//! All business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Index Model
//! - `video_index` is the position of a keyframe in the collaborator-owned video store
//! - the store counter is monotonic except for rollback when the frontend deletes
//!   a keyframe that turned out to be too close to its predecessor
//! - timestamps are dataset timestamps (seconds, f64)

mod collaborator;
mod config;
mod depth_prior;
mod error;
mod frame;
mod handshake;
mod mapping;

pub use collaborator::*;
pub use config::*;
pub use depth_prior::*;
pub use error::*;
pub use frame::*;
pub use handshake::*;
pub use mapping::*;
