//! External collaborator interfaces consumed by the tracking loop.
//!
//! All calls are synchronous from the loop's point of view. Implementations
//! may run internal worker threads; their synchronization is their own business.

use crate::{ContractError, FrameRecord, Intrinsics};

/// Decides per frame whether enough camera motion occurred
pub trait MotionGate {
    /// Update motion history with one frame; side effect only
    fn track(&mut self, frame: &FrameRecord) -> Result<(), ContractError>;
}

/// Local bundle adjustment ("frontend")
pub trait LocalRefiner {
    /// One local BA pass; may create or delete the most recent keyframe
    fn step(&mut self) -> Result<(), ContractError>;

    /// Whether the frontend finished its initialization window
    fn is_initialized(&self) -> bool;

    /// Number of keyframes in the shared video store
    ///
    /// Monotonically non-decreasing except for rollback when the most recent
    /// keyframe is deleted during [`LocalRefiner::step`].
    fn video_counter(&self) -> u64;
}

/// Global bundle adjustment ("backend")
pub trait GlobalRefiner {
    /// Optimize over the `window` most recent keyframes
    fn dense_ba(&mut self, window: usize) -> Result<(), ContractError>;
}

/// Finite, indexable frame stream
pub trait Dataset {
    /// Number of frames
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame at `index`
    fn get(&self, index: usize) -> Result<FrameRecord, ContractError>;

    /// Camera intrinsics shared by every frame
    fn intrinsics(&self) -> Intrinsics;
}
