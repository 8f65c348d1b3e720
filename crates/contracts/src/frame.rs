//! FrameRecord / KeyframeEntry - per-iteration data model

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics `(fx, fy, cx, cy)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }
}

/// One sensor frame from the dataset
///
/// Consumed once per loop iteration; the image payload is opaque to the
/// control loop and only interpreted by the motion gate.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Position in the stream
    pub index: usize,

    /// Dataset timestamp (seconds)
    pub timestamp: f64,

    /// Raw image payload
    pub image: Bytes,

    /// Camera intrinsics for this frame
    pub intrinsics: Intrinsics,
}

/// A keyframe already registered in the video store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframeEntry {
    /// Index into the collaborator-owned video store
    pub video_index: u64,

    /// Timestamp of the frame that confirmed the keyframe
    pub timestamp: f64,
}

impl KeyframeEntry {
    pub fn new(video_index: u64, timestamp: f64) -> Self {
        Self {
            video_index,
            timestamp,
        }
    }
}
