//! Intensity-difference motion gate.

use bytes::Bytes;
use contracts::{ContractError, FrameRecord, MotionGate};
use tracing::{debug, trace};

use crate::mono_prior::MonoPriorWriter;
use crate::{SharedVideoStore, StoredFrame};

/// Admits a frame into the video store when its mean absolute intensity
/// difference to the last admitted frame reaches `thresh`
///
/// The first frame is always admitted.
pub struct ThresholdMotionGate {
    store: SharedVideoStore,
    thresh: f64,
    last_admitted: Option<Bytes>,
    depth_prior: Option<MonoPriorWriter>,
}

impl ThresholdMotionGate {
    pub fn new(store: SharedVideoStore, thresh: f64) -> Self {
        Self {
            store,
            thresh,
            last_admitted: None,
            depth_prior: None,
        }
    }

    /// Write a depth prior for every admitted frame
    pub fn with_depth_prior(mut self, writer: MonoPriorWriter) -> Self {
        self.depth_prior = Some(writer);
        self
    }

    pub fn depth_prior(&self) -> Option<&MonoPriorWriter> {
        self.depth_prior.as_ref()
    }

    /// Mean absolute per-byte difference
    pub fn motion_between(a: &[u8], b: &[u8]) -> Result<f64, ContractError> {
        if a.len() != b.len() {
            return Err(ContractError::collaborator(
                "motion gate",
                format!("image size changed from {} to {} bytes", a.len(), b.len()),
            ));
        }
        if a.is_empty() {
            return Ok(0.0);
        }
        let total: u64 = a
            .iter()
            .zip(b)
            .map(|(x, y)| u64::from(x.abs_diff(*y)))
            .sum();
        Ok(total as f64 / a.len() as f64)
    }
}

impl MotionGate for ThresholdMotionGate {
    fn track(&mut self, frame: &FrameRecord) -> Result<(), ContractError> {
        if frame.image.is_empty() {
            return Err(ContractError::collaborator(
                "motion gate",
                format!("empty image at frame {}", frame.index),
            ));
        }

        let motion = match &self.last_admitted {
            None => 0.0,
            Some(previous) => {
                let motion = Self::motion_between(previous, &frame.image)?;
                if motion < self.thresh {
                    trace!(frame = frame.index, motion, "Not enough motion");
                    return Ok(());
                }
                motion
            }
        };

        let video_index = self.store.push(StoredFrame {
            frame: frame.index,
            timestamp: frame.timestamp,
            motion,
        });
        self.last_admitted = Some(frame.image.clone());
        debug!(frame = frame.index, video_index, motion, "Frame admitted");

        if let Some(writer) = self.depth_prior.as_mut() {
            writer.write(video_index, frame)?;
        }
        Ok(())
    }
}
