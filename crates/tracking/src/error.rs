//! Tracking loop errors, classified by the stage that failed.

use std::fmt;

use contracts::ContractError;
use thiserror::Error;

use crate::Dispatch;

/// Collaborator stage within one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MotionGate,
    LocalRefiner,
    GlobalRefiner,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::MotionGate => "motion gate",
            Stage::LocalRefiner => "local refiner",
            Stage::GlobalRefiner => "global refiner",
        })
    }
}

/// Every variant aborts the run; nothing here is retried.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Tracker settings unusable by the loop
    #[error("invalid tracker configuration: {0}")]
    Config(#[source] ContractError),

    /// The dataset could not produce a frame
    #[error("dataset failed: {0}")]
    Dataset(#[source] ContractError),

    /// A collaborator raised during its step
    #[error("{stage} failed at frame {frame}: {source}")]
    Collaborator {
        stage: Stage,
        frame: usize,
        #[source]
        source: ContractError,
    },

    /// Send or acknowledgement wait failed
    #[error("{kind} handshake failed: {source}")]
    Channel {
        kind: Dispatch,
        #[source]
        source: ContractError,
    },

    /// The mapper did not acknowledge in time
    #[error("{kind} handshake for {video_index:?} not acknowledged within {waited_ms}ms")]
    AckTimeout {
        kind: Dispatch,
        video_index: Option<u64>,
        waited_ms: u64,
    },

    /// Sequencing fault; never caused by user input
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl TrackingError {
    pub(crate) fn collaborator(stage: Stage, frame: usize, source: ContractError) -> Self {
        Self::Collaborator {
            stage,
            frame,
            source,
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// True when the mapper side is unreachable or unresponsive
    pub fn is_channel_failure(&self) -> bool {
        matches!(self, Self::Channel { .. } | Self::AckTimeout { .. })
    }
}
