//! Per-run counters of the tracking loop.

use std::fmt;

use observability::HandshakeMetricsAggregator;

use crate::Dispatch;

/// Statistics of one tracking run
#[derive(Debug, Clone, Default)]
pub struct TrackingStats {
    /// Frames that completed the control cycle
    pub frames_processed: u64,

    /// Keyframes that passed the new-keyframe gate
    pub keyframes: u64,

    /// Online global BA invocations
    pub global_ba_runs: u64,

    /// Entries dropped from the keyframe buffer by capacity enforcement
    pub buffer_evictions: u64,

    /// Whether the clear-init handshake was sent
    pub init_sent: bool,

    /// Whether the terminal message went out
    pub shutdown_sent: bool,

    /// Stop was requested before the dataset was exhausted
    pub stopped_early: bool,

    /// Handshake counts and ack latency
    pub handshakes: HandshakeMetricsAggregator,
}

impl TrackingStats {
    /// Keyframe notifications (`is_keyframe = true`, non-terminal), init included
    pub fn notifications(&self) -> u64 {
        self.handshakes.count(Dispatch::Map.as_str())
            + self.handshakes.count(Dispatch::Init.as_str())
    }

    /// Gap tracking requests
    pub fn gap_dispatches(&self) -> u64 {
        self.handshakes.count(Dispatch::Gap.as_str())
    }
}

impl fmt::Display for TrackingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Tracking Summary ===")?;
        writeln!(f, "Frames processed: {}", self.frames_processed)?;
        writeln!(f, "Keyframes: {}", self.keyframes)?;
        writeln!(f, "Mapper notifications: {}", self.notifications())?;
        writeln!(f, "Gap dispatches: {}", self.gap_dispatches())?;
        writeln!(f, "Global BA runs: {}", self.global_ba_runs)?;
        writeln!(f, "Buffer evictions: {}", self.buffer_evictions)?;
        writeln!(f, "Clear-init sent: {}", self.init_sent)?;
        writeln!(f, "Shutdown sent: {}", self.shutdown_sent)?;
        if self.stopped_early {
            writeln!(f, "Stopped early: true")?;
        }
        write!(f, "{}", self.handshakes.summary())
    }
}
