//! Periodic global bundle adjustment admission.

/// Keyframes covered by one online global BA run
pub const GLOBAL_BA_WINDOW: usize = 2;

/// Fixed-interval admission control for global BA
///
/// Fires when the current keyframe index is at least `frequency` past the
/// index of the previous run (the first reference point is index 0).
#[derive(Debug, Clone)]
pub struct GlobalBaScheduler {
    enabled: bool,
    frequency: u64,
    prev_index: u64,
    runs: u64,
}

impl GlobalBaScheduler {
    pub fn new(enabled: bool, frequency: u64) -> Self {
        Self {
            enabled,
            frequency,
            prev_index: 0,
            runs: 0,
        }
    }

    /// Whether a run is due at `video_index`
    pub fn is_due(&self, video_index: u64) -> bool {
        self.enabled && video_index >= self.prev_index.saturating_add(self.frequency)
    }

    /// Record a completed run
    pub fn record_run(&mut self, video_index: u64) {
        self.prev_index = video_index;
        self.runs += 1;
    }

    /// Index of the last run (0 before the first one)
    pub fn prev_index(&self) -> u64 {
        self.prev_index
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
