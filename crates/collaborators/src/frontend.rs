//! Windowed local refiner.

use contracts::{ContractError, LocalRefiner};
use tracing::{debug, info};

use crate::SharedVideoStore;

/// Local refiner stand-in
///
/// Reports initialized once `window` keyframes are stored. After that, a
/// freshly admitted keyframe whose motion is below `keyframe_thresh` is
/// deleted again (rolled back), as local BA does for keyframes too close
/// to their predecessor. `keyframe_thresh == 0` disables deletion.
#[derive(Debug)]
pub struct WindowedFrontend {
    store: SharedVideoStore,
    window: usize,
    keyframe_thresh: f64,
    initialized: bool,
    /// Counter value after the previous step
    seen: u64,
    deleted: u64,
}

impl WindowedFrontend {
    pub fn new(store: SharedVideoStore, window: usize, keyframe_thresh: f64) -> Self {
        Self {
            store,
            window,
            keyframe_thresh,
            initialized: false,
            seen: 0,
            deleted: 0,
        }
    }

    /// Keyframes removed after local BA
    pub fn deleted(&self) -> u64 {
        self.deleted
    }
}

impl LocalRefiner for WindowedFrontend {
    fn step(&mut self) -> Result<(), ContractError> {
        let counter = self.store.counter();

        if !self.initialized {
            if counter as usize >= self.window {
                self.initialized = true;
                info!(keyframes = counter, window = self.window, "Frontend initialized");
            }
        } else if counter > self.seen && self.keyframe_thresh > 0.0 {
            if let Some(newest) = self.store.last() {
                if newest.motion < self.keyframe_thresh {
                    self.store.rollback();
                    self.deleted += 1;
                    debug!(
                        frame = newest.frame,
                        motion = newest.motion,
                        "Keyframe too close to its predecessor, deleted"
                    );
                }
            }
        }

        self.seen = self.store.counter();
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn video_counter(&self) -> u64 {
        self.store.counter()
    }
}
