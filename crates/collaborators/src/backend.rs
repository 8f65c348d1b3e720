//! Global refiner that records its invocations.

use std::fmt;

use contracts::{ContractError, GlobalRefiner};
use ringbuf::{traits::*, HeapRb};
use tracing::info;

use crate::SharedVideoStore;

/// Number of recent `dense_ba` calls kept for inspection
pub const RECENT_BA_RUNS: usize = 64;

/// One recorded `dense_ba` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaRun {
    pub window: usize,
    /// Newest video index at the time of the call
    pub newest_index: u64,
}

/// Global refiner stand-in
///
/// Counts every call but only keeps the last [`RECENT_BA_RUNS`] of them.
pub struct LoggingGlobalRefiner {
    store: SharedVideoStore,
    recent: HeapRb<BaRun>,
    run_count: u64,
}

impl fmt::Debug for LoggingGlobalRefiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGlobalRefiner")
            .field("run_count", &self.run_count)
            .field("last_run", &self.last_run())
            .finish()
    }
}

impl LoggingGlobalRefiner {
    pub fn new(store: SharedVideoStore) -> Self {
        Self {
            store,
            recent: HeapRb::new(RECENT_BA_RUNS),
            run_count: 0,
        }
    }

    /// Total `dense_ba` calls, including those no longer retained
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    pub fn last_run(&self) -> Option<BaRun> {
        self.recent.iter().last().copied()
    }

    /// Retained runs, oldest first
    pub fn recent_runs(&self) -> impl Iterator<Item = &BaRun> + '_ {
        self.recent.iter()
    }
}

impl GlobalRefiner for LoggingGlobalRefiner {
    fn dense_ba(&mut self, window: usize) -> Result<(), ContractError> {
        let counter = self.store.counter();
        if counter == 0 {
            return Err(ContractError::collaborator(
                "global refiner",
                "dense BA requested on an empty video store",
            ));
        }
        let run = BaRun {
            window,
            newest_index: counter - 1,
        };
        info!(window, newest_index = run.newest_index, "Global BA");
        self.recent.push_overwrite(run);
        self.run_count += 1;
        Ok(())
    }
}
