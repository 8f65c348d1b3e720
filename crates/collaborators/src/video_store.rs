//! Keyframe store shared by the motion gate, frontend and backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One keyframe in the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredFrame {
    /// Stream position of the admitted frame
    pub frame: usize,
    pub timestamp: f64,
    /// Motion measured against the previous keyframe
    pub motion: f64,
}

#[derive(Debug, Default)]
struct Inner {
    counter: AtomicU64,
    frames: Mutex<Vec<StoredFrame>>,
}

/// Cloneable handle; every clone sees the same store
///
/// `counter()` equals the number of stored keyframes. It only goes down
/// when the newest keyframe is rolled back.
#[derive(Debug, Clone, Default)]
pub struct SharedVideoStore {
    inner: Arc<Inner>,
}

impl SharedVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn frames(&self) -> MutexGuard<'_, Vec<StoredFrame>> {
        match self.inner.frames.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a keyframe, returning its video index
    pub fn push(&self, frame: StoredFrame) -> u64 {
        let mut frames = self.frames();
        frames.push(frame);
        let len = frames.len() as u64;
        self.inner.counter.store(len, Ordering::SeqCst);
        len - 1
    }

    /// Remove the newest keyframe
    pub fn rollback(&self) -> Option<StoredFrame> {
        let mut frames = self.frames();
        let removed = frames.pop();
        self.inner
            .counter
            .store(frames.len() as u64, Ordering::SeqCst);
        removed
    }

    /// Shared keyframe counter
    pub fn counter(&self) -> u64 {
        self.inner.counter.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.frames().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<StoredFrame> {
        self.frames().last().copied()
    }

    pub fn get(&self, video_index: u64) -> Option<StoredFrame> {
        let index = usize::try_from(video_index).ok()?;
        self.frames().get(index).copied()
    }
}
