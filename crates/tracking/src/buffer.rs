//! Delayed-dispatch keyframe buffer.
//!
//! Fixed capacity ring of the most recent confirmed keyframes. The middle
//! slot is what gap tracking sends once the ring is full.

use std::fmt;

use contracts::KeyframeEntry;
use ringbuf::{traits::*, HeapRb};

/// Number of pending keyframes kept for gap tracking
pub const KEYFRAME_BUFFER_CAPACITY: usize = 3;

/// Bounded FIFO of pending keyframes
///
/// Insertion order is arrival order; entries are never reordered.
/// Capacity is enforced inside [`KeyframeBuffer::append`], so
/// `len() <= KEYFRAME_BUFFER_CAPACITY` holds after every call.
pub struct KeyframeBuffer {
    ring: HeapRb<KeyframeEntry>,
    evicted_count: u64,
}

impl fmt::Debug for KeyframeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyframeBuffer")
            .field("entries", &self.ring.iter().collect::<Vec<_>>())
            .field("evicted", &self.evicted_count)
            .finish()
    }
}

impl Default for KeyframeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyframeBuffer {
    pub fn new() -> Self {
        Self {
            ring: HeapRb::new(KEYFRAME_BUFFER_CAPACITY),
            evicted_count: 0,
        }
    }

    /// Append a keyframe, evicting the oldest one when full
    ///
    /// Returns the evicted entry, if any.
    #[inline]
    pub fn append(&mut self, entry: KeyframeEntry) -> Option<KeyframeEntry> {
        let evicted = self.ring.push_overwrite(entry);
        if evicted.is_some() {
            self.evicted_count += 1;
        }
        evicted
    }

    /// Entry at `position` (0 = oldest) without removing it
    #[inline]
    pub fn peek(&self, position: usize) -> Option<KeyframeEntry> {
        self.ring.iter().nth(position).copied()
    }

    /// Remove and return the oldest entry
    #[inline]
    pub fn pop_front(&mut self) -> Option<KeyframeEntry> {
        self.ring.try_pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &KeyframeEntry> + '_ {
        self.ring.iter()
    }

    /// Number of entries dropped by capacity enforcement
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }
}
