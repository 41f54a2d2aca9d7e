//! Fixed-Capacity Ring Buffer Implementation

use serde::{Serialize, Serializer};

/// Fixed-capacity circular buffer with overwrite-oldest semantics.
///
/// Storage is an inline array sized at compile time, so `push` never
/// allocates. The buffer holds exactly `N` entries once full; every further
/// push evicts the oldest entry.
pub struct RingBuffer<T, const N: usize> {
    /// Inline storage, `None` until a slot has been written once
    storage: [Option<T>; N],
    /// Next slot to write
    head: usize,
    /// Number of occupied slots
    len: usize,
    /// Total entries written since creation (for statistics)
    total_written: u64,
}

impl<T, const N: usize> RingBuffer<T, N> {
    const NON_ZERO: () = assert!(N > 0, "ring buffer capacity must be non-zero");

    /// Create an empty buffer
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO;
        Self {
            storage: std::array::from_fn(|_| None),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an entry, overwriting the oldest one when full. O(1).
    pub fn push(&mut self, item: T) {
        self.storage[self.head] = Some(item);
        self.head = (self.head + 1) % N;
        if self.len < N {
            self.len += 1;
        }
        self.total_written += 1;
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Get the buffer capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / N as f64
    }

    /// Total entries written since creation, including overwritten ones
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Index of the oldest occupied slot
    fn tail(&self) -> usize {
        (self.head + N - self.len) % N
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let tail = self.tail();
        // occupied slots are always Some
        (0..self.len).filter_map(move |i| self.storage[(tail + i) % N].as_ref())
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&T> {
        self.iter().next_back()
    }

    /// Oldest entry still held
    pub fn oldest(&self) -> Option<&T> {
        self.iter().next()
    }

    /// Forget all entries. Storage is kept.
    pub fn clear(&mut self) {
        for slot in self.storage.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Clone, const N: usize> RingBuffer<T, N> {
    /// Read the last `count` entries (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<T> {
        self.iter().rev().take(count).cloned().collect()
    }

    /// Copy every entry out, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug, const N: usize> std::fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Serialises as a sequence, oldest first.
impl<T: Serialize, const N: usize> Serialize for RingBuffer<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
