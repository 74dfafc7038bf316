//! # Bounded History
//!
//! Fixed-capacity FIFO buffer used for every rolling history in the
//! system: the bias detector's evaluation history and the sentinel's
//! analysis history.
//!
//! ## Design
//!
//! Entries are kept in insertion order in a `VecDeque` that grows on
//! demand up to the configured capacity. When capacity is reached the
//! oldest entry is evicted, so memory stays bounded no matter how long a
//! session runs.
//!
//! ## Eviction Policy
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `push` at capacity | Oldest entry evicted, new entry appended |
//! | `extend` | Entries pushed in order, evicting as needed |
//! | `clear` | All entries dropped, eviction count kept |
//!
//! ## Example
//!
//! ```rust
//! use sentinel_monitor::BoundedHistory;
//!
//! let mut history = BoundedHistory::new(3);
//! history.extend([1, 2, 3, 4]);
//!
//! assert_eq!(history.len(), 3);
//! assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
//! assert_eq!(history.evicted_count(), 1);
//! ```

use std::collections::VecDeque;

/// Entries reserved up front; larger histories grow as they fill.
const PREALLOCATED_ENTRIES: usize = 1024;

/// A FIFO buffer that never grows past its capacity.
///
/// # Thread Safety
///
/// Appending and trimming are not atomic. A history belongs to a single
/// owner; wrap the owner in a lock if it must be shared.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    /// Maximum number of entries.
    capacity: usize,
    /// Entries, oldest first.
    entries: VecDeque<T>,
    /// Entries evicted during the lifetime of the buffer.
    evicted_count: u64,
}

impl<T> BoundedHistory<T> {
    /// Creates an empty history.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0 (use at least 1). Configurations are validated
    /// before reaching this point.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(PREALLOCATED_ENTRIES)),
            evicted_count: 0,
        }
    }

    /// Returns the maximum capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if at capacity.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Returns total entries evicted during lifetime.
    #[inline]
    #[must_use]
    pub const fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// Appends an entry, evicting the oldest if at capacity.
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.evicted_count += 1;
            self.entries.pop_front()
        } else {
            None
        };

        self.entries.push_back(entry);
        evicted
    }

    /// Appends entries in order, returning how many were evicted.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, entries: I) -> usize {
        entries
            .into_iter()
            .filter_map(|entry| self.push(entry))
            .count()
    }

    /// Iterates entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Iterates the newest `n` entries, oldest first.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    /// Returns the newest entry.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copies the entries into a `Vec`, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
