//! Monotonic operation identity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Assigns each operation a strictly increasing id and answers whether a
/// given id is still the current one.
///
/// This is the sole source of truth for staleness: a completion handler
/// checks `is_current` before taking any externally visible action.
/// Comparison is by equality — only the single most recent operation is
/// current, and every earlier one is stale no matter how close in time.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    current: AtomicU64,
}

impl SequenceTracker {
    /// Create a tracker; ids start at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Increment and return the new current id.
    pub fn advance(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `id` is the most recently assigned id.
    pub fn is_current(&self, id: u64) -> bool {
        self.current.load(Ordering::SeqCst) == id
    }

    /// The most recently assigned id; zero before the first operation.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_strictly() {
        let tracker = SequenceTracker::new();
        let first = tracker.advance();
        let second = tracker.advance();
        assert!(second > first);
        assert_eq!(first, 1);
    }

    #[test]
    fn only_the_latest_id_is_current() {
        let tracker = SequenceTracker::new();
        let first = tracker.advance();
        assert!(tracker.is_current(first));

        let second = tracker.advance();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        assert_eq!(tracker.current(), second);
    }
}
