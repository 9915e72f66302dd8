//! The cache-line-padded atomic counter every other component builds on.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::constants::WIDE_CACHE_LINE_SIZE;

/// Sentinel value meaning "nothing has been claimed or published yet".
pub const INITIAL_VALUE: i64 = -1;

/// A monotonically increasing 64-bit counter, padded to occupy its own cache line.
///
/// `Sequence` is the universal progress primitive: producers advance a sequencer's
/// cursor, consumers advance their own sequence once a batch has been handled. Two
/// `Sequence`s living on the same cache line would false-share every time either side
/// updates, which on a hot path can cost an order of magnitude in throughput, so the
/// struct is padded to `WIDE_CACHE_LINE_SIZE` on both sides of the atomic.
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
    _pad: [u8; WIDE_CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
}

impl Sequence {
    /// Create a sequence starting at `initial`.
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
            _pad: [0; WIDE_CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>()],
        }
    }

    /// A fresh sequence at [`INITIAL_VALUE`].
    pub fn initial() -> Self {
        Self::new(INITIAL_VALUE)
    }

    /// Acquire-load the current value.
    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Relaxed-load the current value, for hot-path checks that will be re-validated.
    #[inline(always)]
    pub fn get_relaxed(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Release-store a new value.
    #[inline(always)]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Relaxed-store a new value. Only sound when the caller supplies its own fence.
    #[inline(always)]
    pub fn set_relaxed(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Compare-and-set; returns whether the swap succeeded.
    #[inline(always)]
    pub fn compare_and_set(&self, current: i64, new: i64) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically add `delta` and return the value after the add.
    #[inline(always)]
    pub fn get_and_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel) + delta
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::initial()
    }
}

/// The minimum value among a set of gating sequences, or `i64::MAX` if the set is empty.
///
/// Producers use this to find the slowest consumer before claiming a wrapping slot;
/// an empty gating set means nothing yet constrains the producer.
#[inline]
pub fn min_sequence(sequences: &[std::sync::Arc<Sequence>]) -> i64 {
    sequences
        .iter()
        .map(|s| s.get())
        .min()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_initial_value() {
        let seq = Sequence::initial();
        assert_eq!(seq.get(), INITIAL_VALUE);
    }

    #[test]
    fn test_set_and_get() {
        let seq = Sequence::new(0);
        seq.set(42);
        assert_eq!(seq.get(), 42);
    }

    #[test]
    fn test_compare_and_set() {
        let seq = Sequence::new(10);
        assert!(seq.compare_and_set(10, 20));
        assert_eq!(seq.get(), 20);
        assert!(!seq.compare_and_set(10, 30));
        assert_eq!(seq.get(), 20);
    }

    #[test]
    fn test_get_and_add() {
        let seq = Sequence::new(5);
        assert_eq!(seq.get_and_add(3), 8);
        assert_eq!(seq.get(), 8);
    }

    #[test]
    fn test_min_sequence_empty() {
        assert_eq!(min_sequence(&[]), i64::MAX);
    }

    #[test]
    fn test_min_sequence() {
        let seqs = vec![
            Arc::new(Sequence::new(5)),
            Arc::new(Sequence::new(2)),
            Arc::new(Sequence::new(9)),
        ];
        assert_eq!(min_sequence(&seqs), 2);
    }

    #[test]
    fn test_cache_line_padding() {
        assert_eq!(std::mem::align_of::<Sequence>(), 128);
    }
}
