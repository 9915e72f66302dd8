//! Claims and publishes slots in a ring buffer, single- or multi-producer.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::Result;

use super::availability_buffer::AvailabilityBuffer;
use super::sequence::{min_sequence, Sequence};

/// Claims sequences for publication into a ring buffer and tells consumers which
/// sequences are safe to read.
///
/// A producer calls `next`/`next_n` to reserve one or more slots, writes into the
/// ring buffer at those sequences, then calls `publish`/`publish_range` to make the
/// write visible to consumers. Non-blocking producers use `try_next` instead, which
/// fails with `CapacityFull` rather than waiting for a gating consumer to catch up.
pub trait Sequencer: Send + Sync {
    /// Claim the next sequence, blocking until a slot is free.
    fn next(&self) -> i64 {
        self.next_n(1)
    }

    /// Claim the next `n` sequences, returning the highest of the claimed range.
    fn next_n(&self, n: i64) -> i64;

    /// Claim the next sequence without blocking; fails if the ring buffer is full.
    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    /// Claim the next `n` sequences without blocking.
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Make `sequence` visible to consumers.
    fn publish(&self, sequence: i64);

    /// Make every sequence in `[low, high]` visible to consumers.
    fn publish_range(&self, low: i64, high: i64) {
        for seq in low..=high {
            self.publish(seq);
        }
    }

    /// The highest contiguous sequence known to be published, bounded by
    /// `available_sequence` (the producer will not report past its own claims).
    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64;

    /// The sequencer's own cursor sequence, shared with every barrier built from it.
    fn cursor(&self) -> Arc<Sequence>;

    /// Register a consumer sequence the sequencer must not let producers lap.
    fn add_gating_sequence(&self, sequence: Arc<Sequence>);

    /// Remove a previously registered gating sequence (e.g. when a consumer halts).
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>);

    /// Ring buffer capacity this sequencer was constructed for.
    fn buffer_size(&self) -> usize;
}

fn wait_for_capacity(
    gating_sequences: &RwLock<Vec<Arc<Sequence>>>,
    wrap_point: i64,
    min_cached: &mut i64,
) {
    loop {
        let min_gating = {
            let guard = gating_sequences.read().unwrap();
            min_sequence(&guard)
        };
        if wrap_point <= min_gating {
            *min_cached = min_gating;
            return;
        }
        std::hint::spin_loop();
    }
}

/// Single-producer sequencer: the producer thread owns `cursor` exclusively, so
/// claims simply advance it with no CAS needed.
pub struct SingleProducerSequencer {
    buffer_size: usize,
    cursor: Arc<Sequence>,
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    next_value: std::cell::Cell<i64>,
    cached_gating_sequence: std::cell::Cell<i64>,
}

// SAFETY: `next_value`/`cached_gating_sequence` are only ever touched by the single
// producer thread that owns this sequencer; `Sync` is required to share `Arc`s of it
// with consumer threads, which only read `cursor`/`gating_sequences`.
unsafe impl Sync for SingleProducerSequencer {}

impl SingleProducerSequencer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            cursor: Arc::new(Sequence::initial()),
            gating_sequences: RwLock::new(Vec::new()),
            next_value: std::cell::Cell::new(super::sequence::INITIAL_VALUE),
            cached_gating_sequence: std::cell::Cell::new(super::sequence::INITIAL_VALUE),
        }
    }
}

impl Sequencer for SingleProducerSequencer {
    fn next_n(&self, n: i64) -> i64 {
        let next = self.next_value.get() + n;
        let wrap_point = next - self.buffer_size as i64;
        let cached = self.cached_gating_sequence.get();
        if wrap_point > cached {
            let mut cached_mut = cached;
            wait_for_capacity(&self.gating_sequences, wrap_point, &mut cached_mut);
            self.cached_gating_sequence.set(cached_mut);
        }
        self.next_value.set(next);
        next
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        let next = self.next_value.get() + n;
        let wrap_point = next - self.buffer_size as i64;
        let min_gating = {
            let guard = self.gating_sequences.read().unwrap();
            min_sequence(&guard)
        };
        if wrap_point > min_gating {
            return Err(crate::error::PipelineError::CapacityFull);
        }
        self.cached_gating_sequence.set(min_gating);
        self.next_value.set(next);
        Ok(next)
    }

    fn publish(&self, sequence: i64) {
        self.cursor.set(sequence);
    }

    fn get_highest_published_sequence(&self, _lower_bound: i64, available_sequence: i64) -> i64 {
        // A single producer publishes in order, so the cursor itself is always the
        // highest contiguous sequence.
        available_sequence
    }

    fn cursor(&self) -> Arc<Sequence> {
        self.cursor.clone()
    }

    fn add_gating_sequence(&self, sequence: Arc<Sequence>) {
        self.gating_sequences.write().unwrap().push(sequence);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) {
        self.gating_sequences
            .write()
            .unwrap()
            .retain(|s| !Arc::ptr_eq(s, sequence));
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// Multi-producer sequencer: claims advance a shared atomic cursor with CAS, and
/// publication goes through an [`AvailabilityBuffer`] since producers may finish
/// writing their slots out of order.
pub struct MultiProducerSequencer {
    buffer_size: usize,
    cursor: Arc<Sequence>,
    claimed: AtomicI64,
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    availability: AvailabilityBuffer,
}

impl MultiProducerSequencer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            cursor: Arc::new(Sequence::initial()),
            claimed: AtomicI64::new(super::sequence::INITIAL_VALUE),
            gating_sequences: RwLock::new(Vec::new()),
            availability: AvailabilityBuffer::new(buffer_size),
        }
    }
}

impl Sequencer for MultiProducerSequencer {
    fn next_n(&self, n: i64) -> i64 {
        loop {
            let current = self.claimed.load(Ordering::Relaxed);
            let next = current + n;
            let wrap_point = next - self.buffer_size as i64;
            let min_gating = {
                let guard = self.gating_sequences.read().unwrap();
                min_sequence(&guard)
            };
            if wrap_point > min_gating {
                std::hint::spin_loop();
                continue;
            }
            if self
                .claimed
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return next;
            }
        }
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        loop {
            let current = self.claimed.load(Ordering::Relaxed);
            let next = current + n;
            let wrap_point = next - self.buffer_size as i64;
            let min_gating = {
                let guard = self.gating_sequences.read().unwrap();
                min_sequence(&guard)
            };
            if wrap_point > min_gating {
                return Err(crate::error::PipelineError::CapacityFull);
            }
            if self
                .claimed
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.availability.set(sequence);
        // Advance the shared cursor optimistically so wait strategies reading it
        // directly see progress quickly; the availability buffer remains the source
        // of truth for contiguous readability.
        let mut current = self.cursor.get();
        while current < sequence {
            if self.cursor.compare_and_set(current, sequence) {
                break;
            }
            current = self.cursor.get();
        }
    }

    fn publish_range(&self, low: i64, high: i64) {
        self.availability.set_range(low, high);
        let mut current = self.cursor.get();
        while current < high {
            if self.cursor.compare_and_set(current, high) {
                break;
            }
            current = self.cursor.get();
        }
    }

    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64 {
        self.availability
            .highest_published_sequence(lower_bound, available_sequence)
    }

    fn cursor(&self) -> Arc<Sequence> {
        self.cursor.clone()
    }

    fn add_gating_sequence(&self, sequence: Arc<Sequence>) {
        self.gating_sequences.write().unwrap().push(sequence);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) {
        self.gating_sequences
            .write()
            .unwrap()
            .retain(|s| !Arc::ptr_eq(s, sequence));
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_producer_claims_are_sequential() {
        let seq = SingleProducerSequencer::new(8);
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next_n(3), 4);
    }

    #[test]
    fn test_single_producer_publish_sets_cursor() {
        let seq = SingleProducerSequencer::new(8);
        let claimed = seq.next();
        seq.publish(claimed);
        assert_eq!(seq.cursor().get(), 0);
    }

    #[test]
    fn test_single_producer_try_next_fails_when_full() {
        let seq = SingleProducerSequencer::new(4);
        let consumer = Arc::new(Sequence::initial());
        seq.add_gating_sequence(consumer);
        for _ in 0..4 {
            let claimed = seq.try_next().unwrap();
            seq.publish(claimed);
        }
        assert!(seq.try_next().is_err());
    }

    #[test]
    fn test_multi_producer_claims_are_disjoint() {
        let seq = Arc::new(MultiProducerSequencer::new(1024));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let seq = seq.clone();
            handles.push(std::thread::spawn(move || {
                let mut claims = Vec::new();
                for _ in 0..100 {
                    claims.push(seq.next());
                }
                claims
            }));
        }
        let mut all: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_multi_producer_highest_published_respects_gaps() {
        let seq = MultiProducerSequencer::new(16);
        let a = seq.next();
        let b = seq.next();
        seq.publish(b);
        assert_eq!(seq.get_highest_published_sequence(0, b), -1);
        seq.publish(a);
        assert_eq!(seq.get_highest_published_sequence(0, b), b);
    }
}
