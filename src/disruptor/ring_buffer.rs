//! Preallocated circular buffer of event slots shared between producers and consumers.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::error::{PipelineError, Result};

use super::dependent_sequence_group::DependentSequenceGroup;
use super::sequence::Sequence;
use super::sequence_barrier::SequenceBarrier;
use super::sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
use super::wait_strategy::WaitStrategy;

struct Slot<T>(UnsafeCell<T>);

// SAFETY: access to a slot is only ever made by the producer that claimed its
// sequence, or by a consumer that has observed the sequence published via the
// sequencer (an Acquire load pairs with the producer's Release store), so there is
// never a concurrent read/write on the same slot.
unsafe impl<T: Send> Sync for Slot<T> {}

/// A preallocated, power-of-two-sized ring of event slots.
///
/// Slots are created once by `factory` and mutated in place for every wrap of the
/// ring; nothing is reallocated or replaced at publish time, matching the Disruptor
/// model of "claim an index, mutate the existing value there, publish the index".
pub struct RingBuffer<T> {
    slots: Box<[Slot<T>]>,
    mask: i64,
    sequencer: Arc<dyn Sequencer>,
}

impl<T> RingBuffer<T> {
    fn new(buffer_size: usize, factory: impl Fn() -> T, sequencer: Arc<dyn Sequencer>) -> Result<Self> {
        if !buffer_size.is_power_of_two() {
            return Err(PipelineError::argument_invalid(format!(
                "buffer size {buffer_size} must be a power of two"
            )));
        }
        let mut slots = Vec::with_capacity(buffer_size);
        for _ in 0..buffer_size {
            slots.push(Slot(UnsafeCell::new(factory())));
        }
        Ok(Self {
            slots: slots.into_boxed_slice(),
            mask: (buffer_size - 1) as i64,
            sequencer,
        })
    }

    /// Build a ring buffer with a single-producer sequencer. `factory` is called once
    /// per slot to populate the buffer up front.
    pub fn create_single_producer(
        factory: impl Fn() -> T,
        buffer_size: usize,
    ) -> Result<Self> {
        let sequencer = Arc::new(SingleProducerSequencer::new(buffer_size));
        Self::new(buffer_size, factory, sequencer)
    }

    /// Build a ring buffer with a multi-producer (CAS-claim) sequencer.
    pub fn create_multi_producer(
        factory: impl Fn() -> T,
        buffer_size: usize,
    ) -> Result<Self> {
        let sequencer = Arc::new(MultiProducerSequencer::new(buffer_size));
        Self::new(buffer_size, factory, sequencer)
    }

    #[inline(always)]
    fn index_of(&self, sequence: i64) -> usize {
        (sequence & self.mask) as usize
    }

    /// Claim the next sequence, blocking until a slot is free.
    pub fn next(&self) -> i64 {
        self.sequencer.next()
    }

    /// Claim the next `n` sequences; the returned value is the highest of the range.
    pub fn next_n(&self, n: i64) -> i64 {
        self.sequencer.next_n(n)
    }

    /// Claim the next sequence without blocking.
    pub fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    /// Publish a single claimed sequence, making it visible to consumers.
    pub fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    /// Publish a claimed range `[low, high]` in one step.
    pub fn publish_range(&self, low: i64, high: i64) {
        self.sequencer.publish_range(low, high);
    }

    /// Borrow the slot at `sequence` for writing.
    ///
    /// # Safety
    /// The caller must have claimed `sequence` (via `next`/`try_next`) and not yet
    /// published it, and must not hold another reference to the same slot.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut T {
        &mut *self.slots[self.index_of(sequence)].0.get()
    }

    /// Borrow the slot at `sequence` for reading.
    ///
    /// # Safety
    /// The caller must have observed `sequence` as published (via a sequence
    /// barrier), and must not hold a conflicting mutable reference.
    pub unsafe fn get(&self, sequence: i64) -> &T {
        &*self.slots[self.index_of(sequence)].0.get()
    }

    /// Capacity of the ring, always a power of two.
    pub fn buffer_size(&self) -> usize {
        self.sequencer.buffer_size()
    }

    /// The underlying sequencer, for building additional producers/barriers against
    /// this buffer.
    pub fn sequencer(&self) -> Arc<dyn Sequencer> {
        self.sequencer.clone()
    }

    /// Register a consumer's sequence so producers won't lap it.
    pub fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        for seq in sequences {
            self.sequencer.add_gating_sequence(seq.clone());
        }
    }

    /// Unregister a consumer's sequence, e.g. once it has halted.
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) {
        self.sequencer.remove_gating_sequence(sequence);
    }

    /// Build a barrier that gates on this buffer's cursor directly (for the first
    /// stage of processors) or on a set of upstream processor sequences.
    pub fn new_barrier(
        &self,
        wait_strategy: Arc<dyn WaitStrategy>,
        dependencies: Vec<Arc<Sequence>>,
    ) -> SequenceBarrier {
        let group = DependentSequenceGroup::new(self.sequencer.cursor(), dependencies);
        SequenceBarrier::new(wait_strategy, group)
    }

    /// The highest contiguous published sequence visible from `lower_bound` up to
    /// `available_sequence` (the cursor value a barrier's wait returned).
    pub fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64 {
        self.sequencer
            .get_highest_published_sequence(lower_bound, available_sequence)
    }
}
