//! A ring-buffer event pipeline in the LMAX Disruptor style: a preallocated
//! circular buffer, one or more sequencers claiming and publishing slots, and
//! event processors that consume contiguous batches behind a sequence barrier.
//!
//! ## Module organization
//!
//! - `sequence` - the padded atomic counter everything else is built on
//! - `ring_buffer` - the preallocated slot storage and claim/publish API
//! - `sequencer` - single- and multi-producer claim strategies
//! - `availability_buffer` - per-slot publication tracking for multi-producer use
//! - `dependent_sequence_group` - aggregates the sequences a processor waits behind
//! - `wait_strategy` - busy-spin, yielding, sleeping, blocking, timeout-blocking
//! - `sequence_barrier` - the alertable gate a wait strategy waits through
//! - `batch` - zero-copy view over a contiguous run of published slots
//! - `event_processor` - the consumer run loop and its handler contract
//! - `exception_handler` - error hooks invoked from the run loop
//!
//! ## Safety
//!
//! `RingBuffer::get`/`get_mut` are `unsafe`: callers must only read a sequence
//! after observing it published via a barrier, and only write a sequence after
//! claiming it and before publishing it.

pub mod availability_buffer;
pub mod batch;
pub mod dependent_sequence_group;
pub mod event_processor;
pub mod exception_handler;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod wait_strategy;

pub use batch::BatchView;
pub use dependent_sequence_group::DependentSequenceGroup;
pub use event_processor::{EventHandler, EventProcessor, PerEventHandler};
pub use exception_handler::{ExceptionHandler, LoggingExceptionHandler};
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequence_barrier::SequenceBarrier;
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy,
    WaitStrategy, YieldingWaitStrategy, TIMEOUT_SEQUENCE,
};

use std::sync::Arc;
use std::time::Duration;

use crate::constants::DEFAULT_RING_BUFFER_SIZE;
use crate::error::{PipelineError, Result};

/// Which [`WaitStrategy`] a pipeline should use, as a plain-data config value that
/// can be parsed from configuration rather than requiring a trait object up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategyType {
    /// Busy spin for lowest latency, full core pinned per waiting processor.
    BusySpin,
    /// Spin briefly then yield to the scheduler.
    Yielding,
    /// Spin, yield, then sleep with exponential backoff.
    Sleeping,
    /// Park on a condvar, signaled by the producer on publish.
    Blocking,
}

impl WaitStrategyType {
    /// Build the corresponding [`WaitStrategy`] trait object.
    pub fn build(self) -> Arc<dyn WaitStrategy> {
        match self {
            WaitStrategyType::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            WaitStrategyType::Yielding => Arc::new(YieldingWaitStrategy::new()),
            WaitStrategyType::Sleeping => Arc::new(SleepingWaitStrategy::new()),
            WaitStrategyType::Blocking => Arc::new(BlockingWaitStrategy::new()),
        }
    }

    /// Build the corresponding strategy, bounded by `timeout`.
    pub fn build_with_timeout(self, timeout: Duration) -> Arc<dyn WaitStrategy> {
        let inner: Box<dyn WaitStrategy> = match self {
            WaitStrategyType::BusySpin => Box::new(BusySpinWaitStrategy::new()),
            WaitStrategyType::Yielding => Box::new(YieldingWaitStrategy::new()),
            WaitStrategyType::Sleeping => Box::new(SleepingWaitStrategy::new()),
            WaitStrategyType::Blocking => Box::new(BlockingWaitStrategy::new()),
        };
        Arc::new(TimeoutBlockingWaitStrategy::new(inner, timeout))
    }
}

/// Construction-time configuration for a ring buffer pipeline.
#[derive(Debug, Clone)]
pub struct RingBufferConfig {
    /// Size of the ring buffer (must be power of 2).
    pub size: usize,
    /// Whether the buffer will be fed by more than one producer thread.
    pub multi_producer: bool,
    /// Wait strategy consumers will use.
    pub wait_strategy: WaitStrategyType,
    /// Optional bound on how long a wait strategy blocks before reporting a timeout.
    pub wait_timeout: Option<Duration>,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_RING_BUFFER_SIZE,
            multi_producer: false,
            wait_strategy: WaitStrategyType::BusySpin,
            wait_timeout: None,
        }
    }
}

impl RingBufferConfig {
    /// Create a new configuration with the specified size.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(PipelineError::argument_invalid(
                "ring buffer size must be a non-zero power of 2",
            ));
        }
        Ok(Self {
            size,
            ..Default::default()
        })
    }

    /// Use a multi-producer sequencer.
    pub fn with_multi_producer(mut self, multi_producer: bool) -> Self {
        self.multi_producer = multi_producer;
        self
    }

    /// Set the wait strategy consumers will use.
    pub fn with_wait_strategy(mut self, strategy: WaitStrategyType) -> Self {
        self.wait_strategy = strategy;
        self
    }

    /// Bound how long a wait strategy blocks before reporting a timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Build the wait strategy this configuration describes.
    pub fn build_wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        match self.wait_timeout {
            Some(timeout) => self.wait_strategy.build_with_timeout(timeout),
            None => self.wait_strategy.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_config_creation() {
        let config = RingBufferConfig::new(1024).unwrap();
        assert_eq!(config.size, 1024);
        assert!(!config.multi_producer);
    }

    #[test]
    fn test_ring_buffer_config_invalid_size() {
        assert!(RingBufferConfig::new(0).is_err());
        assert!(RingBufferConfig::new(1023).is_err());
    }

    #[test]
    fn test_ring_buffer_config_builder() {
        let config = RingBufferConfig::new(1024)
            .unwrap()
            .with_multi_producer(true)
            .with_wait_strategy(WaitStrategyType::Blocking);

        assert_eq!(config.size, 1024);
        assert!(config.multi_producer);
        assert!(matches!(config.wait_strategy, WaitStrategyType::Blocking));
    }

    #[test]
    fn test_build_wait_strategy_with_timeout() {
        let config = RingBufferConfig::new(1024)
            .unwrap()
            .with_wait_strategy(WaitStrategyType::BusySpin)
            .with_wait_timeout(Duration::from_millis(10));
        let _strategy = config.build_wait_strategy();
    }
}
