//! A lock-free ring-buffer event pipeline: sequencer, barrier, and wait-strategy
//! coordination in the LMAX Disruptor style.
//!
//! The core building blocks live under [`disruptor`]: a preallocated [`RingBuffer`]
//! is fed by one or more [`Sequencer`]s (single- or multi-producer), and consumed by
//! [`EventProcessor`]s that wait behind a [`SequenceBarrier`] for contiguous batches
//! of published slots.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ringpipe::disruptor::{EventProcessor, PerEventHandler, RingBuffer, BusySpinWaitStrategy};
//!
//! let ring = Arc::new(RingBuffer::create_single_producer(|| 0i64, 1024).unwrap());
//! let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
//! let handler = PerEventHandler::new(|event: &mut i64, _seq, _end_of_batch| {
//!     println!("got {event}");
//!     Ok(())
//! });
//! let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
//! ring.add_gating_sequences(&[processor.sequence()]);
//! processor.start().unwrap();
//!
//! let seq = ring.next();
//! unsafe { *ring.get_mut(seq) = 42 };
//! ring.publish(seq);
//! # processor.halt();
//! ```

pub mod constants;
pub mod cpu;
pub mod disruptor;
pub mod error;

pub use disruptor::{
    BatchView, BlockingWaitStrategy, BusySpinWaitStrategy, DependentSequenceGroup, EventHandler,
    EventProcessor, ExceptionHandler, LoggingExceptionHandler, MultiProducerSequencer,
    PerEventHandler, RingBuffer, Sequence, SequenceBarrier, Sequencer, SingleProducerSequencer,
    SleepingWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};
pub use error::{PipelineError, Result};
