//! The consumer side: a run loop that waits for published sequences, hands batches
//! to a handler, and advances its own gating sequence once they're processed.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::{PipelineError, Result};

use super::batch::BatchView;
use super::exception_handler::{ExceptionHandler, LoggingExceptionHandler};
use super::ring_buffer::RingBuffer;
use super::sequence::Sequence;
use super::sequence_barrier::SequenceBarrier;
use super::wait_strategy::TIMEOUT_SEQUENCE;

/// Receives batches of events from an [`EventProcessor`]'s run loop.
///
/// `on_event` is the primitive every handler must implement; the default `on_batch`
/// loops over the delivered batch calling it once per event and isolating failures
/// through `exception_handler` so one bad event doesn't stop the batch or get
/// replayed. Implementations that want zero-copy batch-at-a-time processing (e.g.
/// a vectorized transform) can override `on_batch` directly instead.
pub trait EventHandler<T>: Send {
    /// Process a single event. `end_of_batch` is true for the last event in the
    /// current delivery, useful for handlers that buffer and flush on batch
    /// boundaries (e.g. a journal writer batching fsyncs).
    fn on_event(&mut self, event: &mut T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Process a full batch. The default isolates each event's failure: a failing
    /// `on_event` call is reported to `exception_handler` and processing continues
    /// with the next event in the batch, with the processor's sequence still
    /// advancing past the whole batch.
    fn on_batch(&mut self, batch: &BatchView<T>, exception_handler: &dyn ExceptionHandler<T>) {
        let len = batch.len();
        for i in 0..len {
            let event = batch.get_mut(i);
            let sequence = batch.start_sequence() + i as i64;
            if let Err(e) = self.on_event(event, sequence, i + 1 == len) {
                exception_handler.handle_event_exception(&e, sequence, event);
            }
        }
    }

    /// Called when the processor's wait strategy times out with nothing published,
    /// e.g. to flush buffered state during an idle period. `sequence` is the last
    /// one successfully processed.
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Called once before the run loop starts, on the processor's own thread.
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the run loop exits, before the thread terminates.
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapts a plain closure into an [`EventHandler`], for the common case of a
/// handler with no batch-boundary logic.
pub struct PerEventHandler<F> {
    f: F,
}

impl<F> PerEventHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F> EventHandler<T> for PerEventHandler<F>
where
    F: FnMut(&mut T, i64, bool) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &mut T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.f)(event, sequence, end_of_batch)
    }
}

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_HALTED: u8 = 2;

/// Runs one handler's consume loop against a ring buffer, on its own thread.
///
/// Lifecycle is `Idle -> Running -> Halted -> Idle`: `start` spawns the run-loop
/// thread, `halt` alerts the barrier and joins it, and the processor can be
/// `start`ed again afterward.
pub struct EventProcessor<T, H> {
    ring: Arc<RingBuffer<T>>,
    barrier: Arc<SequenceBarrier>,
    sequence: Arc<Sequence>,
    handler: Arc<Mutex<H>>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    state: Arc<AtomicU8>,
    thread: Mutex<Option<JoinHandle<()>>>,
    _marker: PhantomData<T>,
}

impl<T, H> EventProcessor<T, H>
where
    T: Send + 'static,
    H: EventHandler<T> + 'static,
{
    pub fn new(ring: Arc<RingBuffer<T>>, barrier: Arc<SequenceBarrier>, handler: H) -> Self {
        Self {
            ring,
            barrier,
            sequence: Arc::new(Sequence::initial()),
            handler: Arc::new(Mutex::new(handler)),
            exception_handler: Arc::new(LoggingExceptionHandler),
            state: Arc::new(AtomicU8::new(STATE_IDLE)),
            thread: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler<T>>) -> Self {
        self.exception_handler = handler;
        self
    }

    /// The processor's own progress sequence, suitable as a gating sequence for a
    /// downstream processor or the sequencer.
    pub fn sequence(&self) -> Arc<Sequence> {
        self.sequence.clone()
    }

    /// Spawn the run-loop thread. Fails with `AlreadyRunning` if already running.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        self.state
            .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .or_else(|_| {
                self.state
                    .compare_exchange(STATE_HALTED, STATE_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            })
            .map_err(|_| PipelineError::AlreadyRunning)?;

        self.barrier.clear_alert();
        let this = self.clone_handles();
        let handle = std::thread::spawn(move || this.run());
        *self.thread.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Request shutdown and wait for the run-loop thread to exit.
    pub fn halt(&self) {
        self.barrier.alert();
        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_RUNNING
    }

    fn clone_handles(&self) -> RunHandles<T, H> {
        RunHandles {
            ring: self.ring.clone(),
            barrier: self.barrier.clone(),
            sequence: self.sequence.clone(),
            handler: self.handler.clone(),
            exception_handler: self.exception_handler.clone(),
            state: self.state.clone(),
        }
    }
}

struct RunHandles<T, H> {
    ring: Arc<RingBuffer<T>>,
    barrier: Arc<SequenceBarrier>,
    sequence: Arc<Sequence>,
    handler: Arc<Mutex<H>>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    state: Arc<AtomicU8>,
}

impl<T, H> RunHandles<T, H>
where
    T: Send + 'static,
    H: EventHandler<T> + 'static,
{
    fn run(self) {
        let mut handler = self.handler.lock().unwrap();
        if let Err(e) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(&e);
        }

        loop {
            let next_sequence = self.sequence.get() + 1;
            match self.barrier.wait_for(next_sequence) {
                Ok(available) if available == TIMEOUT_SEQUENCE => {
                    if let Err(e) = handler.on_timeout(self.sequence.get()) {
                        self.exception_handler.handle_on_timeout_exception(&e);
                    }
                }
                Ok(available) => {
                    let highest = self
                        .ring
                        .get_highest_published_sequence(next_sequence, available);
                    if highest < next_sequence {
                        continue;
                    }
                    let batch = BatchView::new(&self.ring, next_sequence, (highest - next_sequence + 1) as usize);
                    handler.on_batch(&batch, self.exception_handler.as_ref());
                    self.sequence.set(highest);
                }
                Err(PipelineError::Alerted) => break,
                Err(_) => break,
            }
        }

        if let Err(e) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(&e);
        }
        self.state.store(STATE_HALTED, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::wait_strategy::BusySpinWaitStrategy;
    use std::sync::atomic::AtomicI64;
    use std::sync::mpsc;

    fn make_ring(size: usize) -> Arc<RingBuffer<i64>> {
        Arc::new(RingBuffer::create_single_producer(|| 0i64, size).unwrap())
    }

    #[test]
    fn test_processor_consumes_published_events() {
        let ring = make_ring(16);
        let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
        let (tx, rx) = mpsc::channel();
        let handler = PerEventHandler::new(move |event: &mut i64, _seq, _eob| {
            tx.send(*event).unwrap();
            Ok(())
        });
        let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
        ring.add_gating_sequences(&[processor.sequence()]);
        processor.start().unwrap();

        for i in 0..5i64 {
            let seq = ring.next();
            unsafe {
                *ring.get_mut(seq) = i;
            }
            ring.publish(seq);
        }

        let mut received = Vec::new();
        for _ in 0..5 {
            received.push(rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap());
        }
        processor.halt();
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let ring = make_ring(8);
        let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
        let handler = PerEventHandler::new(|_: &mut i64, _seq, _eob| Ok(()));
        let processor = Arc::new(EventProcessor::new(ring, barrier, handler));
        processor.start().unwrap();
        assert!(matches!(processor.start(), Err(PipelineError::AlreadyRunning)));
        processor.halt();
    }

    #[test]
    fn test_restart_after_halt() {
        let ring = make_ring(8);
        let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
        let count = Arc::new(AtomicI64::new(0));
        let count2 = count.clone();
        let handler = PerEventHandler::new(move |_: &mut i64, _seq, _eob| {
            count2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
        ring.add_gating_sequences(&[processor.sequence()]);
        processor.start().unwrap();
        let seq = ring.next();
        ring.publish(seq);
        std::thread::sleep(std::time::Duration::from_millis(20));
        processor.halt();
        processor.start().unwrap();
        let seq = ring.next();
        ring.publish(seq);
        std::thread::sleep(std::time::Duration::from_millis(20));
        processor.halt();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_per_event_failure_is_isolated_and_not_replayed() {
        let ring = make_ring(16);
        let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
        let processed = Arc::new(Mutex::new(Vec::new()));
        let processed2 = processed.clone();
        let handler = PerEventHandler::new(move |event: &mut i64, _seq, _eob| {
            processed2.lock().unwrap().push(*event);
            if *event == 2 || *event == 4 {
                return Err(PipelineError::unexpected("boom"));
            }
            Ok(())
        });
        let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
        ring.add_gating_sequences(&[processor.sequence()]);
        processor.start().unwrap();

        for i in 1..=5i64 {
            let seq = ring.next();
            unsafe {
                *ring.get_mut(seq) = i;
            }
            ring.publish(seq);
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
        processor.halt();

        assert_eq!(*processed.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(processor.sequence().get(), 4);
    }
}
