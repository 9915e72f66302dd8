//! Strategies an event processor uses while waiting for its next sequence.
//!
//! Each strategy trades latency for CPU usage differently: busy-spin burns a core
//! for the lowest possible latency, blocking parks the thread for the lowest CPU
//! usage, and yielding/sleeping sit between the two.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::constants::{
    DEFAULT_SLEEP_MAX_NANOS, DEFAULT_SLEEP_START_NANOS, DEFAULT_SPIN_TRIES, DEFAULT_YIELD_TRIES,
};
use crate::error::{PipelineError, Result};

use super::dependent_sequence_group::DependentSequenceGroup;
use super::sequence_barrier::SequenceBarrier;

/// Returned by [`TimeoutBlockingWaitStrategy`] in place of a sequence when the
/// configured timeout elapses before one became available.
pub const TIMEOUT_SEQUENCE: i64 = i64::MIN;

/// How an event processor waits for its next sequence to become available.
pub trait WaitStrategy: Send + Sync {
    /// Block until `dependents.value() >= sequence`, checking `barrier.check_alert()`
    /// regularly, and return the highest available sequence (which may exceed the
    /// one asked for, letting the caller consume a larger batch).
    fn wait_for(
        &self,
        sequence: i64,
        dependents: &DependentSequenceGroup,
        barrier: &SequenceBarrier,
    ) -> Result<i64>;

    /// Wake any thread parked in a blocking wait. No-op for non-blocking strategies.
    fn signal_all_when_blocking(&self);
}

/// Spins on the dependent sequence with no backoff at all. Lowest latency, pins a
/// full core per waiting processor.
#[derive(Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        dependents: &DependentSequenceGroup,
        barrier: &SequenceBarrier,
    ) -> Result<i64> {
        loop {
            let available = dependents.value();
            if available >= sequence {
                return Ok(available);
            }
            barrier.check_alert()?;
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Spins for a bounded number of iterations, then yields the CPU to the scheduler
/// each iteration thereafter. Lower CPU cost than busy-spin at some latency cost.
pub struct YieldingWaitStrategy {
    spin_tries: usize,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self {
            spin_tries: DEFAULT_SPIN_TRIES,
        }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        dependents: &DependentSequenceGroup,
        barrier: &SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.spin_tries;
        loop {
            let available = dependents.value();
            if available >= sequence {
                return Ok(available);
            }
            barrier.check_alert()?;
            if counter == 0 {
                std::thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Spins briefly, yields briefly, then sleeps with exponential backoff up to a cap.
/// Gives CPU back under sustained idling while keeping wake latency reasonable.
pub struct SleepingWaitStrategy {
    spin_tries: usize,
    yield_tries: usize,
    start_nanos: u64,
    max_nanos: u64,
}

impl SleepingWaitStrategy {
    pub fn new() -> Self {
        Self {
            spin_tries: DEFAULT_SPIN_TRIES,
            yield_tries: DEFAULT_YIELD_TRIES,
            start_nanos: DEFAULT_SLEEP_START_NANOS,
            max_nanos: DEFAULT_SLEEP_MAX_NANOS,
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        dependents: &DependentSequenceGroup,
        barrier: &SequenceBarrier,
    ) -> Result<i64> {
        let mut spin_counter = self.spin_tries;
        let mut yield_counter = self.yield_tries;
        let mut sleep_nanos = self.start_nanos;
        loop {
            let available = dependents.value();
            if available >= sequence {
                return Ok(available);
            }
            barrier.check_alert()?;
            if spin_counter > 0 {
                spin_counter -= 1;
                std::hint::spin_loop();
            } else if yield_counter > 0 {
                yield_counter -= 1;
                std::thread::yield_now();
            } else {
                std::thread::sleep(Duration::from_nanos(sleep_nanos));
                sleep_nanos = (sleep_nanos * 2).min(self.max_nanos);
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Parks the waiting thread on a condvar, signaled by the producer on publish.
/// Lowest CPU usage, highest wake-up latency.
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condition: Condvar::new(),
        }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        dependents: &DependentSequenceGroup,
        barrier: &SequenceBarrier,
    ) -> Result<i64> {
        loop {
            let available = dependents.value();
            if available >= sequence {
                return Ok(available);
            }
            barrier.check_alert()?;
            let mut guard = self.mutex.lock();
            // Re-check under the lock: the signal may have arrived between our
            // load above and taking the lock.
            let available = dependents.value();
            if available >= sequence {
                return Ok(available);
            }
            self.condition.wait_for(&mut guard, Duration::from_micros(100));
        }
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condition.notify_all();
    }
}

/// Wraps another wait strategy and bounds the total wait, returning
/// [`TIMEOUT_SEQUENCE`] instead of blocking forever when nothing is published.
pub struct TimeoutBlockingWaitStrategy {
    inner: Box<dyn WaitStrategy>,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(inner: Box<dyn WaitStrategy>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        dependents: &DependentSequenceGroup,
        barrier: &SequenceBarrier,
    ) -> Result<i64> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let available = dependents.value();
            if available >= sequence {
                return Ok(available);
            }
            barrier.check_alert()?;
            if Instant::now() >= deadline {
                return Ok(TIMEOUT_SEQUENCE);
            }
            std::thread::yield_now();
        }
    }

    fn signal_all_when_blocking(&self) {
        self.inner.signal_all_when_blocking();
    }
}

/// Whether a wait error is one a caller can reasonably retry after.
pub fn is_retryable(err: &PipelineError) -> bool {
    err.is_recoverable()
}
