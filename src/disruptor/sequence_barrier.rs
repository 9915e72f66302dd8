//! The gate an event processor waits on before it may read a sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PipelineError, Result};

use super::dependent_sequence_group::DependentSequenceGroup;
use super::wait_strategy::WaitStrategy;

/// Coordinates a single event processor's wait for published sequences, and gives
/// the owning pipeline a way to wake it early via [`alert`](SequenceBarrier::alert)
/// when the pipeline is halting.
pub struct SequenceBarrier {
    wait_strategy: Arc<dyn WaitStrategy>,
    dependents: DependentSequenceGroup,
    alerted: AtomicBool,
}

impl SequenceBarrier {
    pub fn new(wait_strategy: Arc<dyn WaitStrategy>, dependents: DependentSequenceGroup) -> Self {
        Self {
            wait_strategy,
            dependents,
            alerted: AtomicBool::new(false),
        }
    }

    /// Block (per the configured wait strategy) until `sequence` is available, or
    /// until the barrier is alerted.
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;
        self.wait_strategy.wait_for(sequence, &self.dependents, self)
    }

    /// The highest sequence currently known to be safe to consume.
    pub fn cursor(&self) -> i64 {
        self.dependents.value()
    }

    /// Return `Err(PipelineError::Alerted)` if [`alert`](SequenceBarrier::alert) has
    /// been called and not yet cleared. Wait strategies call this every spin/sleep
    /// iteration so a halt request is noticed promptly.
    pub fn check_alert(&self) -> Result<()> {
        if self.alerted.load(Ordering::Acquire) {
            Err(PipelineError::Alerted)
        } else {
            Ok(())
        }
    }

    /// Request that any in-progress or future wait return `Alerted` immediately.
    pub fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Clear a prior alert, e.g. when restarting a processor.
    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::sequence::Sequence;
    use crate::disruptor::wait_strategy::BusySpinWaitStrategy;

    fn make_barrier(cursor_value: i64) -> SequenceBarrier {
        let cursor = Arc::new(Sequence::new(cursor_value));
        let dependents = DependentSequenceGroup::new(cursor, vec![]);
        SequenceBarrier::new(Arc::new(BusySpinWaitStrategy::new()), dependents)
    }

    #[test]
    fn test_wait_for_already_available() {
        let barrier = make_barrier(5);
        assert_eq!(barrier.wait_for(3).unwrap(), 5);
    }

    #[test]
    fn test_alert_interrupts_wait() {
        let barrier = make_barrier(0);
        barrier.alert();
        assert!(matches!(barrier.wait_for(5), Err(PipelineError::Alerted)));
    }

    #[test]
    fn test_clear_alert_resumes_normal_operation() {
        let barrier = make_barrier(5);
        barrier.alert();
        barrier.clear_alert();
        assert_eq!(barrier.wait_for(3).unwrap(), 5);
    }
}
