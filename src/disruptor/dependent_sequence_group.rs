//! Aggregates the sequences an event processor must wait behind.

use std::sync::Arc;

use super::sequence::{min_sequence, Sequence};

/// The set of upstream sequences a consumer is gated on.
///
/// A processor with no upstream dependencies is gated directly on the sequencer's
/// cursor; a downstream processor is gated on the sequences of everything it must
/// read after. `value()` is always the minimum across the whole group, so a
/// consumer never reads past the slowest dependency.
pub struct DependentSequenceGroup {
    cursor: Arc<Sequence>,
    dependents: Vec<Arc<Sequence>>,
}

impl DependentSequenceGroup {
    /// `cursor` is the sequencer's published-sequence cursor. `dependents` are the
    /// sequences of any upstream processors this group must additionally wait behind;
    /// empty means "gated on the cursor alone".
    pub fn new(cursor: Arc<Sequence>, dependents: Vec<Arc<Sequence>>) -> Self {
        Self { cursor, dependents }
    }

    /// The highest sequence known to be safe to consume.
    #[inline]
    pub fn value(&self) -> i64 {
        if self.dependents.is_empty() {
            self.cursor.get()
        } else {
            min_sequence(&self.dependents)
        }
    }

    /// Whether this group has any upstream dependents, or is gated on the cursor alone.
    pub fn is_direct(&self) -> bool {
        self.dependents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_gating_tracks_cursor() {
        let cursor = Arc::new(Sequence::new(5));
        let group = DependentSequenceGroup::new(cursor.clone(), vec![]);
        assert!(group.is_direct());
        assert_eq!(group.value(), 5);
        cursor.set(10);
        assert_eq!(group.value(), 10);
    }

    #[test]
    fn test_dependent_gating_takes_minimum() {
        let cursor = Arc::new(Sequence::new(100));
        let a = Arc::new(Sequence::new(7));
        let b = Arc::new(Sequence::new(3));
        let group = DependentSequenceGroup::new(cursor, vec![a, b]);
        assert!(!group.is_direct());
        assert_eq!(group.value(), 3);
    }
}
