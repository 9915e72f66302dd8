//! A contiguous, zero-copy view over the events delivered to a processor in one pass.

/// A window `[start_sequence, start_sequence + len)` of slots available to read in
/// place from the ring buffer, handed to `EventHandler::on_batch` without copying.
pub struct BatchView<'a, T> {
    ring: &'a super::ring_buffer::RingBuffer<T>,
    start_sequence: i64,
    len: usize,
}

impl<'a, T> BatchView<'a, T> {
    pub(crate) fn new(ring: &'a super::ring_buffer::RingBuffer<T>, start_sequence: i64, len: usize) -> Self {
        Self {
            ring,
            start_sequence,
            len,
        }
    }

    /// Number of events in this batch.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The ring-buffer sequence of the first event in the batch.
    pub fn start_sequence(&self) -> i64 {
        self.start_sequence
    }

    /// Borrow event `index` (0-based within the batch) for reading.
    pub fn get(&self, index: usize) -> &T {
        assert!(index < self.len, "batch index {index} out of range ({})", self.len);
        unsafe { self.ring.get(self.start_sequence + index as i64) }
    }

    /// Borrow event `index` (0-based within the batch) for mutation, e.g. to
    /// transform it in place before a downstream processor reads it.
    pub fn get_mut(&self, index: usize) -> &mut T {
        assert!(index < self.len, "batch index {index} out of range ({})", self.len);
        unsafe { self.ring.get_mut(self.start_sequence + index as i64) }
    }

    /// Iterate over `(sequence, &T)` pairs in the batch.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &T)> {
        (0..self.len).map(move |i| (self.start_sequence + i as i64, self.get(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::ring_buffer::RingBuffer;

    #[test]
    fn test_batch_view_reads_contiguous_slots() {
        let ring = RingBuffer::create_single_producer(|| 0i64, 8).unwrap();
        for i in 0..4i64 {
            let seq = ring.next();
            unsafe {
                *ring.get_mut(seq) = i * 10;
            }
            ring.publish(seq);
        }
        let batch = BatchView::new(&ring, 0, 4);
        assert_eq!(batch.len(), 4);
        assert_eq!(*batch.get(0), 0);
        assert_eq!(*batch.get(3), 30);
    }

    #[test]
    fn test_batch_view_iter() {
        let ring = RingBuffer::create_single_producer(|| 0i64, 8).unwrap();
        for i in 0..3i64 {
            let seq = ring.next();
            unsafe {
                *ring.get_mut(seq) = i;
            }
            ring.publish(seq);
        }
        let batch = BatchView::new(&ring, 0, 3);
        let collected: Vec<(i64, i64)> = batch.iter().map(|(s, v)| (s, *v)).collect();
        assert_eq!(collected, vec![(0, 0), (1, 1), (2, 2)]);
    }
}
