//! Single producer, single consumer: claim a slot, write into it, publish, and
//! let one event processor drain the ring to completion.

use std::sync::Arc;
use std::time::Duration;

use ringpipe::disruptor::{BusySpinWaitStrategy, EventProcessor, PerEventHandler, RingBuffer};

fn main() {
    let ring = Arc::new(RingBuffer::create_single_producer(|| 0i64, 1024).unwrap());
    let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));

    let handler = PerEventHandler::new(|event: &mut i64, sequence, end_of_batch| {
        println!("consumed {event} at sequence {sequence} (end_of_batch={end_of_batch})");
        Ok(())
    });
    let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
    ring.add_gating_sequences(&[processor.sequence()]);
    processor.start().expect("processor should start cleanly");

    for i in 0..10i64 {
        let sequence = ring.next();
        unsafe {
            *ring.get_mut(sequence) = i;
        }
        ring.publish(sequence);
    }

    while processor.sequence().get() < 9 {
        std::thread::sleep(Duration::from_micros(100));
    }
    processor.halt();
}
