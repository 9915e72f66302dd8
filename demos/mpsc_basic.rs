//! Four producer threads claiming from a shared multi-producer sequencer,
//! one consumer draining the merged stream in published order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ringpipe::disruptor::{BusySpinWaitStrategy, EventProcessor, PerEventHandler, RingBuffer};

const PRODUCERS: usize = 4;
const EVENTS_PER_PRODUCER: i64 = 1000;

fn main() {
    let ring = Arc::new(RingBuffer::create_multi_producer(|| 0i64, 1 << 16).unwrap());
    let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));

    let received = Arc::new(AtomicUsize::new(0));
    let received_in_handler = received.clone();
    let handler = PerEventHandler::new(move |_event: &mut i64, _sequence, _end_of_batch| {
        received_in_handler.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
    ring.add_gating_sequences(&[processor.sequence()]);
    processor.start().expect("processor should start cleanly");

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer_id| {
            let ring = ring.clone();
            std::thread::spawn(move || {
                for i in 0..EVENTS_PER_PRODUCER {
                    let sequence = ring.next();
                    unsafe {
                        *ring.get_mut(sequence) = producer_id as i64 * EVENTS_PER_PRODUCER + i;
                    }
                    ring.publish(sequence);
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let total = (PRODUCERS as i64 * EVENTS_PER_PRODUCER) as usize;
    while received.load(Ordering::SeqCst) < total {
        std::thread::sleep(Duration::from_micros(100));
    }
    println!("consumed {total} events from {PRODUCERS} producers");
    processor.halt();
}
