//! Ping-pong latency check: two ring buffers, two event processors, one thread
//! bouncing a sequence number between them and timing the round trip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ringpipe::disruptor::{BusySpinWaitStrategy, EventProcessor, PerEventHandler, RingBuffer};

const ITERATIONS: i64 = 1_000_000;

fn main() {
    // ping -> pong
    let forward = Arc::new(RingBuffer::create_single_producer(|| 0i64, 1024).unwrap());
    // pong -> ping
    let backward = Arc::new(RingBuffer::create_single_producer(|| 0i64, 1024).unwrap());

    let done = Arc::new(AtomicBool::new(false));
    let done_in_pong = done.clone();
    let backward_for_pong = backward.clone();

    let pong_barrier = Arc::new(forward.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
    let pong_handler = PerEventHandler::new(move |event: &mut i64, _sequence, _end_of_batch| {
        if *event >= ITERATIONS {
            done_in_pong.store(true, Ordering::Release);
            return Ok(());
        }
        let reply_sequence = backward_for_pong.next();
        unsafe {
            *backward_for_pong.get_mut(reply_sequence) = *event;
        }
        backward_for_pong.publish(reply_sequence);
        Ok(())
    });
    let pong_processor = Arc::new(EventProcessor::new(forward.clone(), pong_barrier, pong_handler));
    forward.add_gating_sequences(&[pong_processor.sequence()]);
    pong_processor.start().unwrap();

    let ping_barrier = Arc::new(backward.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
    let ping_handler = PerEventHandler::new(|_event: &mut i64, _sequence, _end_of_batch| Ok(()));
    let ping_processor = Arc::new(EventProcessor::new(backward.clone(), ping_barrier, ping_handler));
    backward.add_gating_sequences(&[ping_processor.sequence()]);
    ping_processor.start().unwrap();

    let start = Instant::now();
    for i in 0..=ITERATIONS {
        let sequence = forward.next();
        unsafe {
            *forward.get_mut(sequence) = i;
        }
        forward.publish(sequence);

        while backward.sequencer().cursor().get() < sequence {
            std::hint::spin_loop();
        }
    }
    while !done.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_micros(100));
    }
    let elapsed = start.elapsed();
    println!(
        "{ITERATIONS} round trips in {elapsed:?} ({:.1} ns/round-trip)",
        elapsed.as_nanos() as f64 / ITERATIONS as f64
    );

    pong_processor.halt();
    ping_processor.halt();
}
