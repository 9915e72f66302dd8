use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use ringpipe::disruptor::{BusySpinWaitStrategy, EventProcessor, PerEventHandler, RingBuffer};

fn bench_single_producer_single_consumer(c: &mut Criterion) {
    c.bench_function("spsc_throughput_1m", |b| {
        b.iter_batched(
            || {
                let ring = Arc::new(RingBuffer::create_single_producer(|| 0i64, 1 << 16).unwrap());
                let barrier = Arc::new(ring.new_barrier(Arc::new(BusySpinWaitStrategy::new()), vec![]));
                let handler = PerEventHandler::new(|event: &mut i64, _seq, _eob| {
                    black_box(*event);
                    Ok(())
                });
                let processor = Arc::new(EventProcessor::new(ring.clone(), barrier, handler));
                ring.add_gating_sequences(&[processor.sequence()]);
                processor.start().unwrap();
                (ring, processor)
            },
            |(ring, processor)| {
                for i in 0..1_000_000i64 {
                    let seq = ring.next();
                    unsafe {
                        *ring.get_mut(seq) = i;
                    }
                    ring.publish(seq);
                }
                while processor.sequence().get() < 999_999 {
                    std::hint::spin_loop();
                }
                processor.halt();
            },
            BatchSize::PerIteration,
        );
    });
}

fn bench_claim_publish_roundtrip(c: &mut Criterion) {
    let ring = RingBuffer::create_single_producer(|| 0i64, 1 << 16).unwrap();
    let consumer = Arc::new(ringpipe::disruptor::Sequence::initial());
    ring.add_gating_sequences(&[consumer.clone()]);

    c.bench_function("claim_publish_single_slot", |b| {
        b.iter(|| {
            let seq = ring.next();
            unsafe {
                *ring.get_mut(seq) = black_box(seq);
            }
            ring.publish(seq);
            consumer.set(seq);
        });
    });
}

criterion_group!(
    benches,
    bench_single_producer_single_consumer,
    bench_claim_publish_roundtrip
);
criterion_main!(benches);
