//! Criterion benchmarks for the vortex ring
//!
//! Run: cargo bench --bench bench_core

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use vortex::{
    EventPublisher, ProducerKind, RingBuffer, RingConfig, Sequence, WaitStrategyKind,
};

const RING_SIZE: usize = 1024 * 1024;
const BATCH_SIZE: usize = 4096;
const TOTAL_EVENTS: i64 = 1_000_000;

/// Claim/publish cost in isolation: ungated ring, no consumer.
fn publish_only(events: i64) -> i64 {
    let config = RingConfig::new(RING_SIZE)
        .unwrap()
        .with_wait_strategy(WaitStrategyKind::BusySpin)
        .allow_ungated(true);
    let ring = RingBuffer::new(config, || 0i64).unwrap();

    for _ in 0..events {
        let sequence = ring.next().unwrap();
        unsafe {
            *ring.get_mut(sequence) = sequence;
        }
        ring.publish(sequence);
    }
    black_box(ring.cursor())
}

/// Same work through batch claims.
fn publish_batched(events: i64) -> i64 {
    let config = RingConfig::new(RING_SIZE)
        .unwrap()
        .with_wait_strategy(WaitStrategyKind::BusySpin)
        .allow_ungated(true);
    let ring = RingBuffer::new(config, || 0i64).unwrap();

    let mut published = 0i64;
    while published < events {
        let n = (events - published).min(BATCH_SIZE as i64) as usize;
        let batch = ring.next_batch(n).unwrap();
        for sequence in batch.sequences() {
            unsafe {
                *ring.get_mut(sequence) = sequence;
            }
        }
        ring.publish_batch(&batch);
        published += n as i64;
    }
    black_box(ring.cursor())
}

/// Full SPSC pipeline: producer thread feeding a draining consumer.
fn spsc_pipeline(events: i64, producer: ProducerKind) -> i64 {
    let config = RingConfig::new(RING_SIZE)
        .unwrap()
        .with_producer(producer)
        .with_wait_strategy(WaitStrategyKind::BusySpin);
    let ring = Arc::new(RingBuffer::new(config, || 0i64).unwrap());
    let consumed = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumed.clone()]).unwrap();

    let barrier = ring.new_barrier(&[]);
    let ring_consumer = ring.clone();
    let consumer = thread::spawn(move || {
        let mut next = 0i64;
        let mut sum = 0i64;
        while next < events {
            let available = barrier.wait_for(next).unwrap();
            while next <= available {
                sum = sum.wrapping_add(unsafe { *ring_consumer.get(next) });
                next += 1;
            }
            consumed.set(available);
        }
        sum
    });

    let publisher = EventPublisher::new(ring);
    for _ in 0..events {
        publisher
            .publish_event(|event, sequence| *event = sequence)
            .unwrap();
    }

    black_box(consumer.join().unwrap())
}

fn benchmark_claim_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim+publish (ungated)");
    group.throughput(Throughput::Elements(TOTAL_EVENTS as u64));
    group.sample_size(20);

    group.bench_function("per-event", |b| b.iter(|| publish_only(TOTAL_EVENTS)));
    group.bench_function("batch (4096/call)", |b| {
        b.iter(|| publish_batched(TOTAL_EVENTS))
    });

    group.finish();
}

fn benchmark_spsc_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("SPSC pipeline");
    group.throughput(Throughput::Elements(TOTAL_EVENTS as u64));
    group.sample_size(10);

    group.bench_function("single-producer claim", |b| {
        b.iter(|| spsc_pipeline(TOTAL_EVENTS, ProducerKind::Single))
    });
    group.bench_function("multi-producer claim", |b| {
        b.iter(|| spsc_pipeline(TOTAL_EVENTS, ProducerKind::Multi))
    });

    group.finish();
}

criterion_group!(benches, benchmark_claim_publish, benchmark_spsc_pipeline);
criterion_main!(benches);
