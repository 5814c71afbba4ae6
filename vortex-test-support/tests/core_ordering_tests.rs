//! Ordering tests for the vortex ring.
//!
//! These verify the protocol's visibility guarantees under real threads:
//! monotonic in-order delivery, exactly-once per consumer, and wrap safety
//! when producers lap the ring many times over.

use std::sync::Arc;
use std::thread;

use vortex::{
    EventPublisher, ProducerKind, RingBuffer, RingConfig, Sequence, WaitStrategyKind,
};
use vortex_test_support::SequenceChecker;

const EVENTS: i64 = 100_000;

fn busy_spin_ring(capacity: usize, producer: ProducerKind) -> Arc<RingBuffer<i64>> {
    let config = RingConfig::new(capacity)
        .unwrap()
        .with_producer(producer)
        .with_wait_strategy(WaitStrategyKind::BusySpin);
    Arc::new(RingBuffer::new(config, || 0i64).unwrap())
}

/// Drain the ring on a dedicated thread, checking every value equals its
/// sequence, until `events` values have been seen.
fn spawn_checking_consumer(
    ring: Arc<RingBuffer<i64>>,
    consumed: Arc<Sequence>,
    events: i64,
) -> thread::JoinHandle<SequenceChecker> {
    let barrier = ring.new_barrier(&[]);
    thread::spawn(move || {
        let mut checker = SequenceChecker::new();
        let mut next = 0i64;
        while next < events {
            let available = barrier.wait_for(next).unwrap();
            while next <= available {
                // SAFETY: published per the barrier, gated by `consumed`
                let value = unsafe { *ring.get(next) };
                checker.check(value);
                next += 1;
            }
            consumed.set(available);
        }
        checker
    })
}

#[test]
fn test_spsc_in_order_exactly_once() {
    let ring = busy_spin_ring(1024, ProducerKind::Single);
    let consumed = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumed.clone()]).unwrap();

    let consumer = spawn_checking_consumer(ring.clone(), consumed, EVENTS);

    let publisher = EventPublisher::new(ring.clone());
    for _ in 0..EVENTS {
        publisher
            .publish_event(|event, sequence| *event = sequence)
            .unwrap();
    }

    let checker = consumer.join().unwrap();
    assert_eq!(checker.errors(), 0, "delivery broke sequence order");
    assert_eq!(checker.received(), EVENTS as u64);
    assert_eq!(ring.cursor(), EVENTS - 1);
}

#[test]
fn test_multi_producer_delivery_is_gapless() {
    let ring = busy_spin_ring(1024, ProducerKind::Multi);
    let consumed = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumed.clone()]).unwrap();

    let producers = 3;
    let per_producer = EVENTS / producers;
    let total = per_producer * producers;

    let consumer = spawn_checking_consumer(ring.clone(), consumed, total);

    let mut handles = vec![];
    for _ in 0..producers {
        let publisher = EventPublisher::new(ring.clone());
        handles.push(thread::spawn(move || {
            for _ in 0..per_producer {
                publisher
                    .publish_event(|event, sequence| *event = sequence)
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let checker = consumer.join().unwrap();
    assert_eq!(checker.errors(), 0, "a gap or stale slot became visible");
    assert_eq!(checker.received(), total as u64);
    assert_eq!(ring.cursor(), total - 1);
}

#[test]
fn test_wrap_safety_with_tiny_ring() {
    // Capacity far below the event count forces hundreds of wraps; a slot
    // overwritten before its reader got there would surface as a value
    // mismatch.
    let ring = busy_spin_ring(16, ProducerKind::Single);
    let consumed = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumed.clone()]).unwrap();

    let events = 10_000;
    let barrier = ring.new_barrier(&[]);
    let ring_consumer = ring.clone();
    let consumer = thread::spawn(move || {
        let mut checker = SequenceChecker::new();
        let mut next = 0i64;
        while next < events {
            let available = barrier.wait_for(next).unwrap();
            while next <= available {
                let value = unsafe { *ring_consumer.get(next) };
                checker.check(value);
                next += 1;
            }
            if next % 97 == 0 {
                // Lag a little so the producer piles up against the gate
                thread::yield_now();
            }
            consumed.set(available);
        }
        checker
    });

    let publisher = EventPublisher::new(ring.clone());
    for _ in 0..events {
        publisher
            .publish_event(|event, sequence| *event = sequence)
            .unwrap();
    }

    let checker = consumer.join().unwrap();
    assert_eq!(checker.errors(), 0, "wrap protection failed");
    assert_eq!(checker.received(), events as u64);
}

#[test]
fn test_batch_publish_preserves_order() {
    let ring = busy_spin_ring(256, ProducerKind::Single);
    let consumed = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumed.clone()]).unwrap();

    let batches = 500;
    let batch_size = 20;
    let total = (batches * batch_size) as i64;

    let consumer = spawn_checking_consumer(ring.clone(), consumed, total);

    for _ in 0..batches {
        let batch = ring.next_batch(batch_size).unwrap();
        for sequence in batch.sequences() {
            // SAFETY: sequence is part of the unpublished claimed batch
            unsafe {
                *ring.get_mut(sequence) = sequence;
            }
        }
        ring.publish_batch(&batch);
    }

    let checker = consumer.join().unwrap();
    assert_eq!(checker.errors(), 0);
    assert_eq!(checker.received(), total as u64);
    assert_eq!(ring.cursor(), total - 1);
}
