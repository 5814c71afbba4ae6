//! Average calculator over an SPSC pipeline
//!
//! One producer publishes the numbers 1 to 1,000,000 through the ring; one
//! consumer drains them behind a barrier and averages. Verifies the sum at
//! the end, so a delivery bug shows up as a wrong total.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use vortex::{EventPublisher, RingBuffer, RingConfig, Sequence, WaitStrategyKind};

const RING_SIZE: usize = 64 * 1024;
const MAX_NUMBER: i64 = 1_000_000;

fn main() {
    println!("Task: average the numbers 1 to {}\n", MAX_NUMBER);

    let config = RingConfig::new(RING_SIZE)
        .unwrap()
        .with_wait_strategy(WaitStrategyKind::BusySpin);
    let ring = Arc::new(RingBuffer::new(config, || 0i64).unwrap());

    let consumed = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumed.clone()]).unwrap();

    let barrier = ring.new_barrier(&[]);
    let ring_consumer = ring.clone();
    let start = Instant::now();

    let consumer = thread::spawn(move || {
        let mut sum = 0i64;
        let mut count = 0i64;
        let mut next = 0i64;
        while count < MAX_NUMBER {
            let available = barrier.wait_for(next).unwrap();
            while next <= available {
                // SAFETY: published per the barrier, gated by `consumed`
                sum += unsafe { *ring_consumer.get(next) };
                count += 1;
                next += 1;
            }
            consumed.set(available);
        }
        (sum, count)
    });

    let publisher = EventPublisher::new(ring);
    for number in 1..=MAX_NUMBER {
        publisher
            .publish_event(move |event, _sequence| *event = number)
            .unwrap();
    }

    let (sum, count) = consumer.join().unwrap();
    let duration = start.elapsed();

    let expected_sum = MAX_NUMBER * (MAX_NUMBER + 1) / 2;
    println!("numbers processed: {}", count);
    println!("sum:               {} (expected {})", sum, expected_sum);
    println!("average:           {:.1}", sum as f64 / count as f64);
    println!("time:              {:.3}s", duration.as_secs_f64());
    println!(
        "throughput:        {:.2}M events/sec",
        count as f64 / duration.as_secs_f64() / 1_000_000.0
    );

    assert_eq!(count, MAX_NUMBER, "count mismatch");
    assert_eq!(sum, expected_sum, "sum mismatch");
    println!("\nverification passed");
}
