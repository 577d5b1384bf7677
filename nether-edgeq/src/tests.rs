use super::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

// =============================================================
// Layout
// =============================================================

#[test]
fn test_region_layout_matches_contract() {
    assert_eq!(size_of::<SharedRegion>(), 2052);
    assert_eq!(size_of::<SharedRegion<8>>(), 4 + 8 * 4);
}

#[test]
fn test_new_queue_is_zeroed() {
    let queue = EdgeQueue::<16>::new();
    assert_eq!(queue.capacity(), 16);
    assert_eq!(queue.region().head(), 0);
    assert_eq!(queue.region().tail(), 0);
    assert!(queue.region().is_empty());
}

// =============================================================
// Ordering and wraparound
// =============================================================

#[test]
fn test_fifo_order() {
    let (mut producer, mut consumer) = EdgeQueue::<16>::new().split();

    let published: Vec<u32> = (0..15).map(|i| i * 291 + 7).collect();
    for &ts in &published {
        producer.publish(ts);
    }
    assert_eq!(consumer.len(), 15);

    let consumed: Vec<u32> = std::iter::from_fn(|| consumer.try_consume()).collect();
    assert_eq!(consumed, published);
    assert!(consumer.is_empty());
}

#[test]
fn test_empty_consume_returns_none() {
    let (_producer, mut consumer) = EdgeQueue::<8>::new().split();
    assert_eq!(consumer.try_consume(), None);
    assert_eq!(consumer.try_consume(), None);
}

#[test]
fn test_wraparound_interleaved() {
    let (mut producer, mut consumer) = EdgeQueue::<8>::new().split();
    let mut out = Vec::new();

    // Fill to capacity - 1, then one consume per publish
    for ts in 0..7 {
        producer.publish(ts);
    }
    assert!(producer.is_full());

    for ts in 7..=20 {
        out.push(consumer.try_consume().unwrap());
        producer.publish(ts);
    }
    while let Some(ts) = consumer.try_consume() {
        out.push(ts);
    }

    assert_eq!(out, (0..=20).collect::<Vec<u32>>());
    assert_eq!(producer.stalls(), 0);
}

#[test]
fn test_indices_stay_in_range() {
    let (mut producer, mut consumer) = EdgeQueue::<4>::new().split();
    for ts in 0..100u32 {
        producer.publish(ts);
        assert!(consumer.len() <= 3);
        assert_eq!(consumer.capacity(), 4);
        assert_eq!(consumer.try_consume(), Some(ts));
    }
}

#[test]
fn test_full_holds_capacity_minus_one() {
    let (mut producer, _consumer) = EdgeQueue::<8>::new().split();
    for ts in 0..7 {
        assert!(producer.try_publish(ts).is_ok());
    }
    assert!(producer.is_full());
    assert_eq!(producer.len(), 7);
    assert_eq!(producer.try_publish(99), Err(QueueError::Full(99)));
}

#[test]
fn test_try_publish_after_drain() {
    let (mut producer, mut consumer) = EdgeQueue::<4>::new().split();
    for ts in 0..3 {
        producer.try_publish(ts).unwrap();
    }
    assert!(producer.try_publish(3).is_err());
    assert_eq!(consumer.try_consume(), Some(0));
    assert!(producer.try_publish(3).is_ok());
    assert_eq!(consumer.try_consume(), Some(1));
    assert_eq!(consumer.try_consume(), Some(2));
    assert_eq!(consumer.try_consume(), Some(3));
}

#[test]
fn test_timestamps_wrap_through_u32() {
    let (mut producer, mut consumer) = EdgeQueue::<8>::new().split();
    let near_wrap = [u32::MAX - 1, u32::MAX, 0, 1];
    for ts in near_wrap {
        producer.publish(ts);
    }
    for ts in near_wrap {
        assert_eq!(consumer.try_consume(), Some(ts));
    }
}

// =============================================================
// Backpressure
// =============================================================

#[test]
fn test_publish_blocks_until_one_consume() {
    let (mut producer, mut consumer) = EdgeQueue::<8>::new().split();
    for ts in 0..7 {
        producer.publish(ts);
    }

    let published = std::sync::Arc::new(AtomicBool::new(false));
    let flag = published.clone();
    let writer = thread::spawn(move || {
        producer.publish(7);
        flag.store(true, Ordering::SeqCst);
        producer
    });

    thread::sleep(Duration::from_millis(50));
    assert!(
        !published.load(Ordering::SeqCst),
        "publish must wait while the ring is full"
    );

    assert_eq!(consumer.try_consume(), Some(0));
    let producer = writer.join().unwrap();
    assert!(published.load(Ordering::SeqCst));
    assert_eq!(producer.stalls(), 1);
    assert!(producer.is_full());

    let rest: Vec<u32> = std::iter::from_fn(|| consumer.try_consume()).collect();
    assert_eq!(rest, (1..=7).collect::<Vec<u32>>());
}

#[test]
fn test_concurrent_stream_preserves_order() {
    const COUNT: u32 = 50_000;
    let (mut producer, mut consumer) = EdgeQueue::<16>::new().split();

    let writer = thread::spawn(move || {
        for ts in 0..COUNT {
            producer.publish(ts.wrapping_mul(3));
        }
    });

    let mut expected = 0u32;
    while expected < COUNT {
        match consumer.try_consume() {
            Some(ts) => {
                assert_eq!(ts, expected.wrapping_mul(3));
                expected += 1;
            }
            None => std::hint::spin_loop(),
        }
    }

    writer.join().unwrap();
    assert!(consumer.is_empty());
}
