// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher policies against slow and fast consumers.

use rtm::port::publisher::{Publisher, PublisherFlush, PublisherNew, PublisherPeriodic, PushConsumer};
use rtm::port::PortStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn counting_consumer(delay: Duration) -> (Arc<dyn PushConsumer>, Arc<AtomicUsize>) {
    let pushes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pushes);
    let consumer = move || {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        counter.fetch_add(1, Ordering::SeqCst);
        PortStatus::PortOk
    };
    (Arc::new(consumer), pushes)
}

#[test]
fn test_new_coalesces_bursts() {
    let (consumer, pushes) = counting_consumer(Duration::from_millis(100));
    let publisher = PublisherNew::new(consumer).expect("spawn worker");

    let started = Instant::now();
    for _ in 0..10 {
        assert_eq!(publisher.update(), PortStatus::PortOk);
    }
    assert!(started.elapsed() < Duration::from_millis(50), "update must not block");

    thread::sleep(Duration::from_secs(1));
    let count = pushes.load(Ordering::SeqCst);
    assert!((1..=10).contains(&count), "pushes = {}", count);

    publisher.release();
    let after = pushes.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(pushes.load(Ordering::SeqCst), after);
    assert!(after <= 10);
}

#[test]
fn test_flush_pushes_once_per_update() {
    let (consumer, pushes) = counting_consumer(Duration::ZERO);
    let publisher = PublisherFlush::new(consumer);
    for expected in 1..=5 {
        publisher.update();
        assert_eq!(pushes.load(Ordering::SeqCst), expected);
    }
    publisher.release();
}

#[test]
fn test_periodic_rate_within_one_tick() {
    let (consumer, pushes) = counting_consumer(Duration::ZERO);
    let publisher = PublisherPeriodic::new(consumer, 20.0).expect("spawn worker");
    thread::sleep(Duration::from_millis(1000));
    publisher.release();
    let count = pushes.load(Ordering::SeqCst);
    // 20 Hz for 1 s, with one tick of slack and some scheduler jitter.
    assert!((17..=21).contains(&count), "pushes = {}", count);
}
