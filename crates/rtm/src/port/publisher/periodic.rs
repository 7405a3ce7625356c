// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher that pushes at a fixed rate regardless of updates.
//!
//! Deadlines advance by whole periods; when a push overruns, the schedule
//! restarts from now instead of bursting to catch up.

use super::{Publisher, PushConsumer};
use crate::port::PortStatus;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Rate used when none (or zero) is configured.
pub const DEFAULT_RATE_HZ: f64 = 1000.0;

struct Shared {
    running: Mutex<bool>,
    wake: Condvar,
}

pub struct PublisherPeriodic {
    shared: Arc<Shared>,
    interval: Duration,
    worker: Mutex<Option<(JoinHandle<()>, ThreadId)>>,
}

impl PublisherPeriodic {
    /// Push every `1e6 / hz` microseconds.
    pub fn new(consumer: Arc<dyn PushConsumer>, hz: f64) -> std::io::Result<Self> {
        let hz = if hz > 0.0 && hz.is_finite() {
            hz
        } else {
            log::warn!(
                "[publisher-periodic] invalid push rate {}, using {} Hz",
                hz,
                DEFAULT_RATE_HZ
            );
            DEFAULT_RATE_HZ
        };
        let interval = Duration::from_micros((1e6 / hz) as u64);
        let shared = Arc::new(Shared {
            running: Mutex::new(true),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rtm-pub-periodic".to_string())
            .spawn(move || worker_loop(&worker_shared, consumer.as_ref(), interval))?;
        let id = handle.thread().id();
        Ok(Self {
            shared,
            interval,
            worker: Mutex::new(Some((handle, id))),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn worker_loop(shared: &Shared, consumer: &dyn PushConsumer, interval: Duration) {
    let mut next = Instant::now() + interval;
    loop {
        {
            let mut running = shared.running.lock();
            while *running {
                if shared.wake.wait_until(&mut running, next).timed_out() {
                    break;
                }
            }
            if !*running {
                break;
            }
        }
        let status = consumer.push();
        if !status.is_ok() {
            log::trace!("[publisher-periodic] push returned {}", status);
        }
        next += interval;
        let now = Instant::now();
        if next < now {
            next = now + interval;
        }
    }
    log::trace!("[publisher-periodic] worker exit");
}

impl Publisher for PublisherPeriodic {
    fn update(&self) -> PortStatus {
        PortStatus::PortOk
    }

    fn release(&self) {
        *self.shared.running.lock() = false;
        self.shared.wake.notify_all();

        let worker = self.worker.lock().take();
        if let Some((handle, id)) = worker {
            if id != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for PublisherPeriodic {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_rate_uses_default() {
        let publisher = PublisherPeriodic::new(Arc::new(|| PortStatus::PortOk), 0.0).expect("spawn");
        assert_eq!(publisher.interval(), Duration::from_micros(1000));
        publisher.release();
    }

    #[test]
    fn test_pushes_without_updates() {
        let pushes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pushes);
        let publisher = PublisherPeriodic::new(
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                PortStatus::BufferEmpty
            }),
            100.0,
        )
        .expect("spawn");
        thread::sleep(Duration::from_millis(100));
        publisher.release();
        let after = pushes.load(Ordering::SeqCst);
        assert!(after >= 3, "pushes = {}", after);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(pushes.load(Ordering::SeqCst), after);
    }
}
