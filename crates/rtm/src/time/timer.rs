// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic listener dispatch on a single worker thread.
//!
//! The timer sleeps one `interval` at a time. Each tick subtracts the
//! interval from every listener's `remains`; listeners whose `remains`
//! drops to zero or below fire and are re-armed with their `period`.
//!
//! Callbacks run on the timer thread with the listener table unlocked, so
//! a callback may register or unregister listeners.

use super::TimeValue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Callback object driven by a [`Timer`].
pub trait TimerListener: Send + Sync {
    fn on_timer(&self);
}

impl<F> TimerListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_timer(&self) {
        self()
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Task {
    id: ListenerId,
    listener: Arc<dyn TimerListener>,
    period: TimeValue,
    remains: TimeValue,
}

struct TimerInner {
    interval: TimeValue,
    tasks: Mutex<Vec<Task>>,
    /// `true` while the worker should keep ticking.
    running: Mutex<bool>,
    wake: Condvar,
    next_id: AtomicU64,
}

impl TimerInner {
    fn tick(&self) {
        let due: Vec<Arc<dyn TimerListener>> = {
            let mut tasks = self.tasks.lock();
            let mut due = Vec::new();
            for task in tasks.iter_mut() {
                task.remains = task.remains - self.interval;
                if task.remains.sign() <= 0 {
                    task.remains = task.period;
                    due.push(Arc::clone(&task.listener));
                }
            }
            due
        };

        for listener in due {
            if !*self.running.lock() {
                break;
            }
            listener.on_timer();
        }
    }
}

/// Single-threaded periodic dispatcher.
pub struct Timer {
    inner: Arc<TimerInner>,
    worker: Mutex<Option<(JoinHandle<()>, ThreadId)>>,
}

impl Timer {
    /// Create a stopped timer ticking every `interval`.
    pub fn new(interval: TimeValue) -> Self {
        let interval = if interval.is_positive() {
            interval
        } else {
            log::warn!("[timer] non-positive tick {}, using 0.1s", interval);
            TimeValue::new(0, 100_000)
        };
        Self {
            inner: Arc::new(TimerInner {
                interval,
                tasks: Mutex::new(Vec::new()),
                running: Mutex::new(false),
                wake: Condvar::new(),
                next_id: AtomicU64::new(1),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> TimeValue {
        self.inner.interval
    }

    /// Launch the worker thread. Returns `false` if already running.
    pub fn start(&self) -> bool {
        let mut worker = self.worker.lock();
        {
            let mut running = self.inner.running.lock();
            if *running {
                return false;
            }
            *running = true;
        }

        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("rtm-timer".to_string())
            .spawn(move || {
                log::debug!("[timer] started, tick {}", inner.interval);
                loop {
                    {
                        let mut running = inner.running.lock();
                        if !*running {
                            break;
                        }
                        let _ = inner
                            .wake
                            .wait_for(&mut running, inner.interval.to_duration());
                        if !*running {
                            break;
                        }
                    }
                    inner.tick();
                }
                log::debug!("[timer] stopped");
            });

        match spawned {
            Ok(handle) => {
                let id = handle.thread().id();
                *worker = Some((handle, id));
                true
            }
            Err(e) => {
                log::error!("[timer] failed to spawn worker: {}", e);
                *self.inner.running.lock() = false;
                false
            }
        }
    }

    /// Stop the worker. When called from outside a timer callback, the
    /// worker has exited and no callback runs after this returns.
    pub fn stop(&self) {
        *self.inner.running.lock() = false;
        self.inner.wake.notify_all();

        let worker = self.worker.lock().take();
        if let Some((handle, id)) = worker {
            if id == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running.lock()
    }

    /// Run a single tick on the calling thread.
    pub fn invoke(&self) {
        let was_running = {
            let mut running = self.inner.running.lock();
            let was = *running;
            *running = true;
            was
        };
        self.inner.tick();
        if !was_running {
            *self.inner.running.lock() = false;
        }
    }

    /// Register `listener` to fire every `period`.
    ///
    /// Registering the same listener object again updates its period and
    /// returns the existing id.
    pub fn register_listener(
        &self,
        listener: Arc<dyn TimerListener>,
        period: TimeValue,
    ) -> ListenerId {
        let mut tasks = self.inner.tasks.lock();
        let key = Arc::as_ptr(&listener) as *const ();
        if let Some(task) = tasks
            .iter_mut()
            .find(|t| Arc::as_ptr(&t.listener) as *const () == key)
        {
            task.period = period;
            task.remains = period;
            return task.id;
        }

        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        tasks.push(Task {
            id,
            listener,
            period,
            remains: period,
        });
        id
    }

    /// Register a closure to fire every `period`.
    pub fn register_fn<F>(&self, period: TimeValue, f: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register_listener(Arc::new(f), period)
    }

    /// Remove a listener. Returns `false` if the id is unknown.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        let mut tasks = self.inner.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        tasks.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_invoke_fires_when_remains_expires() {
        let timer = Timer::new(TimeValue::new(0, 100_000));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        timer.register_fn(TimeValue::new(0, 300_000), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.invoke();
        timer.invoke();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        timer.invoke();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Re-armed with the full period.
        timer.invoke();
        timer.invoke();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        timer.invoke();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_same_listener_updates_period() {
        let timer = Timer::new(TimeValue::new(0, 100_000));
        let listener: Arc<dyn TimerListener> = Arc::new(|| {});
        let first = timer.register_listener(Arc::clone(&listener), TimeValue::new(1, 0));
        let second = timer.register_listener(listener, TimeValue::new(2, 0));
        assert_eq!(first, second);
        assert_eq!(timer.listener_count(), 1);
    }

    #[test]
    fn test_unregister() {
        let timer = Timer::new(TimeValue::new(0, 100_000));
        let id = timer.register_fn(TimeValue::new(1, 0), || {});
        assert!(timer.unregister_listener(id));
        assert!(!timer.unregister_listener(id));
        assert_eq!(timer.listener_count(), 0);
    }

    #[test]
    fn test_no_callbacks_after_stop() {
        let timer = Timer::new(TimeValue::new(0, 5_000));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        timer.register_fn(TimeValue::new(0, 5_000), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(timer.start());
        assert!(!timer.start());
        thread::sleep(Duration::from_millis(60));
        timer.stop();
        let after_stop = hits.load(Ordering::SeqCst);
        assert!(after_stop > 0, "timer should have fired while running");

        thread::sleep(Duration::from_millis(40));
        assert_eq!(hits.load(Ordering::SeqCst), after_stop);
        assert!(!timer.is_running());
    }
}
