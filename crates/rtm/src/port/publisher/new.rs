// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher that pushes on a worker thread whenever new data arrives.
//!
//! `update()` checks the worker is still running under the monitor, then
//! raises the `updated` flag. Only the call that raises it wakes the
//! worker; calls that find it already raised return at once, so bursts of
//! updates coalesce into one push. The worker lowers the flag under the
//! monitor and pushes after releasing it.

use super::{Publisher, PushConsumer};
use crate::port::PortStatus;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

struct Shared {
    updated: AtomicBool,
    /// `true` while the worker should keep running.
    running: Mutex<bool>,
    wake: Condvar,
}

pub struct PublisherNew {
    shared: Arc<Shared>,
    worker: Mutex<Option<(JoinHandle<()>, ThreadId)>>,
}

impl PublisherNew {
    pub fn new(consumer: Arc<dyn PushConsumer>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            updated: AtomicBool::new(false),
            running: Mutex::new(true),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rtm-pub-new".to_string())
            .spawn(move || worker_loop(&worker_shared, consumer.as_ref()))?;
        let id = handle.thread().id();
        Ok(Self {
            shared,
            worker: Mutex::new(Some((handle, id))),
        })
    }
}

fn worker_loop(shared: &Shared, consumer: &dyn PushConsumer) {
    loop {
        let last = {
            let mut running = shared.running.lock();
            while *running && !shared.updated.load(Ordering::Acquire) {
                shared.wake.wait(&mut running);
            }
            if !shared.updated.swap(false, Ordering::AcqRel) {
                break;
            }
            !*running
        };
        let status = consumer.push();
        if !status.is_ok() {
            log::debug!("[publisher-new] push returned {}", status);
        }
        if last {
            break;
        }
    }
    log::trace!("[publisher-new] worker exit");
}

impl Publisher for PublisherNew {
    fn update(&self) -> PortStatus {
        let running = self.shared.running.lock();
        if !*running {
            return PortStatus::PreconditionNotMet;
        }
        if self.shared.updated.swap(true, Ordering::AcqRel) {
            return PortStatus::PortOk;
        }
        self.shared.wake.notify_one();
        PortStatus::PortOk
    }

    /// Stops the worker and waits for it to exit, unless called from the
    /// worker itself. A pending update may still be pushed once.
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

impl Drop for PublisherNew {
    fn drop(&mut self) {
        self.release();
    }
}
