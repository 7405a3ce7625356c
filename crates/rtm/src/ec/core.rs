// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State table and worker plumbing shared by every execution context.
//!
//! Lock order: component callback lock, then `entries`. `entries` is never
//! held while a callback runs. Each worker run carries a generation number
//! so a worker left over from a stop issued on its own thread exits even
//! if the context is restarted before it notices.

use super::{ExecutionContext, ExecutionContextProfile};
use crate::broker::ObjectRef;
use crate::rtc::{ComponentAction, ExecutionContextHandle, ExecutionKind, LifeCycleState, ReturnCode, RtObject};
use crate::Properties;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

pub const DEFAULT_RATE_HZ: f64 = 1000.0;

static NEXT_EC_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Activate,
    Deactivate,
    Reset,
}

struct Entry {
    comp: Weak<RtObject>,
    handle: ExecutionContextHandle,
    state: LifeCycleState,
}

impl Entry {
    fn is(&self, comp: &Arc<RtObject>) -> bool {
        std::ptr::eq(self.comp.as_ptr(), Arc::as_ptr(comp))
    }
}

#[derive(Default)]
struct RunState {
    running: bool,
    generation: u64,
    requested: bool,
    started: u64,
    completed: u64,
}

/// What a triggered worker should do next.
pub(crate) enum Wake {
    Pass,
    Idle,
    Stop,
}

pub struct ExecutionContextCore {
    id: u64,
    kind: ExecutionKind,
    rate: Mutex<f64>,
    run: Mutex<RunState>,
    wake: Condvar,
    done: Condvar,
    entries: Mutex<Vec<Entry>>,
    deferred: Mutex<VecDeque<(Weak<RtObject>, Transition)>>,
    this: Weak<dyn ExecutionContext>,
    object: RwLock<Option<ObjectRef>>,
    owner: RwLock<Option<ObjectRef>>,
    properties: Properties,
    worker: Mutex<Option<(JoinHandle<()>, ThreadId)>>,
}

impl ExecutionContextCore {
    /// `this` points at the context embedding the core; it is handed to
    /// components when they attach.
    pub(crate) fn new(
        kind: ExecutionKind,
        properties: &Properties,
        this: Weak<dyn ExecutionContext>,
    ) -> Self {
        let requested = properties.get_property("rate");
        let rate = match requested.trim().parse::<f64>() {
            Ok(hz) if hz.is_finite() && hz > 0.0 => hz,
            _ if requested.is_empty() => DEFAULT_RATE_HZ,
            _ => {
                log::warn!("[ec] invalid rate '{}', using {} Hz", requested, DEFAULT_RATE_HZ);
                DEFAULT_RATE_HZ
            }
        };
        Self {
            id: NEXT_EC_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            rate: Mutex::new(rate),
            run: Mutex::new(RunState::default()),
            wake: Condvar::new(),
            done: Condvar::new(),
            entries: Mutex::new(Vec::new()),
            deferred: Mutex::new(VecDeque::new()),
            this,
            object: RwLock::new(None),
            owner: RwLock::new(None),
            properties: properties.clone(),
            worker: Mutex::new(None),
        }
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ExecutionKind {
        self.kind
    }

    pub fn rate(&self) -> f64 {
        *self.rate.lock()
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate())
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn set_object(&self, obj: ObjectRef) {
        *self.object.write() = Some(obj);
    }

    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.object.read().clone()
    }

    pub fn set_owner(&self, owner: ObjectRef) {
        *self.owner.write() = Some(owner);
    }

    pub fn owner(&self) -> Option<ObjectRef> {
        self.owner.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().running
    }

    fn is_current(&self, generation: u64) -> bool {
        let run = self.run.lock();
        run.running && run.generation == generation
    }

    /// `BadParameter` unless `hz` is a positive finite number. Fires
    /// `on_rate_changed` on every ACTIVE component.
    pub fn set_rate(&self, hz: f64) -> ReturnCode {
        if !hz.is_finite() || hz <= 0.0 {
            return ReturnCode::BadParameter;
        }
        *self.rate.lock() = hz;
        for (comp, handle) in self.snapshot() {
            if comp.in_callback() {
                log::debug!("[ec] {}: rate change from its own callback, not notified", comp.instance_name());
                continue;
            }
            let mut action = comp.lock_action();
            if self.state_of(&comp) == Some(LifeCycleState::Active) {
                action.call("on_rate_changed", |a| a.on_rate_changed(handle));
            }
        }
        ReturnCode::Ok
    }

    // ---- component table ----------------------------------------------

    fn snapshot(&self) -> Vec<(Arc<RtObject>, ExecutionContextHandle)> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.comp.upgrade().map(|c| (c, e.handle)))
            .collect()
    }

    fn state_of(&self, comp: &Arc<RtObject>) -> Option<LifeCycleState> {
        self.entries.lock().iter().find(|e| e.is(comp)).map(|e| e.state)
    }

    fn entry_of(&self, comp: &Arc<RtObject>) -> Option<(LifeCycleState, ExecutionContextHandle)> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.is(comp))
            .map(|e| (e.state, e.handle))
    }

    fn set_state(&self, comp: &Arc<RtObject>, state: LifeCycleState) {
        if let Some(entry) = self.entries.lock().iter_mut().find(|e| e.is(comp)) {
            entry.state = state;
        }
    }

    pub fn has_component(&self, comp: &Arc<RtObject>) -> bool {
        self.entries.lock().iter().any(|e| e.is(comp))
    }

    pub fn components(&self) -> Vec<Arc<RtObject>> {
        self.snapshot().into_iter().map(|(c, _)| c).collect()
    }

    /// State of `comp` in this context. Components not attached report
    /// FINALIZED once finalized, CREATED otherwise.
    pub fn component_state(&self, comp: &Arc<RtObject>) -> LifeCycleState {
        match self.state_of(comp) {
            Some(state) => state,
            None if comp.is_finalized() => LifeCycleState::Finalized,
            None => LifeCycleState::Created,
        }
    }

    /// Attach `comp`: CREATED, then `on_initialize` (first attachment
    /// only), then INACTIVE. A failed initialization leaves the component
    /// attached in ERROR and returns `Error`.
    pub fn add_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        if comp.is_finalized() {
            return ReturnCode::BadParameter;
        }
        if self.has_component(comp) {
            return ReturnCode::PreconditionNotMet;
        }
        let Some(this) = self.this.upgrade() else {
            return ReturnCode::Error;
        };
        let handle = match comp.handle_of(self.id) {
            Some(handle) => handle,
            None => comp.attach_context(this),
        };

        let rc = comp.initialize();
        let state = if rc.is_ok() {
            LifeCycleState::Inactive
        } else {
            log::warn!("[ec] {}: initialization failed ({})", comp.instance_name(), rc);
            LifeCycleState::Error
        };

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.is(comp)) {
            return ReturnCode::PreconditionNotMet;
        }
        entries.push(Entry {
            comp: Arc::downgrade(comp),
            handle,
            state,
        });
        log::debug!("[ec] {} attached to ec{} as {}", comp.instance_name(), self.id, state);
        if rc.is_ok() {
            ReturnCode::Ok
        } else {
            ReturnCode::Error
        }
    }

    /// Detach `comp`. `PreconditionNotMet` while it is ACTIVE.
    pub fn remove_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        let _action = if comp.in_callback() {
            None
        } else {
            Some(comp.lock_action())
        };
        {
            let mut entries = self.entries.lock();
            let Some(idx) = entries.iter().position(|e| e.is(comp)) else {
                return ReturnCode::BadParameter;
            };
            if entries[idx].state == LifeCycleState::Active {
                return ReturnCode::PreconditionNotMet;
            }
            entries.remove(idx);
        }
        comp.detach_context(self.id);
        log::debug!("[ec] {} detached from ec{}", comp.instance_name(), self.id);
        ReturnCode::Ok
    }

    pub fn activate_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.transition(comp, Transition::Activate)
    }

    pub fn deactivate_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.transition(comp, Transition::Deactivate)
    }

    /// ERROR -> INACTIVE. `BadParameter` from any other state.
    pub fn reset_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.transition(comp, Transition::Reset)
    }

    /// Transitions requested from inside one of the component's own
    /// callbacks are queued and applied once that callback returns.
    fn transition(&self, comp: &Arc<RtObject>, transition: Transition) -> ReturnCode {
        if !self.has_component(comp) {
            return ReturnCode::BadParameter;
        }
        if comp.in_callback() {
            log::debug!(
                "[ec] {}: {:?} requested from its own callback, deferred",
                comp.instance_name(),
                transition
            );
            self.deferred
                .lock()
                .push_back((Arc::downgrade(comp), transition));
            return ReturnCode::Ok;
        }
        let rc = self.apply(comp, transition);
        self.run_deferred();
        rc
    }

    fn apply(&self, comp: &Arc<RtObject>, transition: Transition) -> ReturnCode {
        let mut action = comp.lock_action();
        let Some((state, handle)) = self.entry_of(comp) else {
            return ReturnCode::BadParameter;
        };

        let (rc, next) = match (transition, state) {
            (Transition::Activate, LifeCycleState::Inactive) => {
                let rc = action.call("on_activated", |a| a.on_activated(handle));
                (rc, LifeCycleState::Active)
            }
            (Transition::Deactivate, LifeCycleState::Active) => {
                let rc = action.call("on_deactivated", |a| a.on_deactivated(handle));
                (rc, LifeCycleState::Inactive)
            }
            (Transition::Reset, LifeCycleState::Error) => {
                let rc = action.call("on_reset", |a| a.on_reset(handle));
                if !rc.is_ok() {
                    log::warn!("[ec] {}: on_reset returned {}, staying in ERROR", comp.instance_name(), rc);
                    return rc;
                }
                (rc, LifeCycleState::Inactive)
            }
            (Transition::Reset, _) => return ReturnCode::BadParameter,
            _ => return ReturnCode::PreconditionNotMet,
        };

        if rc.is_ok() {
            self.set_state(comp, next);
        } else {
            log::warn!("[ec] {}: {:?} failed ({}), entering ERROR", comp.instance_name(), transition, rc);
            action.call("on_aborting", |a| a.on_aborting(handle));
            self.set_state(comp, LifeCycleState::Error);
        }
        rc
    }

    fn run_deferred(&self) {
        loop {
            let next = self.deferred.lock().pop_front();
            let Some((weak, transition)) = next else {
                break;
            };
            let Some(comp) = weak.upgrade() else {
                continue;
            };
            if comp.in_callback() {
                self.deferred.lock().push_front((weak, transition));
                break;
            }
            let rc = self.apply(&comp, transition);
            if !rc.is_ok() {
                log::warn!(
                    "[ec] {}: deferred {:?} returned {}",
                    comp.instance_name(),
                    transition,
                    rc
                );
            }
        }
    }

    // ---- passes -------------------------------------------------------

    /// One pass over the attached components, in attachment order. Stops
    /// early between components if the run is no longer current.
    pub(crate) fn run_pass(&self, generation: u64) {
        for (comp, handle) in self.snapshot() {
            if !self.is_current(generation) {
                break;
            }
            self.tick_component(&comp, handle);
            self.run_deferred();
        }
    }

    fn tick_component(&self, comp: &Arc<RtObject>, handle: ExecutionContextHandle) {
        let mut action = comp.lock_action();
        match self.state_of(comp) {
            Some(LifeCycleState::Active) => {
                let mut rc = action.call("on_execute", |a| a.on_execute(handle));
                if rc.is_ok() {
                    rc = action.call("on_state_update", |a| a.on_state_update(handle));
                }
                if !rc.is_ok() {
                    log::warn!("[ec] {}: pass returned {}, entering ERROR", comp.instance_name(), rc);
                    action.call("on_aborting", |a| a.on_aborting(handle));
                    self.set_state(comp, LifeCycleState::Error);
                }
            }
            Some(LifeCycleState::Error) => {
                action.call("on_error", |a| a.on_error(handle));
            }
            _ => {}
        }
    }

    fn notify_components(
        &self,
        callback: &str,
        f: fn(&mut dyn ComponentAction, ExecutionContextHandle) -> ReturnCode,
    ) {
        for (comp, handle) in self.snapshot() {
            if comp.in_callback() {
                log::debug!("[ec] {}: {} skipped, issued from its own callback", comp.instance_name(), callback);
                continue;
            }
            let mut action = comp.lock_action();
            let rc = action.call(callback, |a| f(a, handle));
            if !rc.is_ok() {
                log::warn!("[ec] {}: {} returned {}", comp.instance_name(), callback, rc);
            }
        }
    }

    // ---- worker -------------------------------------------------------

    /// Mark running, fire `on_startup`, then spawn `body(generation)`.
    pub(crate) fn start_worker<F>(&self, thread_name: &str, body: F) -> ReturnCode
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let generation = {
            let mut run = self.run.lock();
            if run.running {
                return ReturnCode::PreconditionNotMet;
            }
            run.running = true;
            run.requested = false;
            run.generation += 1;
            run.generation
        };
        self.notify_components("on_startup", |a, h| a.on_startup(h));

        let mut worker = self.worker.lock();
        if let Some((stale, id)) = worker.take() {
            if id != thread::current().id() {
                let _ = stale.join();
            }
        }
        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || body(generation));
        match spawned {
            Ok(handle) => {
                let id = handle.thread().id();
                *worker = Some((handle, id));
                log::debug!("[ec] ec{} started at {} Hz", self.id, self.rate());
                ReturnCode::Ok
            }
            Err(e) => {
                log::error!("[ec] ec{}: failed to spawn worker: {}", self.id, e);
                self.run.lock().running = false;
                ReturnCode::OutOfResources
            }
        }
    }

    /// Clear running, wait for the worker (unless called on it), then
    /// fire `on_shutdown`.
    pub(crate) fn stop_worker(&self) -> ReturnCode {
        {
            let mut run = self.run.lock();
            if !run.running {
                return ReturnCode::PreconditionNotMet;
            }
            run.running = false;
        }
        self.wake.notify_all();
        self.done.notify_all();

        let worker = self.worker.lock().take();
        if let Some((handle, id)) = worker {
            if id != thread::current().id() {
                let _ = handle.join();
            }
        }
        self.notify_components("on_shutdown", |a, h| a.on_shutdown(h));
        log::debug!("[ec] ec{} stopped", self.id);
        ReturnCode::Ok
    }

    /// Sleep until `deadline`. `false` once the run is over.
    pub(crate) fn sleep_until(&self, generation: u64, deadline: Instant) -> bool {
        let mut run = self.run.lock();
        while run.running && run.generation == generation {
            if self.wake.wait_until(&mut run, deadline).timed_out() {
                break;
            }
        }
        run.running && run.generation == generation
    }

    /// Wait up to `idle` for a requested pass.
    pub(crate) fn wait_trigger(&self, generation: u64, idle: Duration) -> Wake {
        let mut run = self.run.lock();
        let deadline = Instant::now() + idle;
        loop {
            if !(run.running && run.generation == generation) {
                return Wake::Stop;
            }
            if run.requested {
                run.requested = false;
                run.started += 1;
                return Wake::Pass;
            }
            if self.wake.wait_until(&mut run, deadline).timed_out() {
                return Wake::Idle;
            }
        }
    }

    pub(crate) fn finish_pass(&self) {
        self.run.lock().completed += 1;
        self.done.notify_all();
    }

    /// Request one pass. Requests made before the worker picks up the
    /// previous one coalesce into it.
    pub(crate) fn request_pass(&self) -> ReturnCode {
        let mut run = self.run.lock();
        if !run.running {
            return ReturnCode::PreconditionNotMet;
        }
        run.requested = true;
        self.wake.notify_all();
        ReturnCode::Ok
    }

    /// Request one pass and wait until it has completed.
    pub(crate) fn request_pass_and_wait(&self, timeout: Duration) -> ReturnCode {
        let deadline = Instant::now() + timeout;
        let mut run = self.run.lock();
        if !run.running {
            return ReturnCode::PreconditionNotMet;
        }
        run.requested = true;
        let target = run.started + 1;
        self.wake.notify_all();
        while run.completed < target {
            if !run.running {
                return ReturnCode::PreconditionNotMet;
            }
            if self.done.wait_until(&mut run, deadline).timed_out() && run.completed < target {
                return ReturnCode::Error;
            }
        }
        ReturnCode::Ok
    }

    pub fn profile(&self) -> ExecutionContextProfile {
        ExecutionContextProfile {
            kind: self.kind,
            rate: self.rate(),
            owner: self.owner(),
            participants: self
                .components()
                .iter()
                .filter_map(|c| c.object_ref())
                .collect(),
            properties: self.properties.clone(),
        }
    }
}
