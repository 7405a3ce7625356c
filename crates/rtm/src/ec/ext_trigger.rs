// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context whose passes are requested from outside.

use super::core::{ExecutionContextCore, Wake};
use super::ExecutionContext;
use crate::rtc::{ExecutionKind, ReturnCode};
use crate::Properties;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// How long the idle worker waits before re-checking its run.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Runs one pass per `tick()`. Ticks issued before the worker picks up
/// the pending one are folded into it. The rate is informational.
pub struct ExtTrigExecutionContext {
    core: Arc<ExecutionContextCore>,
}

impl ExtTrigExecutionContext {
    pub fn new(props: &Properties) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn ExecutionContext> = this.clone();
            Self {
                core: Arc::new(ExecutionContextCore::new(ExecutionKind::Periodic, props, this)),
            }
        })
    }

    /// Request one pass and block until it has run. `Error` on timeout,
    /// `PreconditionNotMet` if the context is stopped before it runs.
    pub fn tick_wait(&self, timeout: Duration) -> ReturnCode {
        self.core.request_pass_and_wait(timeout)
    }
}

impl ExecutionContext for ExtTrigExecutionContext {
    fn core(&self) -> &ExecutionContextCore {
        &self.core
    }

    fn start(&self) -> ReturnCode {
        let core = Arc::clone(&self.core);
        self.core
            .start_worker("rtm-ec-exttrig", move |generation| run(core, generation))
    }

    /// Returns immediately; `PreconditionNotMet` while stopped.
    fn tick(&self) -> ReturnCode {
        self.core.request_pass()
    }
}

impl Drop for ExtTrigExecutionContext {
    fn drop(&mut self) {
        if self.core.is_running() {
            self.core.stop_worker();
        }
    }
}

fn run(core: Arc<ExecutionContextCore>, generation: u64) {
    loop {
        match core.wait_trigger(generation, IDLE_WAIT) {
            Wake::Pass => {
                core.run_pass(generation);
                core.finish_pass();
            }
            Wake::Idle => continue,
            Wake::Stop => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Orb;
    use crate::rtc::{ComponentAction, ExecutionContextHandle, LifeCycleState, RtObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const WAIT: Duration = Duration::from_secs(2);

    struct Scripted {
        executed: Arc<AtomicUsize>,
        fail_execute: bool,
        errors: Arc<AtomicUsize>,
        resets_ok: bool,
    }

    impl ComponentAction for Scripted {
        fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.executed.fetch_add(1, Ordering::SeqCst);
            if self.fail_execute {
                ReturnCode::Error
            } else {
                ReturnCode::Ok
            }
        }

        fn on_error(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.errors.fetch_add(1, Ordering::SeqCst);
            ReturnCode::Ok
        }

        fn on_reset(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            if self.resets_ok {
                ReturnCode::Ok
            } else {
                ReturnCode::Error
            }
        }
    }

    struct Counters {
        executed: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
    }

    fn component(orb: &Arc<Orb>, name: &str, fail_execute: bool, resets_ok: bool) -> (Arc<RtObject>, Counters) {
        let executed = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let action = Scripted {
            executed: Arc::clone(&executed),
            fail_execute,
            errors: Arc::clone(&errors),
            resets_ok,
        };
        let comp = RtObject::with_action(orb, Properties::from_list(&["instance_name", name, ""]), move |_| {
            Box::new(action)
        });
        (comp, Counters { executed, errors })
    }

    #[test]
    fn test_tick_requires_running() {
        let ec = ExtTrigExecutionContext::new(&Properties::new());
        assert_eq!(ec.tick(), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.tick_wait(WAIT), ReturnCode::PreconditionNotMet);
    }

    #[test]
    fn test_each_tick_wait_runs_one_pass() {
        let orb = Arc::new(Orb::new("test"));
        let (comp, counters) = component(&orb, "c0", false, true);
        let ec = ExtTrigExecutionContext::new(&Properties::new());
        ec.add_component(&comp);
        ec.activate_component(&comp);
        ec.start();

        for _ in 0..3 {
            assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
        }
        assert_eq!(counters.executed.load(Ordering::SeqCst), 3);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
        ec.stop();
    }

    #[test]
    fn test_ticks_coalesce() {
        let orb = Arc::new(Orb::new("test"));
        let (comp, counters) = component(&orb, "c0", false, true);
        let ec = ExtTrigExecutionContext::new(&Properties::new());
        ec.add_component(&comp);
        ec.activate_component(&comp);
        ec.start();

        for _ in 0..20 {
            assert_eq!(ec.tick(), ReturnCode::Ok);
        }
        assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
        let executed = counters.executed.load(Ordering::SeqCst);
        assert!((1..=21).contains(&executed), "got {executed}");
        ec.stop();
    }

    #[test]
    fn test_error_isolated_and_reset() {
        let orb = Arc::new(Orb::new("test"));
        let (faulty, faulty_counters) = component(&orb, "d0", true, false);
        let (healthy, healthy_counters) = component(&orb, "e0", false, true);
        let ec = ExtTrigExecutionContext::new(&Properties::new());
        ec.add_component(&faulty);
        ec.add_component(&healthy);
        ec.activate_component(&faulty);
        ec.activate_component(&healthy);
        ec.start();

        assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(&faulty), LifeCycleState::Error);
        assert_eq!(ec.get_component_state(&healthy), LifeCycleState::Active);

        assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
        assert!(ec.is_running());
        assert_eq!(faulty_counters.executed.load(Ordering::SeqCst), 1);
        assert_eq!(faulty_counters.errors.load(Ordering::SeqCst), 1);
        assert_eq!(healthy_counters.executed.load(Ordering::SeqCst), 2);

        assert_eq!(ec.reset_component(&healthy), ReturnCode::BadParameter);
        assert_eq!(ec.activate_component(&faulty), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.reset_component(&faulty), ReturnCode::Error);
        assert_eq!(ec.get_component_state(&faulty), LifeCycleState::Error);
        ec.stop();
    }

    #[test]
    fn test_remove_rejected_while_active() {
        let orb = Arc::new(Orb::new("test"));
        let (comp, _) = component(&orb, "c0", false, true);
        let ec = ExtTrigExecutionContext::new(&Properties::new());
        assert_eq!(ec.add_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.add_component(&comp), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.activate_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.remove_component(&comp), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.deactivate_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.deactivate_component(&comp), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.remove_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.remove_component(&comp), ReturnCode::BadParameter);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Created);
        assert_eq!(ec.activate_component(&comp), ReturnCode::BadParameter);
    }

    struct SelfStopping {
        executed: Arc<AtomicUsize>,
        ec: Arc<parking_lot::Mutex<Option<Arc<dyn ExecutionContext>>>>,
        me: Arc<parking_lot::Mutex<Option<std::sync::Weak<RtObject>>>>,
    }

    impl ComponentAction for SelfStopping {
        fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.executed.fetch_add(1, Ordering::SeqCst);
            let ec = self.ec.lock().clone();
            let me = self.me.lock().as_ref().and_then(|w| w.upgrade());
            if let (Some(ec), Some(me)) = (ec, me) {
                assert_eq!(ec.deactivate_component(&me), ReturnCode::Ok);
            }
            ReturnCode::Ok
        }
    }

    #[test]
    fn test_deactivate_from_own_callback_is_deferred() {
        let orb = Arc::new(Orb::new("test"));
        let executed = Arc::new(AtomicUsize::new(0));
        let ec_slot = Arc::new(parking_lot::Mutex::new(None));
        let me_slot = Arc::new(parking_lot::Mutex::new(None));
        let action = SelfStopping {
            executed: Arc::clone(&executed),
            ec: Arc::clone(&ec_slot),
            me: Arc::clone(&me_slot),
        };
        let comp = RtObject::with_action(&orb, Properties::new(), move |_| Box::new(action));
        let ec = ExtTrigExecutionContext::new(&Properties::new());
        *ec_slot.lock() = Some(Arc::clone(&ec) as Arc<dyn ExecutionContext>);
        *me_slot.lock() = Some(Arc::downgrade(&comp));

        ec.add_component(&comp);
        ec.activate_component(&comp);
        ec.start();
        assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
        assert_eq!(executed.load(Ordering::SeqCst), 1);

        ec.stop();
        *ec_slot.lock() = None;
        thread::yield_now();
    }
}
