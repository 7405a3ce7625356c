// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context driven by its own thread at a fixed rate.

use super::core::ExecutionContextCore;
use super::ExecutionContext;
use crate::rtc::{ExecutionKind, ReturnCode};
use crate::Properties;
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Runs a pass every `1 / rate` seconds. The time spent in a pass is
/// subtracted from the following sleep; passes that overrun are not made
/// up.
pub struct PeriodicExecutionContext {
    core: Arc<ExecutionContextCore>,
}

impl PeriodicExecutionContext {
    pub fn new(props: &Properties) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn ExecutionContext> = this.clone();
            Self {
                core: Arc::new(ExecutionContextCore::new(ExecutionKind::Periodic, props, this)),
            }
        })
    }
}

impl ExecutionContext for PeriodicExecutionContext {
    fn core(&self) -> &ExecutionContextCore {
        &self.core
    }

    fn start(&self) -> ReturnCode {
        let core = Arc::clone(&self.core);
        self.core
            .start_worker("rtm-ec-periodic", move |generation| run(core, generation))
    }
}

impl Drop for PeriodicExecutionContext {
    fn drop(&mut self) {
        if self.core.is_running() {
            self.core.stop_worker();
        }
    }
}

fn run(core: Arc<ExecutionContextCore>, generation: u64) {
    loop {
        let started = Instant::now();
        core.run_pass(generation);
        if !core.sleep_until(generation, started + core.period()) {
            break;
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
    use std::time::Duration;

    #[derive(Default)]
    struct Probe {
        executed: Arc<AtomicUsize>,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
        rate_changes: Arc<AtomicUsize>,
    }

    struct ProbeAction(Arc<Probe>);

    impl ComponentAction for ProbeAction {
        fn on_startup(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.0.started.fetch_add(1, Ordering::SeqCst);
            ReturnCode::Ok
        }

        fn on_shutdown(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.0.stopped.fetch_add(1, Ordering::SeqCst);
            ReturnCode::Ok
        }

        fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.0.executed.fetch_add(1, Ordering::SeqCst);
            ReturnCode::Ok
        }

        fn on_rate_changed(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            self.0.rate_changes.fetch_add(1, Ordering::SeqCst);
            ReturnCode::Ok
        }
    }

    fn component(orb: &Arc<Orb>, probe: &Arc<Probe>) -> Arc<RtObject> {
        let probe = Arc::clone(probe);
        RtObject::with_action(orb, Properties::from_list(&["instance_name", "probe0", ""]), move |_| {
            Box::new(ProbeAction(probe))
        })
    }

    #[test]
    fn test_runs_active_components_periodically() {
        let orb = Arc::new(Orb::new("test"));
        let probe = Arc::new(Probe::default());
        let comp = component(&orb, &probe);
        let ec = PeriodicExecutionContext::new(&Properties::from_list(&["rate", "200", ""]));

        assert_eq!(ec.add_component(&comp), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        assert_eq!(ec.start(), ReturnCode::Ok);
        assert_eq!(ec.start(), ReturnCode::PreconditionNotMet);
        assert_eq!(probe.started.load(Ordering::SeqCst), 1);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(probe.executed.load(Ordering::SeqCst), 0, "inactive components are not executed");

        assert_eq!(ec.activate_component(&comp), ReturnCode::Ok);
        thread::sleep(Duration::from_millis(200));
        assert_eq!(ec.stop(), ReturnCode::Ok);
        let executed = probe.executed.load(Ordering::SeqCst);
        assert!(executed >= 5, "expected periodic passes, got {executed}");
        assert_eq!(probe.stopped.load(Ordering::SeqCst), 1);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(probe.executed.load(Ordering::SeqCst), executed, "no pass after stop");
        assert_eq!(ec.stop(), ReturnCode::PreconditionNotMet);
    }

    #[test]
    fn test_restart_keeps_components() {
        let orb = Arc::new(Orb::new("test"));
        let probe = Arc::new(Probe::default());
        let comp = component(&orb, &probe);
        let ec = PeriodicExecutionContext::new(&Properties::from_list(&["rate", "500", ""]));
        ec.add_component(&comp);
        ec.activate_component(&comp);

        assert_eq!(ec.start(), ReturnCode::Ok);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ec.stop(), ReturnCode::Ok);
        let first = probe.executed.load(Ordering::SeqCst);

        assert_eq!(ec.start(), ReturnCode::Ok);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ec.stop(), ReturnCode::Ok);
        assert!(probe.executed.load(Ordering::SeqCst) > first);
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);
    }

    #[test]
    fn test_set_rate() {
        let orb = Arc::new(Orb::new("test"));
        let probe = Arc::new(Probe::default());
        let comp = component(&orb, &probe);
        let ec = PeriodicExecutionContext::new(&Properties::new());
        assert_eq!(ec.get_rate(), crate::ec::DEFAULT_RATE_HZ);
        ec.add_component(&comp);

        assert_eq!(ec.set_rate(0.0), ReturnCode::BadParameter);
        assert_eq!(ec.set_rate(-3.0), ReturnCode::BadParameter);
        assert_eq!(ec.set_rate(20.0), ReturnCode::Ok);
        assert_eq!(probe.rate_changes.load(Ordering::SeqCst), 0, "only ACTIVE components are told");

        ec.activate_component(&comp);
        assert_eq!(ec.set_rate(40.0), ReturnCode::Ok);
        assert_eq!(probe.rate_changes.load(Ordering::SeqCst), 1);
        assert_eq!(ec.get_rate(), 40.0);
    }

    #[test]
    fn test_exit_detaches_and_finalizes() {
        let orb = Arc::new(Orb::new("test"));
        let probe = Arc::new(Probe::default());
        let comp = component(&orb, &probe);
        let ec = PeriodicExecutionContext::new(&Properties::from_list(&["rate", "500", ""]));
        ec.add_component(&comp);
        ec.activate_component(&comp);
        assert_eq!(ec.start(), ReturnCode::Ok);
        thread::sleep(Duration::from_millis(20));

        assert_eq!(comp.finalize(), ReturnCode::PreconditionNotMet);
        assert_eq!(comp.exit(), ReturnCode::Ok);
        assert!(!ec.has_component(&comp));
        assert!(comp.get_participating_contexts().is_empty());
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Finalized);

        let after = probe.executed.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(probe.executed.load(Ordering::SeqCst), after);
        assert_eq!(ec.stop(), ReturnCode::Ok);
    }
}
