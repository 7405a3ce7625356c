// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution contexts driving component callbacks.

use rtm::broker::Orb;
use rtm::ec::{ExecutionContext, ExtTrigExecutionContext, PeriodicExecutionContext};
use rtm::rtc::ExecutionContextHandle;
use rtm::{ComponentAction, LifeCycleState, Properties, ReturnCode, RtObject};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

struct Counting {
    executed: Arc<AtomicUsize>,
    result: ReturnCode,
}

impl ComponentAction for Counting {
    fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

fn counting(orb: &Arc<Orb>, name: &str, result: ReturnCode) -> (Arc<RtObject>, Arc<AtomicUsize>) {
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executed);
    let comp = RtObject::with_action(orb, Properties::from_list(&["instance_name", name, ""]), move |_| {
        Box::new(Counting {
            executed: counter,
            result,
        })
    });
    (comp, executed)
}

#[test]
fn test_three_ticks_three_executions() {
    let orb = Arc::new(Orb::new("ec-tick"));
    let (comp, executed) = counting(&orb, "C", ReturnCode::Ok);
    let ec = ExtTrigExecutionContext::new(&Properties::new());
    assert_eq!(ec.add_component(&comp), ReturnCode::Ok);
    assert_eq!(ec.start(), ReturnCode::Ok);
    assert_eq!(ec.activate_component(&comp), ReturnCode::Ok);

    for _ in 0..3 {
        assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
    }
    assert_eq!(executed.load(Ordering::SeqCst), 3);
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Active);

    assert_eq!(comp.exit(), ReturnCode::Ok);
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Finalized);
    assert_eq!(ec.stop(), ReturnCode::Ok);
}

#[test]
fn test_failing_component_is_isolated() {
    let orb = Arc::new(Orb::new("ec-isolation"));
    let (bad, _) = counting(&orb, "D", ReturnCode::Error);
    let (good, good_runs) = counting(&orb, "E", ReturnCode::Ok);
    let ec = ExtTrigExecutionContext::new(&Properties::new());
    ec.add_component(&bad);
    ec.add_component(&good);
    ec.start();
    ec.activate_component(&bad);
    ec.activate_component(&good);

    assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
    assert_eq!(ec.get_component_state(&bad), LifeCycleState::Error);
    assert_eq!(ec.get_component_state(&good), LifeCycleState::Active);

    // The worker survives and keeps serving the healthy component.
    assert!(ec.is_running());
    assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
    assert_eq!(good_runs.load(Ordering::SeqCst), 2);

    assert_eq!(ec.reset_component(&good), ReturnCode::BadParameter);
    assert_eq!(ec.reset_component(&bad), ReturnCode::Ok);
    assert_eq!(ec.get_component_state(&bad), LifeCycleState::Inactive);
    ec.stop();
}

#[test]
fn test_panicking_callback_counts_as_error() {
    struct Panics;
    impl ComponentAction for Panics {
        fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
            panic!("sensor unplugged");
        }
    }

    let orb = Arc::new(Orb::new("ec-panic"));
    let comp = RtObject::with_action(&orb, Properties::new(), |_| Box::new(Panics));
    let ec = ExtTrigExecutionContext::new(&Properties::new());
    ec.add_component(&comp);
    ec.start();
    ec.activate_component(&comp);
    assert_eq!(ec.tick_wait(WAIT), ReturnCode::Ok);
    assert_eq!(ec.get_component_state(&comp), LifeCycleState::Error);
    assert!(ec.is_running());
    ec.stop();
}

#[test]
fn test_periodic_context_runs_without_ticks() {
    let orb = Arc::new(Orb::new("ec-periodic"));
    let (comp, executed) = counting(&orb, "P", ReturnCode::Ok);
    let ec = PeriodicExecutionContext::new(&Properties::from_list(&["rate", "200", ""]));
    assert_eq!(ec.get_rate(), 200.0);
    assert_eq!(ec.tick(), ReturnCode::Unsupported);
    ec.add_component(&comp);
    ec.start();
    ec.activate_component(&comp);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(ec.stop(), ReturnCode::Ok);
    let runs = executed.load(Ordering::SeqCst);
    assert!(runs > 5, "expected periodic executions, got {}", runs);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(executed.load(Ordering::SeqCst), runs, "no execution after stop");
    assert_eq!(ec.stop(), ReturnCode::PreconditionNotMet);
    comp.exit();
}
