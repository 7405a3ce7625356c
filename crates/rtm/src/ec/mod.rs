// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution contexts: schedulers that drive components through their
//! lifecycle and call their per-pass callbacks.
//!
//! Per component and context the state is one of CREATED, INACTIVE,
//! ACTIVE, ERROR or FINALIZED:
//!
//! ```text
//! add_component:        CREATED --on_initialize--> INACTIVE   (failure: ERROR)
//! activate_component:   INACTIVE --on_activated--> ACTIVE     (failure: on_aborting, ERROR)
//! deactivate_component: ACTIVE --on_deactivated--> INACTIVE   (failure: on_aborting, ERROR)
//! reset_component:      ERROR --on_reset--> INACTIVE
//! each pass:            ACTIVE: on_execute, on_state_update   (failure: on_aborting, ERROR)
//!                       ERROR:  on_error
//! ```
//!
//! Transitions run synchronously on the caller's thread under the
//! component's callback lock, which the worker also takes for each pass.
//! A component attached to several contexts therefore never runs two
//! callbacks at once.

mod core;
mod ext_trigger;
mod periodic;

pub use self::core::{ExecutionContextCore, DEFAULT_RATE_HZ};
pub use ext_trigger::ExtTrigExecutionContext;
pub use periodic::PeriodicExecutionContext;

use crate::broker::ObjectRef;
use crate::rtc::{ExecutionKind, LifeCycleState, ReturnCode, RtObject};
use crate::Properties;
use std::sync::Arc;

pub const EXECUTION_CONTEXT_REPOSITORY_ID: &str = "IDL:RTC/ExecutionContextService:1.0";

pub const PERIODIC_EC_TYPE: &str = "PeriodicExecutionContext";
pub const EXT_TRIG_EC_TYPE: &str = "ExtTrigExecutionContext";

/// Snapshot of a context's configuration and members.
#[derive(Debug, Clone)]
pub struct ExecutionContextProfile {
    pub kind: ExecutionKind,
    pub rate: f64,
    pub owner: Option<ObjectRef>,
    pub participants: Vec<ObjectRef>,
    pub properties: Properties,
}

/// Operations every execution context offers. Variants supply the worker
/// (`start`) and, for triggered contexts, `tick`.
pub trait ExecutionContext: Send + Sync + 'static {
    fn core(&self) -> &ExecutionContextCore;

    /// Fire `on_startup` on every component and launch the worker.
    /// `PreconditionNotMet` if already running.
    fn start(&self) -> ReturnCode;

    /// Stop the worker, then fire `on_shutdown`. A callback already running
    /// completes first. `PreconditionNotMet` if not running.
    fn stop(&self) -> ReturnCode {
        self.core().stop_worker()
    }

    /// Request one pass; only triggered contexts support it.
    fn tick(&self) -> ReturnCode {
        ReturnCode::Unsupported
    }

    fn id(&self) -> u64 {
        self.core().id()
    }

    fn is_running(&self) -> bool {
        self.core().is_running()
    }

    fn get_kind(&self) -> ExecutionKind {
        self.core().kind()
    }

    fn get_rate(&self) -> f64 {
        self.core().rate()
    }

    fn set_rate(&self, hz: f64) -> ReturnCode {
        self.core().set_rate(hz)
    }

    fn add_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.core().add_component(comp)
    }

    fn remove_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.core().remove_component(comp)
    }

    fn activate_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.core().activate_component(comp)
    }

    fn deactivate_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.core().deactivate_component(comp)
    }

    fn reset_component(&self, comp: &Arc<RtObject>) -> ReturnCode {
        self.core().reset_component(comp)
    }

    fn get_component_state(&self, comp: &Arc<RtObject>) -> LifeCycleState {
        self.core().component_state(comp)
    }

    fn has_component(&self, comp: &Arc<RtObject>) -> bool {
        self.core().has_component(comp)
    }

    fn get_profile(&self) -> ExecutionContextProfile {
        self.core().profile()
    }
}

/// Builds a context from its properties (`rate` in Hz).
pub type ExecutionContextCtor =
    Arc<dyn Fn(&Properties) -> Arc<dyn ExecutionContext> + Send + Sync>;

/// Factories for the built-in context types, keyed by type name.
pub fn builtin_factories() -> Vec<(&'static str, ExecutionContextCtor)> {
    let periodic: ExecutionContextCtor =
        Arc::new(|props: &Properties| PeriodicExecutionContext::new(props) as Arc<dyn ExecutionContext>);
    let ext_trig: ExecutionContextCtor =
        Arc::new(|props: &Properties| ExtTrigExecutionContext::new(props) as Arc<dyn ExecutionContext>);
    vec![(PERIODIC_EC_TYPE, periodic), (EXT_TRIG_EC_TYPE, ext_trig)]
}
