// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{ExecutionContextHandle, ReturnCode};

/// Business logic of a component.
///
/// Execution contexts call these at the lifecycle edges; every method
/// defaults to `Ok`. Calls for one component never overlap: they run under
/// that component's callback lock. A panic inside a callback is caught and
/// treated as `ReturnCode::Error`.
pub trait ComponentAction: Send {
    /// Once, when the component is first attached to a context.
    fn on_initialize(&mut self) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Once, when the component is finalized.
    fn on_finalize(&mut self) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_startup(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_shutdown(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_activated(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_deactivated(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Entering ERROR.
    fn on_aborting(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Every pass while in ERROR.
    fn on_error(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_reset(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Every pass while ACTIVE.
    fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Every pass while ACTIVE, after a successful `on_execute`.
    fn on_state_update(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_rate_changed(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }
}

/// Component with no behaviour of its own.
pub(crate) struct NoAction;

impl ComponentAction for NoAction {}
