// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component base: lifecycle codes, actions, the component object and its
//! configuration.

mod action;
mod configuration;
mod object;
mod profile;

pub use action::ComponentAction;
pub use configuration::{ConfigAdmin, ConfigParam};
pub use object::{ComponentCtor, RtObject};
pub use profile::ComponentProfile;

use std::fmt;

/// Result of lifecycle, connection and execution-context operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Ok,
    Error,
    BadParameter,
    Unsupported,
    OutOfResources,
    PreconditionNotMet,
}

impl ReturnCode {
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }

    /// First non-`Ok` code of the two.
    pub fn and(self, other: ReturnCode) -> ReturnCode {
        if self.is_ok() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReturnCode::Ok => "RTC_OK",
            ReturnCode::Error => "RTC_ERROR",
            ReturnCode::BadParameter => "BAD_PARAMETER",
            ReturnCode::Unsupported => "UNSUPPORTED",
            ReturnCode::OutOfResources => "OUT_OF_RESOURCES",
            ReturnCode::PreconditionNotMet => "PRECONDITION_NOT_MET",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-context lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifeCycleState {
    Created,
    Inactive,
    Active,
    Error,
    Finalized,
}

impl fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifeCycleState::Created => "CREATED",
            LifeCycleState::Inactive => "INACTIVE",
            LifeCycleState::Active => "ACTIVE",
            LifeCycleState::Error => "ERROR",
            LifeCycleState::Finalized => "FINALIZED",
        })
    }
}

/// How an execution context is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionKind {
    Periodic,
    EventDriven,
    Other,
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionKind::Periodic => "PERIODIC",
            ExecutionKind::EventDriven => "EVENT_DRIVEN",
            ExecutionKind::Other => "OTHER",
        })
    }
}

/// Index of an execution context within a component's context list.
pub type ExecutionContextHandle = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_and() {
        assert_eq!(ReturnCode::Ok.and(ReturnCode::Ok), ReturnCode::Ok);
        assert_eq!(ReturnCode::Ok.and(ReturnCode::Error), ReturnCode::Error);
        assert_eq!(
            ReturnCode::BadParameter.and(ReturnCode::Error),
            ReturnCode::BadParameter
        );
        assert_eq!(ReturnCode::PreconditionNotMet.to_string(), "PRECONDITION_NOT_MET");
    }
}
