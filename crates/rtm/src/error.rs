// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-level errors (configuration, factories, modules, broker).
//!
//! Lifecycle, connection and data-port operations report through
//! [`ReturnCode`](crate::rtc::ReturnCode) and
//! [`PortStatus`](crate::port::PortStatus) instead.

use crate::broker::BrokerError;
use crate::rtc::ReturnCode;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    /// Explicitly requested configuration file does not exist.
    ConfigFileNotFound(String),
    /// Malformed command line option or configuration value.
    InvalidArgument(String),
    /// I/O error with underlying cause.
    Io(std::io::Error),

    // ========================================================================
    // Components
    // ========================================================================
    /// No factory registered under this type name.
    UnknownFactory(String),
    /// A factory with this type name is already registered.
    FactoryExists(String),
    /// No live component with this instance name.
    ComponentNotFound(String),
    /// A lifecycle operation failed while creating or deleting a component.
    Lifecycle(ReturnCode),

    // ========================================================================
    // Modules
    // ========================================================================
    /// Module is neither registered nor found on the load path.
    ModuleNotFound(String),
    /// Absolute module paths are disabled by configuration.
    ModuleNotAllowed(String),
    /// The module initialization function failed.
    ModuleInitFailed(String),

    // ========================================================================
    // Manager / broker
    // ========================================================================
    /// The manager has been shut down.
    ManagerShutdown,
    Broker(BrokerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::UnknownFactory(name) => write!(f, "No factory for component type: {}", name),
            Error::FactoryExists(name) => write!(f, "Factory already registered: {}", name),
            Error::ComponentNotFound(name) => write!(f, "Component not found: {}", name),
            Error::Lifecycle(rc) => write!(f, "Lifecycle operation failed: {}", rc),
            Error::ModuleNotFound(name) => write!(f, "Module not found: {}", name),
            Error::ModuleNotAllowed(path) => {
                write!(f, "Absolute module path not allowed: {}", path)
            }
            Error::ModuleInitFailed(name) => write!(f, "Module initialization failed: {}", name),
            Error::ManagerShutdown => write!(f, "Manager is shut down"),
            Error::Broker(e) => write!(f, "Broker error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Broker(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        Error::Broker(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_and_source() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.to_string().starts_with("I/O error"));
        assert!(err.source().is_some());

        let err = Error::Lifecycle(ReturnCode::PreconditionNotMet);
        assert_eq!(err.to_string(), "Lifecycle operation failed: PRECONDITION_NOT_MET");
        assert!(err.source().is_none());
    }
}
