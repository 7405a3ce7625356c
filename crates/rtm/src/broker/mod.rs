// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process object broker.
//!
//! The runtime talks to peers through a remote-object system: references
//! that can be stringified and restored, a servant-activation pool, and a
//! hierarchical name service. This module provides an in-process
//! implementation of that contract so components in one process can be
//! wired together and so the rest of the crate never depends on a concrete
//! wire broker.
//!
//! ```text
//! Orb
//! +-- Poa          (ObjectId -> ObjectRef, DashMap)
//! +-- name services (address -> Arc<dyn NamingService>)
//! ```

mod naming;
mod object;
mod orb;
mod poa;

pub use naming::{
    format_name, parse_name, Binding, BindingType, InMemoryNamingService, NameComponent,
    NamingService,
};
pub use object::{ObjectId, ObjectRef};
pub use orb::Orb;
pub use poa::Poa;

use std::fmt;

/// Failures raised by broker calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The target servant has been deactivated.
    ObjectNotExist(String),
    /// The peer could not be reached right now.
    Transient(String),
    /// Name or object id not found.
    NotFound(String),
    /// A binding already exists under that name.
    AlreadyBound(String),
    /// Malformed name or stringified reference.
    InvalidName(String),
    /// The name service is down.
    Unavailable,
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::ObjectNotExist(id) => write!(f, "object does not exist: {}", id),
            BrokerError::Transient(msg) => write!(f, "transient failure: {}", msg),
            BrokerError::NotFound(name) => write!(f, "not found: {}", name),
            BrokerError::AlreadyBound(name) => write!(f, "already bound: {}", name),
            BrokerError::InvalidName(name) => write!(f, "invalid name: {}", name),
            BrokerError::Unavailable => write!(f, "name service unavailable"),
        }
    }
}

impl std::error::Error for BrokerError {}
