// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Port and connector profiles.

use super::PortService;
use crate::broker::{BrokerError, ObjectRef};
use crate::util::nvutil::{self, NVList};
use crate::Properties;
use std::fmt;
use std::sync::Arc;

/// Repository id under which ports are activated.
pub const PORT_REPOSITORY_ID: &str = "IDL:RTC/PortService:1.0";

/// Reference to a (possibly remote) port.
#[derive(Clone)]
pub struct PortRef {
    obj: ObjectRef,
    service: Arc<dyn PortService>,
}

impl PortRef {
    /// `None` if `obj` is not a port.
    pub fn narrow(obj: &ObjectRef) -> Option<Self> {
        obj.narrow::<Arc<dyn PortService>>().map(|service| Self {
            obj: obj.clone(),
            service,
        })
    }

    pub(crate) fn from_parts(obj: ObjectRef, service: Arc<dyn PortService>) -> Self {
        Self { obj, service }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.obj
    }

    pub fn is_alive(&self) -> bool {
        self.obj.is_active()
    }

    /// Port operations; fails once the port has been deactivated.
    pub fn service(&self) -> Result<&Arc<dyn PortService>, BrokerError> {
        self.obj.ensure_active()?;
        Ok(&self.service)
    }
}

impl PartialEq for PortRef {
    fn eq(&self, other: &Self) -> bool {
        self.obj == other.obj
    }
}

impl Eq for PortRef {}

impl fmt::Debug for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortRef({})", self.obj.id())
    }
}

/// One negotiated connection between two or more ports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorProfile {
    pub name: String,
    /// UUID; empty until `connect` assigns one.
    pub connector_id: String,
    pub ports: Vec<PortRef>,
    pub properties: NVList,
}

impl ConnectorProfile {
    pub fn new(name: &str, ports: Vec<PortRef>, properties: &Properties) -> Self {
        Self {
            name: name.to_string(),
            connector_id: String::new(),
            ports,
            properties: nvutil::from_properties(properties),
        }
    }

    /// String value of `key` in the negotiated properties, or `""`.
    pub fn property(&self, key: &str) -> String {
        nvutil::to_string(&self.properties, key)
    }

    /// Negotiated string properties as a tree.
    pub fn to_properties(&self) -> Properties {
        nvutil::to_properties(&self.properties)
    }

    pub fn index_of(&self, port: &PortRef) -> Option<usize> {
        self.ports.iter().position(|p| p == port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortInterfacePolarity {
    Provided,
    Required,
}

/// Service interface offered or required by a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInterfaceProfile {
    pub instance_name: String,
    pub type_name: String,
    pub polarity: PortInterfacePolarity,
}

/// Snapshot of a port's state.
#[derive(Debug, Clone, Default)]
pub struct PortProfile {
    pub name: String,
    pub interfaces: Vec<PortInterfaceProfile>,
    pub port_ref: Option<PortRef>,
    pub connector_profiles: Vec<ConnectorProfile>,
    pub owner: Option<ObjectRef>,
    pub properties: NVList,
}

impl PortProfile {
    pub fn property(&self, key: &str) -> String {
        nvutil::to_string(&self.properties, key)
    }
}
