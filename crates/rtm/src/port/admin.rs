// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of the ports owned by one component.

use super::{PortOps, PortProfile, PortRef, PortService};
use crate::rtc::ReturnCode;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Default)]
pub struct PortAdmin {
    ports: RwLock<Vec<Arc<dyn PortOps>>>,
}

impl PortAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// `PreconditionNotMet` if a port with the same name is registered.
    pub fn add_port(&self, port: Arc<dyn PortOps>) -> ReturnCode {
        let mut ports = self.ports.write();
        if ports.iter().any(|p| p.base().name() == port.base().name()) {
            return ReturnCode::PreconditionNotMet;
        }
        ports.push(port);
        ReturnCode::Ok
    }

    /// Disconnect, deactivate and drop the named port.
    pub fn remove_port(&self, name: &str) -> ReturnCode {
        let removed = {
            let mut ports = self.ports.write();
            ports
                .iter()
                .position(|p| p.base().name() == name)
                .map(|idx| ports.remove(idx))
        };
        match removed {
            Some(port) => {
                shutdown_port(port.as_ref());
                ReturnCode::Ok
            }
            None => ReturnCode::BadParameter,
        }
    }

    pub fn get_port(&self, name: &str) -> Option<Arc<dyn PortOps>> {
        self.ports
            .read()
            .iter()
            .find(|p| p.base().name() == name)
            .cloned()
    }

    pub fn port_names(&self) -> Vec<String> {
        self.ports
            .read()
            .iter()
            .map(|p| p.base().name().to_string())
            .collect()
    }

    pub fn get_port_refs(&self) -> Vec<PortRef> {
        self.ports
            .read()
            .iter()
            .filter_map(|p| p.base().object_ref())
            .collect()
    }

    pub fn get_port_profiles(&self) -> Vec<PortProfile> {
        self.snapshot().iter().map(|p| p.get_port_profile()).collect()
    }

    /// Disconnect every connector of every port.
    pub fn disconnect_all(&self) -> ReturnCode {
        self.snapshot()
            .iter()
            .fold(ReturnCode::Ok, |rc, p| rc.and(p.disconnect_all()))
    }

    /// Remove every port.
    pub fn finalize_ports(&self) {
        let ports: Vec<Arc<dyn PortOps>> = self.ports.write().drain(..).collect();
        for port in ports {
            shutdown_port(port.as_ref());
        }
    }

    pub fn len(&self) -> usize {
        self.ports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn PortOps>> {
        self.ports.read().clone()
    }
}

fn shutdown_port(port: &dyn PortOps) {
    let rc = port.disconnect_all();
    if !rc.is_ok() {
        log::warn!("[port-admin] {}: disconnect_all returned {}", port.base().name(), rc);
    }
    port.release_endpoints();
    port.base().deactivate();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Orb;
    use crate::data::TimedLong;
    use crate::port::{InPort, OutPort};
    use crate::Properties;

    #[test]
    fn test_add_find_remove() {
        let orb = Arc::new(Orb::new("test"));
        let admin = PortAdmin::new();
        let inport = InPort::<TimedLong>::new("in", &orb, &Properties::new());
        let outport = OutPort::<TimedLong>::new("out", &orb, &Properties::new());

        assert_eq!(admin.add_port(inport.clone()), ReturnCode::Ok);
        assert_eq!(admin.add_port(outport), ReturnCode::Ok);
        assert_eq!(
            admin.add_port(InPort::<TimedLong>::new("in", &orb, &Properties::new())),
            ReturnCode::PreconditionNotMet
        );
        assert_eq!(admin.port_names(), vec!["in".to_string(), "out".to_string()]);
        assert!(admin.get_port("out").is_some());
        assert_eq!(admin.get_port_refs().len(), 2);

        let in_ref = inport.base().object_ref().expect("activated");
        assert_eq!(admin.remove_port("in"), ReturnCode::Ok);
        assert!(!in_ref.is_alive());
        assert_eq!(admin.remove_port("in"), ReturnCode::BadParameter);

        admin.finalize_ports();
        assert!(admin.is_empty());
    }
}
