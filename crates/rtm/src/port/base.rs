// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector state and the connection handshake shared by every port.
//!
//! `connect` is issued on the first port of a profile. It assigns the
//! connector id and starts `notify_connect`, which walks the port list in
//! order:
//!
//! ```text
//! port[0]: publish -> port[1]: publish -> ... -> port[n-1]: publish
//!                                                port[n-1]: subscribe, store
//!                               port[1]: subscribe, store  <-
//! port[0]: subscribe, store  <-
//! ```
//!
//! A port whose subscription fails sends `notify_disconnect` down the list
//! so ports that already subscribed undo it, then reports `Error` upstream.
//! Upstream ports have not subscribed yet, so nothing is left behind.
//!
//! `notify_disconnect` carries the port list along. A port that lost the
//! connector still passes the call on, so ports further down are released.
//!
//! No lock is held while another port is called.

use super::listener::ConnectionHooks;
use super::profile::PORT_REPOSITORY_ID;
use super::{ConnectorProfile, PortInterfaceProfile, PortProfile, PortRef};
use crate::broker::{ObjectRef, Orb};
use crate::rtc::ReturnCode;
use crate::util::nvutil;
use crate::Properties;
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Remote-visible port operations.
pub trait PortService: Send + Sync {
    fn get_port_profile(&self) -> PortProfile;

    fn get_connector_profiles(&self) -> Vec<ConnectorProfile>;

    /// `Err(BadParameter)` for an unknown id.
    fn get_connector_profile(&self, connector_id: &str) -> Result<ConnectorProfile, ReturnCode>;

    fn connect(&self, profile: ConnectorProfile) -> (ReturnCode, ConnectorProfile);

    fn notify_connect(&self, profile: ConnectorProfile) -> (ReturnCode, ConnectorProfile);

    fn disconnect(&self, connector_id: &str) -> ReturnCode;

    fn notify_disconnect(&self, connector_id: &str) -> ReturnCode;

    /// `notify_disconnect` that falls back to `ports` for the rest of the
    /// chain when this port no longer holds the connector.
    fn notify_disconnect_along(&self, connector_id: &str, ports: &[PortRef]) -> ReturnCode;

    /// Disconnect every connector; returns the first failure, if any.
    fn disconnect_all(&self) -> ReturnCode;
}

/// Per-kind behaviour plugged into the handshake.
pub trait PortOps: Send + Sync + 'static {
    fn base(&self) -> &PortBase;

    /// Append this port's endpoints to the profile.
    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> ReturnCode;

    /// Bind to the peers' endpoints found in the profile.
    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> ReturnCode;

    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile);

    /// Release servants owned by the port itself (providers).
    fn release_endpoints(&self) {}
}

/// State common to every port.
pub struct PortBase {
    name: String,
    orb: Arc<Orb>,
    properties: RwLock<Properties>,
    interfaces: RwLock<Vec<PortInterfaceProfile>>,
    connectors: Mutex<Vec<ConnectorProfile>>,
    objref: RwLock<Option<PortRef>>,
    owner: RwLock<Option<ObjectRef>>,
    hooks: RwLock<ConnectionHooks>,
}

impl PortBase {
    pub fn new(name: &str, orb: &Arc<Orb>, properties: Properties) -> Self {
        Self {
            name: name.to_string(),
            orb: Arc::clone(orb),
            properties: RwLock::new(properties),
            interfaces: RwLock::new(Vec::new()),
            connectors: Mutex::new(Vec::new()),
            objref: RwLock::new(None),
            owner: RwLock::new(None),
            hooks: RwLock::new(ConnectionHooks::default()),
        }
    }

    /// Activate `servant` (the port that owns this base) in the broker.
    pub(crate) fn activate(&self, servant: Arc<dyn PortService>) -> PortRef {
        let obj = self
            .orb
            .poa()
            .activate_object(PORT_REPOSITORY_ID, Arc::clone(&servant));
        let port_ref = PortRef::from_parts(obj, servant);
        *self.objref.write() = Some(port_ref.clone());
        port_ref
    }

    /// Remove the port from the broker; peers holding its reference see
    /// the connection as lost.
    pub fn deactivate(&self) {
        if let Some(port_ref) = self.objref.write().take() {
            self.orb.poa().deactivate_object(port_ref.object().id());
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orb(&self) -> &Arc<Orb> {
        &self.orb
    }

    pub fn object_ref(&self) -> Option<PortRef> {
        self.objref.read().clone()
    }

    pub fn owner(&self) -> Option<ObjectRef> {
        self.owner.read().clone()
    }

    pub fn set_owner(&self, owner: ObjectRef) {
        *self.owner.write() = Some(owner);
    }

    pub fn properties(&self) -> Properties {
        self.properties.read().clone()
    }

    pub fn set_property(&self, key: &str, value: &str) {
        self.properties.write().set_property(key, value);
    }

    pub fn append_interface(&self, interface: PortInterfaceProfile) {
        self.interfaces.write().push(interface);
    }

    pub fn interfaces(&self) -> Vec<PortInterfaceProfile> {
        self.interfaces.read().clone()
    }

    pub fn set_connection_hooks(&self, hooks: ConnectionHooks) {
        *self.hooks.write() = hooks;
    }

    pub fn connector_ids(&self) -> Vec<String> {
        self.connectors
            .lock()
            .iter()
            .map(|c| c.connector_id.clone())
            .collect()
    }

    pub fn has_connector(&self, connector_id: &str) -> bool {
        self.connectors
            .lock()
            .iter()
            .any(|c| c.connector_id == connector_id)
    }

    pub fn find_connector(&self, connector_id: &str) -> Option<ConnectorProfile> {
        self.connectors
            .lock()
            .iter()
            .find(|c| c.connector_id == connector_id)
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        !self.connectors.lock().is_empty()
    }

    /// Store a negotiated profile. `false` if the id is already present.
    fn store_connector(&self, profile: ConnectorProfile) -> bool {
        let mut connectors = self.connectors.lock();
        if connectors
            .iter()
            .any(|c| c.connector_id == profile.connector_id)
        {
            return false;
        }
        connectors.push(profile);
        true
    }

    fn erase_connector(&self, connector_id: &str) -> Option<ConnectorProfile> {
        let mut connectors = self.connectors.lock();
        let idx = connectors
            .iter()
            .position(|c| c.connector_id == connector_id)?;
        Some(connectors.remove(idx))
    }

    fn fire_connect(&self, profile: &ConnectorProfile) {
        let hook = self.hooks.read().on_connect.clone();
        if let Some(hook) = hook {
            hook(profile);
        }
    }

    fn fire_disconnect(&self, profile: &ConnectorProfile) {
        let hook = self.hooks.read().on_disconnect.clone();
        if let Some(hook) = hook {
            hook(profile);
        }
    }

    fn profile(&self) -> PortProfile {
        PortProfile {
            name: self.name.clone(),
            interfaces: self.interfaces(),
            port_ref: self.object_ref(),
            connector_profiles: self.connectors.lock().clone(),
            owner: self.owner(),
            properties: nvutil::from_properties(&self.properties.read()),
        }
    }
}

/// Run a port-kind callback, turning a panic into `Error`.
fn guarded(port: &str, step: &str, f: impl FnOnce() -> ReturnCode) -> ReturnCode {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(rc) => rc,
        Err(_) => {
            log::error!("[port] {}: {} panicked", port, step);
            ReturnCode::Error
        }
    }
}

fn call_notify_connect(next: &PortRef, profile: ConnectorProfile) -> (ReturnCode, ConnectorProfile) {
    match next.service() {
        Ok(service) => service.notify_connect(profile),
        Err(e) => {
            log::warn!("[port] notify_connect to {:?} failed: {}", next, e);
            (ReturnCode::Error, profile)
        }
    }
}

fn call_notify_disconnect(next: &PortRef, connector_id: &str, ports: &[PortRef]) -> ReturnCode {
    match next.service() {
        Ok(service) => service.notify_disconnect_along(connector_id, ports),
        Err(e) => {
            log::warn!("[port] notify_disconnect to {:?} failed: {}", next, e);
            ReturnCode::Error
        }
    }
}

fn has_duplicates(ports: &[PortRef]) -> bool {
    ports
        .iter()
        .enumerate()
        .any(|(i, p)| ports[i + 1..].contains(p))
}

impl<P: PortOps + ?Sized> PortService for P {
    fn get_port_profile(&self) -> PortProfile {
        self.base().profile()
    }

    fn get_connector_profiles(&self) -> Vec<ConnectorProfile> {
        self.base().connectors.lock().clone()
    }

    fn get_connector_profile(&self, connector_id: &str) -> Result<ConnectorProfile, ReturnCode> {
        self.base()
            .find_connector(connector_id)
            .ok_or(ReturnCode::BadParameter)
    }

    fn connect(&self, mut profile: ConnectorProfile) -> (ReturnCode, ConnectorProfile) {
        let base = self.base();
        if profile.ports.len() < 2 || has_duplicates(&profile.ports) {
            log::debug!("[port] {}: connect rejected, bad port list", base.name());
            return (ReturnCode::BadParameter, profile);
        }
        let Some(me) = base.object_ref() else {
            return (ReturnCode::Error, profile);
        };
        if profile.ports[0] != me {
            log::debug!("[port] {}: connect must be issued on the first port", base.name());
            return (ReturnCode::BadParameter, profile);
        }
        if profile.connector_id.is_empty() {
            profile.connector_id = uuid::Uuid::new_v4().to_string();
        } else if base.has_connector(&profile.connector_id) {
            return (ReturnCode::PreconditionNotMet, profile);
        }

        let (rc, profile) = self.notify_connect(profile);
        if rc.is_ok() {
            log::info!(
                "[port] {}: connected {} ({})",
                base.name(),
                profile.name,
                profile.connector_id
            );
        } else {
            log::warn!("[port] {}: connect {} failed: {}", base.name(), profile.name, rc);
        }
        (rc, profile)
    }

    fn notify_connect(&self, mut profile: ConnectorProfile) -> (ReturnCode, ConnectorProfile) {
        let base = self.base();
        let Some(me) = base.object_ref() else {
            return (ReturnCode::Error, profile);
        };
        let Some(index) = profile.index_of(&me) else {
            return (ReturnCode::BadParameter, profile);
        };
        if base.has_connector(&profile.connector_id) {
            return (ReturnCode::PreconditionNotMet, profile);
        }

        let rc = guarded(base.name(), "publish_interfaces", || {
            self.publish_interfaces(&mut profile)
        });
        if !rc.is_ok() {
            return (rc, profile);
        }

        let next = profile.ports.get(index + 1).cloned();
        if let Some(next) = &next {
            let (rc, returned) = call_notify_connect(next, profile);
            profile = returned;
            if !rc.is_ok() {
                return (rc, profile);
            }
        }

        let rc = guarded(base.name(), "subscribe_interfaces", || {
            self.subscribe_interfaces(&profile)
        });
        if !rc.is_ok() {
            log::warn!(
                "[port] {}: subscribe failed ({}), rolling back {}",
                base.name(),
                rc,
                profile.connector_id
            );
            if let Some(next) = &next {
                call_notify_disconnect(next, &profile.connector_id, &profile.ports);
            }
            return (ReturnCode::Error, profile);
        }

        if !base.store_connector(profile.clone()) {
            self.unsubscribe_interfaces(&profile);
            if let Some(next) = &next {
                call_notify_disconnect(next, &profile.connector_id, &profile.ports);
            }
            return (ReturnCode::PreconditionNotMet, profile);
        }
        base.fire_connect(&profile);
        (ReturnCode::Ok, profile)
    }

    fn disconnect(&self, connector_id: &str) -> ReturnCode {
        let base = self.base();
        let Some(profile) = base.find_connector(connector_id) else {
            return ReturnCode::BadParameter;
        };
        let me = base.object_ref();
        let rc = match profile.ports.first() {
            Some(first) if Some(first) == me.as_ref() => {
                self.notify_disconnect_along(connector_id, &profile.ports)
            }
            Some(first) => call_notify_disconnect(first, connector_id, &profile.ports),
            None => ReturnCode::BadParameter,
        };

        // The chain did not reach this port.
        if let Some(profile) = base.erase_connector(connector_id) {
            guarded(base.name(), "unsubscribe_interfaces", || {
                self.unsubscribe_interfaces(&profile);
                ReturnCode::Ok
            });
            base.fire_disconnect(&profile);
        }
        log::info!("[port] {}: disconnected {} ({})", base.name(), connector_id, rc);
        rc
    }

    fn notify_disconnect(&self, connector_id: &str) -> ReturnCode {
        self.notify_disconnect_along(connector_id, &[])
    }

    fn notify_disconnect_along(&self, connector_id: &str, ports: &[PortRef]) -> ReturnCode {
        let base = self.base();
        let local = base.find_connector(connector_id);
        let chain = local.as_ref().map_or(ports, |profile| profile.ports.as_slice());
        let next = base
            .object_ref()
            .and_then(|me| chain.iter().position(|p| *p == me))
            .and_then(|index| chain.get(index + 1).cloned());

        let rc = match &local {
            Some(profile) => {
                let rc = guarded(base.name(), "unsubscribe_interfaces", || {
                    self.unsubscribe_interfaces(profile);
                    ReturnCode::Ok
                });
                base.erase_connector(connector_id);
                base.fire_disconnect(profile);
                rc
            }
            None => {
                log::debug!("[port] {}: no connector {}", base.name(), connector_id);
                ReturnCode::BadParameter
            }
        };

        match next {
            Some(next) => rc.and(call_notify_disconnect(&next, connector_id, chain)),
            None => rc,
        }
    }

    fn disconnect_all(&self) -> ReturnCode {
        self.base()
            .connector_ids()
            .iter()
            .fold(ReturnCode::Ok, |rc, id| rc.and(self.disconnect(id)))
    }
}
