// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Broker core: servant pool, reference stringification, name-service
//! directory and the blocking event loop.

use super::{BrokerError, NamingService, ObjectId, ObjectRef, Poa};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

const IOR_PREFIX: &str = "IOR:";

/// In-process object request broker.
pub struct Orb {
    id: String,
    poa: Poa,
    name_services: DashMap<String, Arc<dyn NamingService>>,
    running: Mutex<bool>,
    stopped: Condvar,
}

impl Orb {
    /// Create a running broker identified by `id` (the `corba.id` key).
    pub fn new(id: &str) -> Self {
        log::debug!("[orb] init id={}", id);
        Self {
            id: id.to_string(),
            poa: Poa::new(),
            name_services: DashMap::new(),
            running: Mutex::new(true),
            stopped: Condvar::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn poa(&self) -> &Poa {
        &self.poa
    }

    /// `IOR:<orb-id>/<object-id>`.
    pub fn object_to_string(&self, obj: &ObjectRef) -> String {
        format!("{}{}/{}", IOR_PREFIX, self.id, obj.id())
    }

    /// Restore a reference produced by [`object_to_string`](Self::object_to_string).
    pub fn string_to_object(&self, ior: &str) -> Result<ObjectRef, BrokerError> {
        let body = ior
            .strip_prefix(IOR_PREFIX)
            .ok_or_else(|| BrokerError::InvalidName(ior.to_string()))?;
        let (orb_id, object_id) = body
            .rsplit_once('/')
            .ok_or_else(|| BrokerError::InvalidName(ior.to_string()))?;
        if orb_id != self.id {
            return Err(BrokerError::Transient(format!("unreachable broker '{}'", orb_id)));
        }
        let id = ObjectId::parse(object_id).ok_or_else(|| BrokerError::InvalidName(ior.to_string()))?;
        self.poa
            .id_to_reference(id)
            .ok_or_else(|| BrokerError::ObjectNotExist(object_id.to_string()))
    }

    /// Make a name service reachable at `address` (e.g. `localhost`).
    pub fn register_name_service(&self, address: &str, service: Arc<dyn NamingService>) {
        log::debug!("[orb] name service registered at {}", address);
        self.name_services.insert(address.to_string(), service);
    }

    pub fn unregister_name_service(&self, address: &str) -> bool {
        self.name_services.remove(address).is_some()
    }

    /// Root context of the name service at `address`.
    pub fn resolve_name_service(&self, address: &str) -> Result<Arc<dyn NamingService>, BrokerError> {
        self.name_services
            .get(address)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BrokerError::Transient(format!("no name service at '{}'", address)))
    }

    /// Block the calling thread until [`shutdown`](Self::shutdown).
    pub fn run(&self) {
        let mut running = self.running.lock();
        while *running {
            self.stopped.wait(&mut running);
        }
    }

    /// Like [`run`](Self::run) but gives up after `timeout`. Returns `true`
    /// if the broker was shut down.
    pub fn run_for(&self, timeout: Duration) -> bool {
        let mut running = self.running.lock();
        if *running {
            let _ = self.stopped.wait_for(&mut running, timeout);
        }
        !*running
    }

    /// Deactivate every servant and release threads blocked in `run`.
    pub fn shutdown(&self) {
        {
            let mut running = self.running.lock();
            if !*running {
                return;
            }
            *running = false;
        }
        self.poa.deactivate_all();
        self.name_services.clear();
        self.stopped.notify_all();
        log::debug!("[orb] shutdown id={}", self.id);
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryNamingService;
    use std::thread;

    #[test]
    fn test_stringify_round_trip() {
        let orb = Orb::new("test");
        let obj = orb.poa().activate_object("IDL:Test:1.0", 5i32);
        let ior = orb.object_to_string(&obj);
        assert!(ior.starts_with("IOR:test/"));
        assert_eq!(orb.string_to_object(&ior).expect("restore"), obj);

        assert!(matches!(
            orb.string_to_object("bogus"),
            Err(BrokerError::InvalidName(_))
        ));
        assert!(matches!(
            orb.string_to_object("IOR:other/0000000000000001"),
            Err(BrokerError::Transient(_))
        ));

        orb.poa().deactivate_object(obj.id());
        assert!(matches!(
            orb.string_to_object(&ior),
            Err(BrokerError::ObjectNotExist(_))
        ));
    }

    #[test]
    fn test_name_service_directory() {
        let orb = Orb::new("test");
        assert!(orb.resolve_name_service("localhost").is_err());
        orb.register_name_service("localhost", Arc::new(InMemoryNamingService::new()));
        assert!(orb.resolve_name_service("localhost").is_ok());
        assert!(orb.unregister_name_service("localhost"));
    }

    #[test]
    fn test_run_returns_after_shutdown() {
        let orb = Arc::new(Orb::new("test"));
        let runner = Arc::clone(&orb);
        let handle = thread::spawn(move || runner.run());
        thread::sleep(Duration::from_millis(20));
        orb.shutdown();
        handle.join().expect("run thread");
        assert!(!orb.is_running());
        assert!(orb.run_for(Duration::from_millis(1)));
    }
}
