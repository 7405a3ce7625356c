// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side data endpoints.

use super::provider::{InPortCdr, OutPortCdr};
use super::{keys, PortStatus};
use crate::broker::{ObjectRef, Orb};
use crate::util::nvutil::{self, NVList};
use parking_lot::Mutex;
use std::sync::Arc;

/// Binds to a peer endpoint advertised in a connector profile.
pub trait InterfaceConsumer: Send + Sync {
    /// Look up the peer reference in `props` and bind to it.
    fn subscribe_interface(&self, props: &NVList) -> bool;

    /// Drop the binding if `props` advertises the currently bound peer.
    fn unsubscribe_interface(&self, props: &NVList);
}

/// Push-side consumer owned by one OutPort connection.
pub trait OutPortConsumer: InterfaceConsumer {
    fn put(&self, data: &[u8]) -> PortStatus;
}

/// Builds a fresh consumer for each new connection.
pub type ConsumerFactory = Arc<dyn Fn() -> Arc<dyn OutPortConsumer> + Send + Sync>;

/// Resolve the endpoint under `ref_key`, falling back to the stringified
/// form under `ior_key`.
fn lookup(orb: &Orb, props: &NVList, ref_key: &str, ior_key: &str) -> Option<ObjectRef> {
    if let Some(obj) = nvutil::find_object(props, ref_key) {
        return Some(obj);
    }
    let ior = nvutil::to_string(props, ior_key);
    if ior.is_empty() {
        return None;
    }
    match orb.string_to_object(&ior) {
        Ok(obj) => Some(obj),
        Err(e) => {
            log::warn!("[consumer] cannot restore {}: {}", ior_key, e);
            None
        }
    }
}

/// Pushes encoded samples into a peer InPort.
pub struct InPortCdrConsumer {
    orb: Arc<Orb>,
    bound: Mutex<Option<(ObjectRef, Arc<dyn InPortCdr>)>>,
}

impl InPortCdrConsumer {
    pub fn new(orb: &Arc<Orb>) -> Self {
        Self {
            orb: Arc::clone(orb),
            bound: Mutex::new(None),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.lock().is_some()
    }
}

impl InterfaceConsumer for InPortCdrConsumer {
    fn subscribe_interface(&self, props: &NVList) -> bool {
        let Some(obj) = lookup(&self.orb, props, keys::INPORT_REF, keys::INPORT_IOR) else {
            log::debug!("[consumer] no {} in profile", keys::INPORT_REF);
            return false;
        };
        let Some(servant) = obj.narrow::<Arc<dyn InPortCdr>>() else {
            log::warn!("[consumer] {} is not an InPortCdr", obj.repository_id());
            return false;
        };
        *self.bound.lock() = Some((obj, servant));
        true
    }

    fn unsubscribe_interface(&self, props: &NVList) {
        let advertised = nvutil::find_object(props, keys::INPORT_REF);
        let mut bound = self.bound.lock();
        if matches!((&*bound, &advertised), (Some((current, _)), Some(obj)) if current == obj) {
            *bound = None;
        }
    }
}

impl OutPortConsumer for InPortCdrConsumer {
    fn put(&self, data: &[u8]) -> PortStatus {
        let target = self.bound.lock().clone();
        match target {
            None => PortStatus::PreconditionNotMet,
            Some((obj, _)) if !obj.is_active() => PortStatus::ConnectionLost,
            Some((_, servant)) => servant.put(data),
        }
    }
}

/// Fetches encoded samples from a peer OutPort.
pub struct OutPortCdrConsumer {
    orb: Arc<Orb>,
    bound: Mutex<Option<(ObjectRef, Arc<dyn OutPortCdr>)>>,
}

impl OutPortCdrConsumer {
    pub fn new(orb: &Arc<Orb>) -> Self {
        Self {
            orb: Arc::clone(orb),
            bound: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Result<Vec<u8>, PortStatus> {
        let source = self.bound.lock().clone();
        match source {
            None => Err(PortStatus::PreconditionNotMet),
            Some((obj, _)) if !obj.is_active() => Err(PortStatus::ConnectionLost),
            Some((_, servant)) => servant.get(),
        }
    }
}

impl InterfaceConsumer for OutPortCdrConsumer {
    fn subscribe_interface(&self, props: &NVList) -> bool {
        let Some(obj) = lookup(&self.orb, props, keys::OUTPORT_REF, keys::OUTPORT_IOR) else {
            log::debug!("[consumer] no {} in profile", keys::OUTPORT_REF);
            return false;
        };
        let Some(servant) = obj.narrow::<Arc<dyn OutPortCdr>>() else {
            log::warn!("[consumer] {} is not an OutPortCdr", obj.repository_id());
            return false;
        };
        *self.bound.lock() = Some((obj, servant));
        true
    }

    fn unsubscribe_interface(&self, props: &NVList) {
        let advertised = nvutil::find_object(props, keys::OUTPORT_REF);
        let mut bound = self.bound.lock();
        if matches!((&*bound, &advertised), (Some((current, _)), Some(obj)) if current == obj) {
            *bound = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        puts: AtomicUsize,
    }

    impl InPortCdr for CountingSink {
        fn put(&self, _data: &[u8]) -> PortStatus {
            self.puts.fetch_add(1, Ordering::SeqCst);
            PortStatus::PortOk
        }
    }

    #[test]
    fn test_bind_put_unbind() {
        let orb = Arc::new(Orb::new("test"));
        let sink = Arc::new(CountingSink::default());
        let servant: Arc<dyn InPortCdr> = sink.clone();
        let obj = orb.poa().activate_object("IDL:RTC/InPortCdr:1.0", servant);

        let consumer = InPortCdrConsumer::new(&orb);
        assert_eq!(consumer.put(b"x"), PortStatus::PreconditionNotMet);

        let props = vec![nvutil::new_nv(keys::INPORT_REF, obj.clone())];
        assert!(consumer.subscribe_interface(&props));
        assert_eq!(consumer.put(b"x"), PortStatus::PortOk);
        assert_eq!(sink.puts.load(Ordering::SeqCst), 1);

        // A different advertised reference leaves the binding alone.
        let other = orb.poa().activate_object("IDL:Other:1.0", 0u8);
        consumer.unsubscribe_interface(&vec![nvutil::new_nv(keys::INPORT_REF, other)]);
        assert!(consumer.is_bound());

        consumer.unsubscribe_interface(&props);
        assert!(!consumer.is_bound());
    }

    #[test]
    fn test_ior_fallback_and_connection_lost() {
        let orb = Arc::new(Orb::new("test"));
        let servant: Arc<dyn InPortCdr> = Arc::new(CountingSink::default());
        let obj = orb.poa().activate_object("IDL:RTC/InPortCdr:1.0", servant);
        let props = vec![nvutil::new_nv(keys::INPORT_IOR, orb.object_to_string(&obj))];

        let consumer = InPortCdrConsumer::new(&orb);
        assert!(consumer.subscribe_interface(&props));
        orb.poa().deactivate_object(obj.id());
        assert_eq!(consumer.put(b"x"), PortStatus::ConnectionLost);
    }

    #[test]
    fn test_wrong_servant_type_rejected() {
        let orb = Arc::new(Orb::new("test"));
        let obj = orb.poa().activate_object("IDL:Other:1.0", 7u32);
        let consumer = OutPortCdrConsumer::new(&orb);
        assert!(!consumer.subscribe_interface(&vec![nvutil::new_nv(keys::OUTPORT_REF, obj)]));
        assert_eq!(consumer.get(), Err(PortStatus::PreconditionNotMet));
    }
}
