// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service port: exchanges object references of user-defined interfaces.
//!
//! Providers are published under `port.<type>.<instance>`. A consumer
//! registered with the same type and instance name binds to the matching
//! reference when a connection is made.

use super::{
    ConnectorProfile, PortBase, PortInterfacePolarity, PortInterfaceProfile, PortOps,
    PortService,
};
use crate::broker::{ObjectRef, Orb};
use crate::rtc::ReturnCode;
use crate::util::nvutil;
use crate::Properties;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

fn interface_key(type_name: &str, instance_name: &str) -> String {
    format!("port.{}.{}", type_name, instance_name)
}

/// Holder for the peer reference a service port requires.
pub struct CorbaConsumer {
    bound: RwLock<Option<ObjectRef>>,
}

impl CorbaConsumer {
    pub fn new() -> Self {
        Self {
            bound: RwLock::new(None),
        }
    }

    pub fn set_object(&self, obj: ObjectRef) {
        *self.bound.write() = Some(obj);
    }

    pub fn release_object(&self) {
        *self.bound.write() = None;
    }

    pub fn object(&self) -> Option<ObjectRef> {
        self.bound.read().clone()
    }

    /// Typed handle of the bound peer, if it is alive.
    pub fn narrow<S: Any + Clone>(&self) -> Option<S> {
        self.bound
            .read()
            .as_ref()
            .filter(|obj| obj.is_active())
            .and_then(|obj| obj.narrow::<S>())
    }
}

impl Default for CorbaConsumer {
    fn default() -> Self {
        Self::new()
    }
}

struct Provided {
    key: String,
    obj: ObjectRef,
}

struct Required {
    key: String,
    consumer: Arc<CorbaConsumer>,
}

pub struct CorbaPort {
    base: PortBase,
    providers: RwLock<Vec<Provided>>,
    consumers: RwLock<Vec<Required>>,
}

impl CorbaPort {
    pub fn new(name: &str, orb: &Arc<Orb>) -> Arc<Self> {
        let mut props = Properties::new();
        props.set_property(super::keys::PORT_TYPE, "CorbaPort");
        let port = Arc::new(Self {
            base: PortBase::new(name, orb, props),
            providers: RwLock::new(Vec::new()),
            consumers: RwLock::new(Vec::new()),
        });
        port.base.activate(Arc::clone(&port) as Arc<dyn PortService>);
        port
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Offer `obj` as `instance_name` of interface `type_name`. Returns
    /// `false` if that instance name is already registered.
    pub fn register_provider(&self, instance_name: &str, type_name: &str, obj: ObjectRef) -> bool {
        let key = interface_key(type_name, instance_name);
        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.key == key) {
            return false;
        }
        providers.push(Provided { key, obj });
        self.base.append_interface(PortInterfaceProfile {
            instance_name: instance_name.to_string(),
            type_name: type_name.to_string(),
            polarity: PortInterfacePolarity::Provided,
        });
        true
    }

    /// Require interface `type_name`; `consumer` is bound on connect.
    pub fn register_consumer(
        &self,
        instance_name: &str,
        type_name: &str,
        consumer: Arc<CorbaConsumer>,
    ) -> bool {
        let key = interface_key(type_name, instance_name);
        let mut consumers = self.consumers.write();
        if consumers.iter().any(|c| c.key == key) {
            return false;
        }
        consumers.push(Required { key, consumer });
        self.base.append_interface(PortInterfaceProfile {
            instance_name: instance_name.to_string(),
            type_name: type_name.to_string(),
            polarity: PortInterfacePolarity::Required,
        });
        true
    }
}

impl PortOps for CorbaPort {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> ReturnCode {
        for provided in self.providers.read().iter() {
            profile
                .properties
                .push(nvutil::new_nv(&provided.key, provided.obj.clone()));
        }
        ReturnCode::Ok
    }

    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> ReturnCode {
        for required in self.consumers.read().iter() {
            if let Some(obj) = nvutil::find_object(&profile.properties, &required.key) {
                required.consumer.set_object(obj);
            }
        }
        ReturnCode::Ok
    }

    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile) {
        for required in self.consumers.read().iter() {
            let advertised = nvutil::find_object(&profile.properties, &required.key);
            if advertised.is_some() && advertised == required.consumer.object() {
                required.consumer.release_object();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ConnectorProfile;

    trait Echo: Send + Sync {
        fn echo(&self, msg: &str) -> String;
    }

    struct EchoImpl;

    impl Echo for EchoImpl {
        fn echo(&self, msg: &str) -> String {
            msg.to_uppercase()
        }
    }

    #[test]
    fn test_provider_consumer_binding() {
        let orb = Arc::new(Orb::new("test"));
        let servant: Arc<dyn Echo> = Arc::new(EchoImpl);
        let echo_obj = orb.poa().activate_object("IDL:Echo:1.0", servant);

        let server = CorbaPort::new("server", &orb);
        assert!(server.register_provider("echo0", "Echo", echo_obj));

        let client = CorbaPort::new("client", &orb);
        let consumer = Arc::new(CorbaConsumer::new());
        assert!(client.register_consumer("echo0", "Echo", Arc::clone(&consumer)));
        assert!(!client.register_consumer("echo0", "Echo", Arc::new(CorbaConsumer::new())));

        let ports = vec![
            client.base().object_ref().expect("client ref"),
            server.base().object_ref().expect("server ref"),
        ];
        let (rc, profile) = client.connect(ConnectorProfile::new("echo", ports, &Properties::new()));
        assert_eq!(rc, ReturnCode::Ok);

        let echo = consumer.narrow::<Arc<dyn Echo>>().expect("bound echo");
        assert_eq!(echo.echo("hi"), "HI");

        assert_eq!(client.disconnect(&profile.connector_id), ReturnCode::Ok);
        assert!(consumer.object().is_none());
        assert!(server.get_connector_profiles().is_empty());
    }
}
