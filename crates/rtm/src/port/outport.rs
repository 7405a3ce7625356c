// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed output data port.

use super::consumer::{ConsumerFactory, InPortCdrConsumer, OutPortConsumer};
use super::listener::DataHooks;
use super::provider::{InterfaceProvider, OutPortCdr, OutPortCdrProvider};
use super::publisher::{self, Publisher, PushConsumer};
use super::{buffer_for, dataflow_of, keys, ConnectorProfile, PortBase, PortOps, PortService, PortStatus};
use crate::broker::Orb;
use crate::buffer::BufferBase;
use crate::data::DataType;
use crate::rtc::ReturnCode;
use crate::Properties;
use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

/// One push connection: the peer binding and the publisher driving it.
struct PushConnection {
    connector_id: String,
    consumer: Arc<dyn OutPortConsumer>,
    publisher: Arc<dyn Publisher>,
}

/// What a publisher pushes for one connector: the latest buffered sample.
/// Connectors share the port buffer, so pushes peek instead of reading.
struct ConnectorPush<T: DataType> {
    connector_id: String,
    consumer: Arc<dyn OutPortConsumer>,
    buffer: Arc<dyn BufferBase<T>>,
    degraded: Arc<DashSet<String>>,
}

impl<T: DataType> PushConsumer for ConnectorPush<T> {
    fn push(&self) -> PortStatus {
        let Some(sample) = self.buffer.peek() else {
            return PortStatus::BufferEmpty;
        };
        let status = self.consumer.put(&sample.to_cdr());
        match status {
            PortStatus::ConnectionLost => {
                if self.degraded.insert(self.connector_id.clone()) {
                    log::warn!("[outport] connector {} lost its peer", self.connector_id);
                }
            }
            PortStatus::PortOk => {
                self.degraded.remove(&self.connector_id);
            }
            _ => {}
        }
        status
    }
}

/// Serves pull requests from the buffer.
struct OutPortSource<T: DataType> {
    port: Weak<OutPort<T>>,
}

impl<T: DataType> OutPortCdr for OutPortSource<T> {
    fn get(&self) -> Result<Vec<u8>, PortStatus> {
        let port = self.port.upgrade().ok_or(PortStatus::ConnectionLost)?;
        port.buffer
            .read()
            .map(|sample| sample.to_cdr())
            .ok_or(PortStatus::BufferEmpty)
    }
}

/// Output port for samples of type `T`.
///
/// `write` stores the sample in the port buffer and then signals every
/// connection's publisher.
pub struct OutPort<T: DataType> {
    base: PortBase,
    buffer: Arc<dyn BufferBase<T>>,
    hooks: RwLock<DataHooks<T>>,
    connections: Mutex<Vec<PushConnection>>,
    consumer_types: RwLock<Vec<(String, ConsumerFactory)>>,
    pull_provider: OutPortCdrProvider,
    degraded: Arc<DashSet<String>>,
}

impl<T: DataType> OutPort<T> {
    /// Create and activate the port. `props` may configure `buffer.type`
    /// and `buffer.length`.
    pub fn new(name: &str, orb: &Arc<Orb>, props: &Properties) -> Arc<Self> {
        let mut port_props = props.clone();
        port_props.set_property(keys::PORT_TYPE, "DataOutPort");
        port_props.set_property(keys::DATA_TYPE, T::TYPE_NAME);
        port_props.set_property(keys::INTERFACE_TYPE, keys::CORBA_CDR);
        port_props.set_property(keys::DATAFLOW_TYPE, "push,pull");
        port_props.set_property(keys::SUBSCRIPTION_TYPE, "flush,new,periodic");

        let cdr_consumer: ConsumerFactory = {
            let orb = Arc::clone(orb);
            Arc::new(move || Arc::new(InPortCdrConsumer::new(&orb)) as Arc<dyn OutPortConsumer>)
        };

        let port = Arc::new_cyclic(|weak: &Weak<Self>| {
            let source: Arc<dyn OutPortCdr> = Arc::new(OutPortSource { port: weak.clone() });
            Self {
                base: PortBase::new(name, orb, port_props),
                buffer: buffer_for(props),
                hooks: RwLock::new(DataHooks::default()),
                connections: Mutex::new(Vec::new()),
                consumer_types: RwLock::new(vec![(keys::CORBA_CDR.to_string(), cdr_consumer)]),
                pull_provider: OutPortCdrProvider::new(orb, source),
                degraded: Arc::new(DashSet::new()),
            }
        });
        port.base.activate(Arc::clone(&port) as Arc<dyn PortService>);
        port
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn buffer(&self) -> &Arc<dyn BufferBase<T>> {
        &self.buffer
    }

    pub fn set_hooks(&self, hooks: DataHooks<T>) {
        *self.hooks.write() = hooks;
    }

    /// Use `factory` for connections requesting `interface_type`. Replaces
    /// an existing registration of the same type.
    pub fn register_consumer_type(&self, interface_type: &str, factory: ConsumerFactory) {
        let mut types = self.consumer_types.write();
        types.retain(|(t, _)| t != interface_type);
        types.push((interface_type.to_string(), factory));
    }

    /// Write a sample and notify every publisher.
    ///
    /// Returns the first non-OK publisher status; `ConnectionLost` also
    /// marks that connector degraded while its profile is kept.
    pub fn write(&self, value: T) -> PortStatus {
        let hooks = self.hooks.read().clone();
        let value = hooks.before_write(value, || self.buffer.is_full());
        if !self.buffer.write(value) {
            return PortStatus::BufferError;
        }

        let publishers: Vec<Arc<dyn Publisher>> = self
            .connections
            .lock()
            .iter()
            .map(|c| Arc::clone(&c.publisher))
            .collect();
        publishers
            .iter()
            .map(|p| p.update())
            .fold(PortStatus::PortOk, |acc, s| if acc.is_ok() { s } else { acc })
    }

    /// Connectors whose last push found the peer gone.
    pub fn degraded_connectors(&self) -> Vec<String> {
        self.degraded.iter().map(|id| id.key().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }
}

impl<T: DataType> PortOps for OutPort<T> {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> ReturnCode {
        match dataflow_of(profile).as_str() {
            "push" => ReturnCode::Ok,
            "pull" => {
                if self.pull_provider.publish_interface(&mut profile.properties) {
                    ReturnCode::Ok
                } else {
                    ReturnCode::BadParameter
                }
            }
            other => {
                log::warn!("[outport] {}: unknown dataflow '{}'", self.name(), other);
                ReturnCode::BadParameter
            }
        }
    }

    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> ReturnCode {
        if dataflow_of(profile) != "push" {
            return ReturnCode::Ok;
        }
        let interface_type = profile.property(keys::INTERFACE_TYPE);
        let factory = self
            .consumer_types
            .read()
            .iter()
            .find(|(t, _)| *t == interface_type)
            .map(|(_, f)| Arc::clone(f));
        let Some(factory) = factory else {
            log::warn!("[outport] {}: no consumer for '{}'", self.name(), interface_type);
            return ReturnCode::Error;
        };

        let consumer = factory();
        if !consumer.subscribe_interface(&profile.properties) {
            return ReturnCode::Error;
        }
        let push = Arc::new(ConnectorPush {
            connector_id: profile.connector_id.clone(),
            consumer: Arc::clone(&consumer),
            buffer: Arc::clone(&self.buffer),
            degraded: Arc::clone(&self.degraded),
        });
        let Some(publisher) = publisher::create_publisher(push, &profile.to_properties()) else {
            consumer.unsubscribe_interface(&profile.properties);
            return ReturnCode::Error;
        };
        self.connections.lock().push(PushConnection {
            connector_id: profile.connector_id.clone(),
            consumer,
            publisher,
        });
        ReturnCode::Ok
    }

    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile) {
        let removed = {
            let mut connections = self.connections.lock();
            connections
                .iter()
                .position(|c| c.connector_id == profile.connector_id)
                .map(|idx| connections.remove(idx))
        };
        if let Some(connection) = removed {
            connection.publisher.release();
            connection.consumer.unsubscribe_interface(&profile.properties);
        }
        self.degraded.remove(&profile.connector_id);
    }

    fn release_endpoints(&self) {
        self.pull_provider.release();
        let connections: Vec<PushConnection> = self.connections.lock().drain(..).collect();
        for connection in connections {
            connection.publisher.release();
        }
    }
}
