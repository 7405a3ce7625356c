// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed input data port.

use super::consumer::{InterfaceConsumer, OutPortCdrConsumer};
use super::listener::DataHooks;
use super::provider::{InPortCdr, InPortCdrProvider, InterfaceProvider};
use super::{buffer_for, dataflow_of, keys, ConnectorProfile, PortBase, PortOps, PortService, PortStatus};
use crate::broker::Orb;
use crate::buffer::BufferBase;
use crate::data::DataType;
use crate::rtc::ReturnCode;
use crate::util::string_util;
use crate::Properties;
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Receives pushed samples on behalf of the port.
struct InPortSink<T: DataType> {
    port: Weak<InPort<T>>,
}

impl<T: DataType> InPortCdr for InPortSink<T> {
    fn put(&self, data: &[u8]) -> PortStatus {
        let Some(port) = self.port.upgrade() else {
            return PortStatus::ConnectionLost;
        };
        match T::from_cdr(data) {
            Ok(sample) => port.receive(sample),
            Err(e) => {
                log::warn!("[inport] {}: undecodable {}: {}", port.name(), T::TYPE_NAME, e);
                PortStatus::PortError
            }
        }
    }
}

/// Input port for samples of type `T`.
///
/// Port properties `readBlock` (YES/NO) and `readTimeout` (microseconds,
/// non-positive = wait forever) make `read` wait for new data.
pub struct InPort<T: DataType> {
    base: PortBase,
    buffer: Arc<dyn BufferBase<T>>,
    hooks: RwLock<DataHooks<T>>,
    providers: RwLock<Vec<Arc<dyn InterfaceProvider>>>,
    pull_sources: Mutex<Vec<(String, Arc<OutPortCdrConsumer>)>>,
    arrivals: Mutex<u64>,
    arrived: Condvar,
    read_block: bool,
    read_timeout: Option<Duration>,
}

impl<T: DataType> InPort<T> {
    pub fn new(name: &str, orb: &Arc<Orb>, props: &Properties) -> Arc<Self> {
        let mut port_props = props.clone();
        port_props.set_property(keys::PORT_TYPE, "DataInPort");
        port_props.set_property(keys::DATA_TYPE, T::TYPE_NAME);
        port_props.set_property(keys::INTERFACE_TYPE, keys::CORBA_CDR);
        port_props.set_property(keys::DATAFLOW_TYPE, "push,pull");
        port_props.set_property(keys::SUBSCRIPTION_TYPE, "flush,new,periodic");

        let read_block = string_util::is_yes(&props.get_property(keys::READ_BLOCK));
        let read_timeout = props
            .get_property(keys::READ_TIMEOUT)
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|usec| *usec > 0)
            .map(|usec| Duration::from_micros(usec as u64));

        let port = Arc::new_cyclic(|weak: &Weak<Self>| {
            let sink: Arc<dyn InPortCdr> = Arc::new(InPortSink { port: weak.clone() });
            let provider: Arc<dyn InterfaceProvider> = Arc::new(InPortCdrProvider::new(orb, sink));
            Self {
                base: PortBase::new(name, orb, port_props),
                buffer: buffer_for(props),
                hooks: RwLock::new(DataHooks::default()),
                providers: RwLock::new(vec![provider]),
                pull_sources: Mutex::new(Vec::new()),
                arrivals: Mutex::new(0),
                arrived: Condvar::new(),
                read_block,
                read_timeout,
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

    /// Offer an additional interface variant to peers.
    pub fn add_provider(&self, provider: Arc<dyn InterfaceProvider>) {
        self.providers.write().push(provider);
    }

    /// `true` iff a sample arrived since the last read.
    pub fn is_new(&self) -> bool {
        self.buffer.is_new()
    }

    /// Store a sample that arrived from a peer.
    pub fn receive(&self, sample: T) -> PortStatus {
        let hooks = self.hooks.read().clone();
        let sample = hooks.before_write(sample, || self.buffer.is_full());
        if !self.buffer.write(sample) {
            return PortStatus::BufferError;
        }
        let mut arrivals = self.arrivals.lock();
        *arrivals += 1;
        self.arrived.notify_all();
        PortStatus::PortOk
    }

    /// Most recent sample; clears the "new" flag.
    ///
    /// Pull connections are polled first. When nothing is readable the
    /// underflow hook may supply a value; otherwise `BufferEmpty` (or
    /// `BufferTimeout` for a blocking read that timed out) is returned.
    pub fn read(&self) -> Result<T, PortStatus> {
        self.pull_from_peers();
        let hooks = self.hooks.read().clone();

        if self.read_block && !self.wait_new() {
            return hooks.underflow().ok_or(PortStatus::BufferTimeout);
        }
        match self.buffer.read() {
            Some(sample) => Ok(hooks.after_read(sample)),
            None => hooks.underflow().ok_or(PortStatus::BufferEmpty),
        }
    }

    fn wait_new(&self) -> bool {
        let deadline = self.read_timeout.map(|t| Instant::now() + t);
        let mut arrivals = self.arrivals.lock();
        while !self.buffer.is_new() {
            match deadline {
                Some(deadline) => {
                    if self.arrived.wait_until(&mut arrivals, deadline).timed_out() {
                        return self.buffer.is_new();
                    }
                }
                None => self.arrived.wait(&mut arrivals),
            }
        }
        true
    }

    fn pull_from_peers(&self) {
        let sources: Vec<Arc<OutPortCdrConsumer>> = self
            .pull_sources
            .lock()
            .iter()
            .map(|(_, c)| Arc::clone(c))
            .collect();
        for source in sources {
            match source.get() {
                Ok(bytes) => match T::from_cdr(&bytes) {
                    Ok(sample) => {
                        self.receive(sample);
                    }
                    Err(e) => log::warn!("[inport] {}: undecodable pull: {}", self.name(), e),
                },
                Err(status) => log::trace!("[inport] {}: pull returned {}", self.name(), status),
            }
        }
    }
}

impl<T: DataType> PortOps for InPort<T> {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> ReturnCode {
        match dataflow_of(profile).as_str() {
            "push" => {
                let providers = self.providers.read().clone();
                let mut published = false;
                for provider in providers {
                    published |= provider.publish_interface(&mut profile.properties);
                }
                if published {
                    ReturnCode::Ok
                } else {
                    log::warn!(
                        "[inport] {}: no provider for '{}'",
                        self.name(),
                        profile.property(keys::INTERFACE_TYPE)
                    );
                    ReturnCode::BadParameter
                }
            }
            "pull" => ReturnCode::Ok,
            other => {
                log::warn!("[inport] {}: unknown dataflow '{}'", self.name(), other);
                ReturnCode::BadParameter
            }
        }
    }

    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> ReturnCode {
        if dataflow_of(profile) != "pull" {
            return ReturnCode::Ok;
        }
        let consumer = Arc::new(OutPortCdrConsumer::new(self.base.orb()));
        if !consumer.subscribe_interface(&profile.properties) {
            return ReturnCode::Error;
        }
        self.pull_sources
            .lock()
            .push((profile.connector_id.clone(), consumer));
        ReturnCode::Ok
    }

    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile) {
        let removed = {
            let mut sources = self.pull_sources.lock();
            sources
                .iter()
                .position(|(id, _)| *id == profile.connector_id)
                .map(|idx| sources.remove(idx))
        };
        if let Some((_, consumer)) = removed {
            consumer.unsubscribe_interface(&profile.properties);
        }
    }

    fn release_endpoints(&self) {
        for provider in self.providers.read().iter() {
            provider.release();
        }
        self.pull_sources.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimedLong;

    #[test]
    fn test_receive_then_read_clears_new() {
        let orb = Arc::new(Orb::new("test"));
        let port = InPort::<TimedLong>::new("in", &orb, &Properties::new());
        assert_eq!(port.read().map(|s| s.data), Err(PortStatus::BufferEmpty));

        port.receive(TimedLong::new(3));
        assert!(port.is_new());
        assert_eq!(port.read().map(|s| s.data), Ok(3));
        assert!(!port.is_new());
    }

    #[test]
    fn test_underflow_supplies_value() {
        let orb = Arc::new(Orb::new("test"));
        let port = InPort::<TimedLong>::new("in", &orb, &Properties::new());
        port.set_hooks(DataHooks::new().on_underflow(|| TimedLong::new(-1)));
        assert_eq!(port.read().map(|s| s.data), Ok(-1));
    }

    #[test]
    fn test_blocking_read_times_out() {
        let orb = Arc::new(Orb::new("test"));
        let props = Properties::from_list(&[keys::READ_BLOCK, "YES", keys::READ_TIMEOUT, "20000", ""]);
        let port = InPort::<TimedLong>::new("in", &orb, &props);
        let started = Instant::now();
        assert_eq!(port.read().map(|s| s.data), Err(PortStatus::BufferTimeout));
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_blocking_read_wakes_on_arrival() {
        let orb = Arc::new(Orb::new("test"));
        let props = Properties::from_list(&[keys::READ_BLOCK, "YES", keys::READ_TIMEOUT, "2000000", ""]);
        let port = InPort::<TimedLong>::new("in", &orb, &props);
        let writer = Arc::clone(&port);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.receive(TimedLong::new(9));
        });
        assert_eq!(port.read().map(|s| s.data), Ok(9));
        handle.join().expect("writer thread");
    }

    #[test]
    fn test_undecodable_push_rejected() {
        let orb = Arc::new(Orb::new("test"));
        let port = InPort::<TimedLong>::new("in", &orb, &Properties::new());
        let sink = InPortSink {
            port: Arc::downgrade(&port),
        };
        assert_eq!(sink.put(&[1, 2]), PortStatus::PortError);
        assert_eq!(sink.put(&TimedLong::new(4).to_cdr()), PortStatus::PortOk);
        assert_eq!(port.read().map(|s| s.data), Ok(4));
    }
}
