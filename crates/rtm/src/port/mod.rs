// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ports and the connection engine.
//!
//! A port is a named attachment point of a component. Connecting ports
//! runs a handshake over every port listed in a [`ConnectorProfile`]:
//! each port publishes its endpoints into the profile, forwards it to the
//! next port, then subscribes to its peers' endpoints on the way back.
//!
//! Data ports move typed samples:
//!
//! ```text
//! OutPort::write -> buffer -> Publisher -> consumer --put--> provider -> InPort buffer
//! ```
//!
//! With `dataport.dataflow_type = pull` the direction of the endpoints is
//! reversed and the InPort fetches from the OutPort on `read()`.

mod admin;
mod base;
mod consumer;
mod corba_port;
mod inport;
mod listener;
mod outport;
mod profile;
mod provider;
pub mod publisher;

pub use admin::PortAdmin;
pub use base::{PortBase, PortOps, PortService};
pub use consumer::{
    ConsumerFactory, InPortCdrConsumer, InterfaceConsumer, OutPortCdrConsumer, OutPortConsumer,
};
pub use corba_port::{CorbaConsumer, CorbaPort};
pub use inport::InPort;
pub use listener::{ConnectionHooks, DataHooks};
pub use outport::OutPort;
pub use profile::{
    ConnectorProfile, PortInterfacePolarity, PortInterfaceProfile, PortProfile, PortRef,
};
pub use provider::{InPortCdr, InPortCdrProvider, InterfaceProvider, OutPortCdr, OutPortCdrProvider};

use crate::buffer::{self, BufferBase, BufferKind};
use crate::data::DataType;
use crate::Properties;
use std::fmt;
use std::sync::Arc;

/// Buffer configured by `buffer.type` / `buffer.length`.
pub(crate) fn buffer_for<T: DataType>(props: &Properties) -> Arc<dyn BufferBase<T>> {
    let kind = BufferKind::from_property(&props.get_property(keys::BUFFER_TYPE));
    let length = props
        .get_property(keys::BUFFER_LENGTH)
        .trim()
        .parse()
        .unwrap_or(buffer::DEFAULT_BUFFER_LENGTH);
    buffer::create_buffer(kind, length)
}

/// Lowercased `dataport.dataflow_type` of a connector.
pub(crate) fn dataflow_of(profile: &ConnectorProfile) -> String {
    profile.property(keys::DATAFLOW_TYPE).trim().to_ascii_lowercase()
}

/// Property keys negotiated through connector profiles.
pub mod keys {
    pub const INTERFACE_TYPE: &str = "dataport.interface_type";
    pub const DATAFLOW_TYPE: &str = "dataport.dataflow_type";
    pub const SUBSCRIPTION_TYPE: &str = "dataport.subscription_type";
    pub const DATA_TYPE: &str = "dataport.data_type";
    pub const PUSH_RATE: &str = "dataport.push_rate";
    pub const PUSH_INTERVAL: &str = "dataport.push_interval";
    pub const PORT_TYPE: &str = "port.port_type";
    pub const BUFFER_TYPE: &str = "buffer.type";
    pub const BUFFER_LENGTH: &str = "buffer.length";
    pub const INPORT_REF: &str = "dataport.corba_cdr.inport_ref";
    pub const INPORT_IOR: &str = "dataport.corba_cdr.inport_ior";
    pub const OUTPORT_REF: &str = "dataport.corba_cdr.outport_ref";
    pub const OUTPORT_IOR: &str = "dataport.corba_cdr.outport_ior";
    pub const READ_BLOCK: &str = "readBlock";
    pub const READ_TIMEOUT: &str = "readTimeout";

    /// The only wire encoding shipped with the runtime.
    pub const CORBA_CDR: &str = "corba_cdr";
}

/// Result of data-port operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortStatus {
    PortOk,
    PortError,
    BufferError,
    BufferFull,
    BufferEmpty,
    BufferTimeout,
    SendFull,
    SendTimeout,
    RecvEmpty,
    RecvTimeout,
    InvalidArgs,
    PreconditionNotMet,
    ConnectionLost,
    UnknownError,
}

impl PortStatus {
    pub fn is_ok(self) -> bool {
        self == PortStatus::PortOk
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortStatus::PortOk => "PORT_OK",
            PortStatus::PortError => "PORT_ERROR",
            PortStatus::BufferError => "BUFFER_ERROR",
            PortStatus::BufferFull => "BUFFER_FULL",
            PortStatus::BufferEmpty => "BUFFER_EMPTY",
            PortStatus::BufferTimeout => "BUFFER_TIMEOUT",
            PortStatus::SendFull => "SEND_FULL",
            PortStatus::SendTimeout => "SEND_TIMEOUT",
            PortStatus::RecvEmpty => "RECV_EMPTY",
            PortStatus::RecvTimeout => "RECV_TIMEOUT",
            PortStatus::InvalidArgs => "INVALID_ARGS",
            PortStatus::PreconditionNotMet => "PRECONDITION_NOT_MET",
            PortStatus::ConnectionLost => "CONNECTION_LOST",
            PortStatus::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
