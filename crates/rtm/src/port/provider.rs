// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side data endpoints.
//!
//! A provider owns an activated servant and advertises it in connector
//! profiles: `publish_interface_profile` describes what it supports, and
//! `publish_interface` appends its reference when the requested interface
//! type matches.

use super::{keys, PortStatus};
use crate::broker::{ObjectRef, Orb};
use crate::util::nvutil::{self, NVList};
use std::sync::Arc;

pub const INPORT_CDR_REPOSITORY_ID: &str = "IDL:RTC/InPortCdr:1.0";
pub const OUTPORT_CDR_REPOSITORY_ID: &str = "IDL:RTC/OutPortCdr:1.0";

/// Wire interface of a push-receiving InPort.
pub trait InPortCdr: Send + Sync {
    fn put(&self, data: &[u8]) -> PortStatus;
}

/// Wire interface of a pull-serving OutPort.
pub trait OutPortCdr: Send + Sync {
    fn get(&self) -> Result<Vec<u8>, PortStatus>;
}

/// One interface variant offered by a port.
pub trait InterfaceProvider: Send + Sync {
    fn interface_type(&self) -> &str;

    fn dataflow_type(&self) -> &str;

    /// Comma-separated subscription types.
    fn subscription_types(&self) -> &str;

    /// Append the supported capability triple.
    fn publish_interface_profile(&self, props: &mut NVList) {
        nvutil::append_string_value(props, keys::INTERFACE_TYPE, self.interface_type());
        nvutil::append_string_value(props, keys::DATAFLOW_TYPE, self.dataflow_type());
        for sub in self.subscription_types().split(',') {
            nvutil::append_string_value(props, keys::SUBSCRIPTION_TYPE, sub.trim());
        }
    }

    /// Append this endpoint's reference if `props` asks for this interface
    /// type and dataflow. Returns `true` if something was appended.
    fn publish_interface(&self, props: &mut NVList) -> bool;

    /// Deactivate the servant.
    fn release(&self) {}
}

fn requested(props: &NVList, dataflow: &str) -> bool {
    nvutil::is_string_value(props, keys::INTERFACE_TYPE, keys::CORBA_CDR)
        && nvutil::to_string(props, keys::DATAFLOW_TYPE).eq_ignore_ascii_case(dataflow)
}

/// Push endpoint of an InPort.
pub struct InPortCdrProvider {
    orb: Arc<Orb>,
    obj: ObjectRef,
}

impl InPortCdrProvider {
    pub fn new(orb: &Arc<Orb>, servant: Arc<dyn InPortCdr>) -> Self {
        let obj = orb.poa().activate_object(INPORT_CDR_REPOSITORY_ID, servant);
        Self {
            orb: Arc::clone(orb),
            obj,
        }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.obj
    }
}

impl InterfaceProvider for InPortCdrProvider {
    fn interface_type(&self) -> &str {
        keys::CORBA_CDR
    }

    fn dataflow_type(&self) -> &str {
        "push"
    }

    fn subscription_types(&self) -> &str {
        "flush,new,periodic"
    }

    fn publish_interface(&self, props: &mut NVList) -> bool {
        if !requested(props, "push") {
            return false;
        }
        props.push(nvutil::new_nv(keys::INPORT_REF, self.obj.clone()));
        props.push(nvutil::new_nv(keys::INPORT_IOR, self.orb.object_to_string(&self.obj)));
        true
    }

    fn release(&self) {
        self.orb.poa().deactivate_object(self.obj.id());
    }
}

/// Pull endpoint of an OutPort.
pub struct OutPortCdrProvider {
    orb: Arc<Orb>,
    obj: ObjectRef,
}

impl OutPortCdrProvider {
    pub fn new(orb: &Arc<Orb>, servant: Arc<dyn OutPortCdr>) -> Self {
        let obj = orb.poa().activate_object(OUTPORT_CDR_REPOSITORY_ID, servant);
        Self {
            orb: Arc::clone(orb),
            obj,
        }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.obj
    }
}

impl InterfaceProvider for OutPortCdrProvider {
    fn interface_type(&self) -> &str {
        keys::CORBA_CDR
    }

    fn dataflow_type(&self) -> &str {
        "pull"
    }

    fn subscription_types(&self) -> &str {
        "flush"
    }

    fn publish_interface(&self, props: &mut NVList) -> bool {
        if !requested(props, "pull") {
            return false;
        }
        props.push(nvutil::new_nv(keys::OUTPORT_REF, self.obj.clone()));
        props.push(nvutil::new_nv(keys::OUTPORT_IOR, self.orb.object_to_string(&self.obj)));
        true
    }

    fn release(&self) {
        self.orb.poa().deactivate_object(self.obj.id());
    }
}
