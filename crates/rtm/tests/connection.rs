// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection handshake failures and rollback.

use rtm::broker::Orb;
use rtm::data::TimedLong;
use rtm::port::{
    ConnectorProfile, InterfaceConsumer, OutPortConsumer, PortOps, PortService, PortStatus,
};
use rtm::util::NVList;
use rtm::{Properties, ReturnCode, RtObject};
use std::sync::Arc;

struct ExplodingConsumer;

impl InterfaceConsumer for ExplodingConsumer {
    fn subscribe_interface(&self, _props: &NVList) -> bool {
        panic!("peer rejected subscription");
    }

    fn unsubscribe_interface(&self, _props: &NVList) {}
}

impl OutPortConsumer for ExplodingConsumer {
    fn put(&self, _data: &[u8]) -> PortStatus {
        PortStatus::PortError
    }
}

struct RefusingConsumer;

impl InterfaceConsumer for RefusingConsumer {
    fn subscribe_interface(&self, _props: &NVList) -> bool {
        false
    }

    fn unsubscribe_interface(&self, _props: &NVList) {}
}

impl OutPortConsumer for RefusingConsumer {
    fn put(&self, _data: &[u8]) -> PortStatus {
        PortStatus::PortError
    }
}

fn push_flush(interface: &str) -> Properties {
    Properties::from_list(&[
        "dataport.interface_type", interface,
        "dataport.dataflow_type", "push",
        "dataport.subscription_type", "flush",
        "",
    ])
}

/// Replace the OutPort's `corba_cdr` consumer with `consumer`; the InPort
/// side publishes normally, so the failure happens on the way back.
fn assert_rolled_back(label: &str, consumer: Arc<dyn OutPortConsumer>) {
    let orb = Arc::new(Orb::new(&format!("rollback-{}", label)));
    let a = RtObject::new(&orb, Properties::new());
    let b = RtObject::new(&orb, Properties::new());
    let out = a.add_out_port::<TimedLong>("o", &Properties::new()).expect("out");
    let inp = b.add_in_port::<TimedLong>("i", &Properties::new()).expect("in");
    out.register_consumer_type("corba_cdr", Arc::new(move || Arc::clone(&consumer)));

    let ports = vec![
        out.base().object_ref().expect("out ref"),
        inp.base().object_ref().expect("in ref"),
    ];
    let (rc, _) = out.connect(ConnectorProfile::new("doomed", ports, &push_flush("corba_cdr")));
    assert_eq!(rc, ReturnCode::Error);
    assert!(out.get_connector_profiles().is_empty());
    assert!(inp.get_connector_profiles().is_empty());
    assert_eq!(out.connection_count(), 0);
}

#[test]
fn test_panicking_subscribe_rolls_back_both_ports() {
    assert_rolled_back("exploding", Arc::new(ExplodingConsumer));
}

#[test]
fn test_refused_subscribe_rolls_back_both_ports() {
    assert_rolled_back("refusing", Arc::new(RefusingConsumer));
}

#[test]
fn test_unknown_interface_type_is_rejected() {
    let orb = Arc::new(Orb::new("rollback-unknown"));
    let a = RtObject::new(&orb, Properties::new());
    let b = RtObject::new(&orb, Properties::new());
    let out = a.add_out_port::<TimedLong>("o", &Properties::new()).expect("out");
    let inp = b.add_in_port::<TimedLong>("i", &Properties::new()).expect("in");
    let ports = vec![
        out.base().object_ref().expect("out ref"),
        inp.base().object_ref().expect("in ref"),
    ];
    let (rc, _) = out.connect(ConnectorProfile::new("x", ports, &push_flush("shared_memory")));
    assert_ne!(rc, ReturnCode::Ok);
    assert!(inp.get_connector_profiles().is_empty());
}

#[test]
fn test_bad_port_lists() {
    let orb = Arc::new(Orb::new("rollback-lists"));
    let a = RtObject::new(&orb, Properties::new());
    let b = RtObject::new(&orb, Properties::new());
    let out = a.add_out_port::<TimedLong>("o", &Properties::new()).expect("out");
    let inp = b.add_in_port::<TimedLong>("i", &Properties::new()).expect("in");
    let out_ref = out.base().object_ref().expect("out ref");
    let in_ref = inp.base().object_ref().expect("in ref");

    let (rc, _) = out.connect(ConnectorProfile::new("one", vec![out_ref.clone()], &push_flush("corba_cdr")));
    assert_eq!(rc, ReturnCode::BadParameter);

    let (rc, _) = out.connect(ConnectorProfile::new(
        "dup",
        vec![out_ref.clone(), out_ref.clone()],
        &push_flush("corba_cdr"),
    ));
    assert_eq!(rc, ReturnCode::BadParameter);

    // Must be issued on the first listed port.
    let (rc, _) = out.connect(ConnectorProfile::new("order", vec![in_ref, out_ref], &push_flush("corba_cdr")));
    assert_eq!(rc, ReturnCode::BadParameter);
}
