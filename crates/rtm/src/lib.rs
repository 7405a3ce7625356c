// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # RTM - RT-Component runtime
//!
//! Hosts long-lived robotics components, drives them through their
//! lifecycle from execution contexts, and wires their data and service
//! ports together at run time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtm::data::TimedLong;
//! use rtm::ec::{ExecutionContext, ExtTrigExecutionContext};
//! use rtm::rtc::{ComponentAction, ExecutionContextHandle, ReturnCode, RtObject};
//! use rtm::broker::Orb;
//! use rtm::Properties;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Counter {
//!     out: Arc<rtm::port::OutPort<TimedLong>>,
//!     n: i32,
//! }
//!
//! impl ComponentAction for Counter {
//!     fn on_execute(&mut self, _ec: ExecutionContextHandle) -> ReturnCode {
//!         self.n += 1;
//!         self.out.write(TimedLong::new(self.n));
//!         ReturnCode::Ok
//!     }
//! }
//!
//! let orb = Arc::new(Orb::new("demo"));
//! let comp = RtObject::with_action(&orb, Properties::from_list(&["instance_name", "counter0", ""]), |rtobj| {
//!     let out = rtobj.add_out_port::<TimedLong>("out", &Properties::new()).expect("port");
//!     Box::new(Counter { out, n: 0 })
//! });
//!
//! let ec = ExtTrigExecutionContext::new(&Properties::new());
//! ec.add_component(&comp);
//! ec.start();
//! ec.activate_component(&comp);
//! ec.tick_wait(Duration::from_secs(1));
//! comp.exit();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Manager: factories, naming, modules, configuration           |
//! +---------------------------------------------------------------+
//! |  RtObject (lifecycle callbacks, ports, configuration sets)    |
//! |  ExecutionContext (periodic / externally triggered)           |
//! +---------------------------------------------------------------+
//! |  Ports: handshake, InPort/OutPort, publishers, buffers        |
//! +---------------------------------------------------------------+
//! |  Broker: object references, servant pool, name service        |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Manager`] | Process orchestrator, creates components from factories |
//! | [`RtObject`] | Component base: lifecycle, ports, configuration |
//! | [`ExecutionContext`] | Drives component state machines and `on_execute` |
//! | [`port::OutPort`] / [`port::InPort`] | Typed data-flow ports |
//! | [`Properties`] | Hierarchical configuration tree |

/// In-process object broker: references, servant pool, name service.
pub mod broker;
/// Bounded sample buffers.
pub mod buffer;
/// CDR encoding for port payloads.
pub mod cdr;
/// Default configuration, file discovery and command line options.
pub mod config;
/// Timed payload types.
pub mod data;
/// Execution contexts.
pub mod ec;
/// Process-level error type.
pub mod error;
/// Logging backend configured from `logger.*`.
pub mod logging;
/// Manager, factories, naming and modules.
pub mod manager;
/// Ports and connection handshake.
pub mod port;
/// Hierarchical key/value configuration.
pub mod properties;
/// Component base and lifecycle.
pub mod rtc;
/// Time arithmetic and the periodic timer.
pub mod time;
/// String and name-value helpers.
pub mod util;

pub use ec::ExecutionContext;
pub use error::{Error, Result};
pub use manager::Manager;
pub use properties::Properties;
pub use rtc::{ComponentAction, LifeCycleState, ReturnCode, RtObject};
