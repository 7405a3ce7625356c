// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Push policies driving a consumer from an OutPort buffer.
//!
//! | Policy   | Thread        | `update()`                       |
//! |----------|---------------|----------------------------------|
//! | Flush    | caller        | pushes once, returns its status  |
//! | New      | one worker    | wakes the worker (coalescing)    |
//! | Periodic | one worker    | no-op; worker pushes at the rate |

mod flush;
mod new;
mod periodic;

pub use flush::PublisherFlush;
pub use new::PublisherNew;
pub use periodic::PublisherPeriodic;

use super::{keys, PortStatus};
use crate::Properties;
use std::sync::Arc;

/// What a publisher drives: one push of the current buffer content.
pub trait PushConsumer: Send + Sync {
    fn push(&self) -> PortStatus;
}

impl<F> PushConsumer for F
where
    F: Fn() -> PortStatus + Send + Sync,
{
    fn push(&self) -> PortStatus {
        self()
    }
}

pub trait Publisher: Send + Sync {
    /// Signal that the buffer has new content.
    fn update(&self) -> PortStatus;

    /// Stop any worker. Safe to call more than once.
    fn release(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionType {
    Flush,
    New,
    Periodic,
}

impl SubscriptionType {
    /// Case-insensitive; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flush" => Some(SubscriptionType::Flush),
            "new" => Some(SubscriptionType::New),
            "periodic" => Some(SubscriptionType::Periodic),
            _ => None,
        }
    }
}

/// Build the publisher selected by `dataport.subscription_type`.
///
/// Unknown subscription types, or a worker that cannot be spawned, yield
/// `None`.
pub fn create_publisher(
    consumer: Arc<dyn PushConsumer>,
    props: &Properties,
) -> Option<Arc<dyn Publisher>> {
    let requested = props.get_property(keys::SUBSCRIPTION_TYPE);
    let Some(kind) = SubscriptionType::parse(&requested) else {
        log::warn!("[publisher] unknown subscription type '{}'", requested);
        return None;
    };
    let spawned: std::io::Result<Arc<dyn Publisher>> = match kind {
        SubscriptionType::Flush => Ok(Arc::new(PublisherFlush::new(consumer)) as Arc<dyn Publisher>),
        SubscriptionType::New => {
            PublisherNew::new(consumer).map(|p| Arc::new(p) as Arc<dyn Publisher>)
        }
        SubscriptionType::Periodic => {
            let rate = props.get_property_or(
                keys::PUSH_RATE,
                &props.get_property(keys::PUSH_INTERVAL),
            );
            let hz = rate.trim().parse::<f64>().unwrap_or(0.0);
            PublisherPeriodic::new(consumer, hz).map(|p| Arc::new(p) as Arc<dyn Publisher>)
        }
    };
    match spawned {
        Ok(publisher) => Some(publisher),
        Err(e) => {
            log::error!("[publisher] failed to spawn worker: {}", e);
            None
        }
    }
}
