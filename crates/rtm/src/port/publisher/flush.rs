// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{Publisher, PushConsumer};
use crate::port::PortStatus;
use std::sync::Arc;

/// Pushes synchronously on the writer's thread.
pub struct PublisherFlush {
    consumer: Arc<dyn PushConsumer>,
}

impl PublisherFlush {
    pub fn new(consumer: Arc<dyn PushConsumer>) -> Self {
        Self { consumer }
    }
}

impl Publisher for PublisherFlush {
    fn update(&self) -> PortStatus {
        self.consumer.push()
    }

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_update_pushes_exactly_once() {
        let pushes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pushes);
        let publisher = PublisherFlush::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            PortStatus::SendFull
        }));
        for expected in 1..=3 {
            assert_eq!(publisher.update(), PortStatus::SendFull);
            assert_eq!(pushes.load(Ordering::SeqCst), expected);
        }
    }
}
