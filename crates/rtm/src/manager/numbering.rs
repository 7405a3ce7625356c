// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instance-name suffix allocation.

use crate::rtc::RtObject;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Chooses the suffix appended to a component's type name.
pub trait NumberingPolicy: Send + Sync {
    /// Allocate a suffix for `obj`.
    fn on_create(&self, obj: &Arc<RtObject>) -> String;
    /// Release the suffix held by `obj`. Unknown objects are ignored.
    fn on_delete(&self, obj: &Arc<RtObject>);
}

/// Numbers objects `0, 1, 2, ...`, reusing the lowest freed slot first.
#[derive(Default)]
pub struct DefaultNumberingPolicy {
    slots: Mutex<Vec<Option<Weak<RtObject>>>>,
}

impl DefaultNumberingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (allocated) slots.
    pub fn live(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }
}

impl NumberingPolicy for DefaultNumberingPolicy {
    fn on_create(&self, obj: &Arc<RtObject>) -> String {
        let mut slots = self.slots.lock();
        let weak = Arc::downgrade(obj);
        if let Some(idx) = slots.iter().position(|s| s.as_ref().is_some_and(|w| w.ptr_eq(&weak))) {
            return idx.to_string();
        }
        let idx = match slots.iter().position(Option::is_none) {
            Some(free) => {
                slots[free] = Some(weak);
                free
            }
            None => {
                slots.push(Some(weak));
                slots.len() - 1
            }
        };
        idx.to_string()
    }

    fn on_delete(&self, obj: &Arc<RtObject>) {
        let weak = Arc::downgrade(obj);
        let mut slots = self.slots.lock();
        if let Some(slot) = slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|w| w.ptr_eq(&weak)))
        {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Orb;
    use crate::Properties;
    use std::collections::HashSet;

    fn component(orb: &Arc<Orb>) -> Arc<RtObject> {
        RtObject::new(orb, Properties::new())
    }

    #[test]
    fn test_first_free_slot_wins() {
        let orb = Arc::new(Orb::new("numbering"));
        let policy = DefaultNumberingPolicy::new();
        let a = component(&orb);
        let b = component(&orb);
        let c = component(&orb);
        assert_eq!(policy.on_create(&a), "0");
        assert_eq!(policy.on_create(&b), "1");
        assert_eq!(policy.on_create(&c), "2");

        policy.on_delete(&b);
        policy.on_delete(&a);
        let d = component(&orb);
        assert_eq!(policy.on_create(&d), "0");
        let e = component(&orb);
        assert_eq!(policy.on_create(&e), "1");
        assert_eq!(policy.live(), 4);
    }

    #[test]
    fn test_random_interleaving_never_duplicates() {
        let orb = Arc::new(Orb::new("numbering-random"));
        let policy = DefaultNumberingPolicy::new();
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let mut live: Vec<(Arc<RtObject>, usize)> = Vec::new();

        for _ in 0..500 {
            if live.is_empty() || rng.u8(..) < 160 {
                let obj = component(&orb);
                let suffix: usize = policy.on_create(&obj).parse().expect("numeric suffix");
                live.push((obj, suffix));
            } else {
                let (obj, _) = live.swap_remove(rng.usize(..live.len()));
                policy.on_delete(&obj);
            }
            let suffixes: HashSet<usize> = live.iter().map(|(_, s)| *s).collect();
            assert_eq!(suffixes.len(), live.len(), "duplicate suffix among live objects");
        }
    }
}
