// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Servant-activation pool.

use super::{ObjectId, ObjectRef};
use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Table of active servants keyed by object id.
///
/// The pool shares ownership of every servant with the references it hands
/// out, so deactivating an object never invalidates a call already in
/// flight.
pub struct Poa {
    objects: DashMap<ObjectId, ObjectRef>,
    next_id: AtomicU64,
}

impl Poa {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Activate `servant` under a fresh id and return its reference.
    pub fn activate_object<S>(&self, repository_id: &str, servant: S) -> ObjectRef
    where
        S: Any + Send + Sync,
    {
        let id = ObjectId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let obj = ObjectRef::new(id, repository_id, servant);
        self.objects.insert(id, obj.clone());
        log::trace!("[poa] activated {} ({})", id, repository_id);
        obj
    }

    pub fn id_to_reference(&self, id: ObjectId) -> Option<ObjectRef> {
        self.objects.get(&id).map(|entry| entry.value().clone())
    }

    /// Id of an activated `Arc<T>` servant, by pointer identity.
    pub fn servant_to_id<T>(&self, servant: &Arc<T>) -> Option<ObjectId>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.objects.iter().find_map(|entry| {
            entry
                .value()
                .narrow::<Arc<T>>()
                .filter(|candidate| Arc::ptr_eq(candidate, servant))
                .map(|_| *entry.key())
        })
    }

    /// Remove the servant; outstanding references start failing with
    /// `ObjectNotExist`. Returns `false` if the id was not active.
    pub fn deactivate_object(&self, id: ObjectId) -> bool {
        match self.objects.remove(&id) {
            Some((_, obj)) => {
                obj.deactivate();
                log::trace!("[poa] deactivated {}", id);
                true
            }
            None => false,
        }
    }

    /// Deactivate everything (broker shutdown).
    pub fn deactivate_all(&self) {
        let ids: Vec<ObjectId> = self.objects.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.deactivate_object(id);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for Poa {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_resolve_deactivate() {
        let poa = Poa::new();
        let servant = Arc::new(42u32);
        let obj = poa.activate_object("IDL:Test/Value:1.0", Arc::clone(&servant));

        assert_eq!(poa.id_to_reference(obj.id()), Some(obj.clone()));
        assert_eq!(poa.servant_to_id(&servant), Some(obj.id()));

        assert!(poa.deactivate_object(obj.id()));
        assert!(!obj.is_active());
        assert!(obj.ensure_active().is_err());
        assert!(poa.id_to_reference(obj.id()).is_none());
        assert!(!poa.deactivate_object(obj.id()));

        // The reference still holds the servant.
        assert_eq!(obj.narrow::<Arc<u32>>().map(|v| *v), Some(42));
    }

    #[test]
    fn test_ids_are_unique() {
        let poa = Poa::new();
        let a = poa.activate_object("IDL:A:1.0", 1u8);
        let b = poa.activate_object("IDL:A:1.0", 1u8);
        assert_ne!(a.id(), b.id());
        assert_eq!(poa.len(), 2);
        poa.deactivate_all();
        assert!(poa.is_empty());
    }
}
