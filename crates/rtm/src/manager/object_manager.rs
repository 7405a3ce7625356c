// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Keyed, thread-safe object registry.
//!
//! The key of an entry is computed by the key function given at
//! construction (instance name for components, type name for factories).
//! Mutations hold the registry lock for their full duration; iteration
//! works on a snapshot so callers may call back into the registry.

use parking_lot::Mutex;

pub struct ObjectManager<T> {
    objects: Mutex<Vec<T>>,
    key_of: fn(&T) -> String,
}

impl<T: Clone> ObjectManager<T> {
    pub fn new(key_of: fn(&T) -> String) -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            key_of,
        }
    }

    /// Insert `obj`. `false` if an object with the same key exists.
    pub fn register(&self, obj: T) -> bool {
        let key = (self.key_of)(&obj);
        let mut objects = self.objects.lock();
        if objects.iter().any(|o| (self.key_of)(o) == key) {
            return false;
        }
        objects.push(obj);
        true
    }

    pub fn unregister(&self, key: &str) -> Option<T> {
        let mut objects = self.objects.lock();
        let idx = objects.iter().position(|o| (self.key_of)(o) == key)?;
        Some(objects.remove(idx))
    }

    pub fn find(&self, key: &str) -> Option<T> {
        self.objects
            .lock()
            .iter()
            .find(|o| (self.key_of)(o) == key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().iter().any(|o| (self.key_of)(o) == key)
    }

    /// Snapshot in registration order.
    pub fn objects(&self) -> Vec<T> {
        self.objects.lock().clone()
    }

    pub fn for_each<F: FnMut(&T)>(&self, mut f: F) {
        for obj in self.objects() {
            f(&obj);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}
