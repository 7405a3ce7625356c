// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named configuration sets and typed parameter bindings.
//!
//! Sets are kept as a property tree `<set>.<param> = value`. Bound
//! parameters are updated from the active set whenever it changes; a value
//! that does not parse leaves the parameter unchanged.

use crate::Properties;
use parking_lot::{RwLock, RwLockReadGuard};
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_SET: &str = "default";

/// Live value of a bound configuration parameter.
pub struct ConfigParam<T> {
    value: Arc<RwLock<T>>,
}

impl<T> Clone for ConfigParam<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Clone> ConfigParam<T> {
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T> ConfigParam<T> {
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.value.read()
    }
}

struct Binding {
    name: String,
    default: String,
    apply: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

pub struct ConfigAdmin {
    sets: RwLock<Properties>,
    active: RwLock<String>,
    bindings: RwLock<Vec<Binding>>,
}

impl ConfigAdmin {
    /// `conf` is the `conf` subtree of the component properties
    /// (`<set>.<param>` keys).
    pub fn new(conf: Properties) -> Self {
        Self {
            sets: RwLock::new(conf),
            active: RwLock::new(DEFAULT_SET.to_string()),
            bindings: RwLock::new(Vec::new()),
        }
    }

    /// Bind `name` to a typed handle initialised from `default`, then from
    /// the active set if it carries a valid value. Returns `None` if the
    /// name is already bound or `default` does not parse.
    pub fn bind_parameter<T>(&self, name: &str, default: &str) -> Option<ConfigParam<T>>
    where
        T: FromStr + Send + Sync + 'static,
    {
        let initial = default.trim().parse::<T>().ok()?;
        let mut bindings = self.bindings.write();
        if bindings.iter().any(|b| b.name == name) {
            return None;
        }
        let value = Arc::new(RwLock::new(initial));
        let target = Arc::clone(&value);
        let apply = Box::new(move |text: &str| match text.trim().parse::<T>() {
            Ok(v) => {
                *target.write() = v;
                true
            }
            Err(_) => false,
        });

        {
            let mut sets = self.sets.write();
            let key = format!("{}.{}", DEFAULT_SET, name);
            if !sets.has_key(&key) {
                sets.set_property(&key, default);
            }
        }
        let binding = Binding {
            name: name.to_string(),
            default: default.to_string(),
            apply,
        };
        self.apply_one(&binding);
        bindings.push(binding);
        Some(ConfigParam { value })
    }

    fn apply_one(&self, binding: &Binding) {
        let key = format!("{}.{}", self.active.read(), binding.name);
        let text = self.sets.read().get_property_or(&key, &binding.default);
        if !(binding.apply)(&text) {
            log::warn!(
                "[config] parameter {}: cannot parse '{}', keeping previous value",
                binding.name,
                text
            );
        }
    }

    /// Push the active set's values into every bound parameter.
    pub fn update(&self) {
        for binding in self.bindings.read().iter() {
            self.apply_one(binding);
        }
    }

    /// Update a single parameter from the active set.
    pub fn update_param(&self, name: &str) -> bool {
        let bindings = self.bindings.read();
        match bindings.iter().find(|b| b.name == name) {
            Some(binding) => {
                self.apply_one(binding);
                true
            }
            None => false,
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.read().iter().any(|b| b.name == name)
    }

    pub fn have_config(&self, set: &str) -> bool {
        self.sets.read().has_key(set)
    }

    pub fn get_active_configuration_set(&self) -> (String, Properties) {
        let name = self.active.read().clone();
        let set = self.get_configuration_set(&name).unwrap_or_default();
        (name, set)
    }

    pub fn get_configuration_set(&self, name: &str) -> Option<Properties> {
        let sets = self.sets.read();
        if sets.has_key(name) {
            Some(sets.subtree(name))
        } else {
            None
        }
    }

    pub fn get_configuration_sets(&self) -> Vec<(String, Properties)> {
        let sets = self.sets.read();
        sets.leaf()
            .iter()
            .map(|node| {
                let name = node.name().to_string();
                let values = sets.subtree(&name.replace('.', "\\."));
                (name, values)
            })
            .collect()
    }

    /// Make `name` active and update bound parameters.
    pub fn activate_configuration_set(&self, name: &str) -> bool {
        if !self.have_config(name) {
            return false;
        }
        *self.active.write() = name.to_string();
        self.update();
        true
    }

    /// `false` if a set with that name exists.
    pub fn add_configuration_set(&self, name: &str, values: &Properties) -> bool {
        let mut sets = self.sets.write();
        if sets.has_key(name) {
            return false;
        }
        let node = sets.get_node_mut(name);
        node.merge(values);
        true
    }

    /// Merge `values` into an existing set.
    pub fn set_configuration_set_values(&self, name: &str, values: &Properties) -> bool {
        {
            let mut sets = self.sets.write();
            if !sets.has_key(name) {
                return false;
            }
            sets.get_node_mut(name).merge(values);
        }
        if *self.active.read() == name {
            self.update();
        }
        true
    }

    /// The active set cannot be removed.
    pub fn remove_configuration_set(&self, name: &str) -> bool {
        if *self.active.read() == name {
            return false;
        }
        self.sets.write().remove_node(name).is_some()
    }
}
