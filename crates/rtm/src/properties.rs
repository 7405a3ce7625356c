// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hierarchical dotted-key configuration tree.
//!
//! `a.b.c` addresses node `c` under `b` under `a`. Every node carries a
//! string value, an optional default, and an ordered list of children.
//! Keys are case-sensitive and values are stored verbatim.
//!
//! # Example
//!
//! ```
//! use rtm::Properties;
//!
//! let mut prop = Properties::from_list(&[
//!     "naming.formats", "%h.host/%n.rtc",
//!     "timer.tick", "0.1",
//!     "",
//! ]);
//! prop.set_property("naming.update.enable", "YES");
//!
//! assert_eq!(prop.get_property("timer.tick"), "0.1");
//! assert_eq!(prop.get_node("naming").map(|n| n.leaf().len()), Some(2));
//! ```

use std::fmt;

/// One node of the property tree (the root node has an empty name).
///
/// Equality compares effective values: a key set explicitly and the same
/// key holding only a default of that value are equal.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    name: String,
    value: String,
    default_value: String,
    leaf: Vec<Properties>,
}

/// Split a dotted key, honouring `\.` as a literal dot.
fn split_key(key: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn escape_component(name: &str) -> String {
    name.replace('.', "\\.")
}

impl Properties {
    /// Empty root node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Named node with a value (used for subtrees).
    pub fn with_name(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Build from `["k1", "v1", "k2", "v2", ..., ""]`.
    ///
    /// Reading stops at the first empty key or at an unpaired trailing key.
    pub fn from_list(list: &[&str]) -> Self {
        let mut prop = Self::new();
        let mut iter = list.chunks(2);
        for pair in &mut iter {
            if pair.len() < 2 || pair[0].is_empty() {
                break;
            }
            prop.set_property(pair[0], pair[1]);
        }
        prop
    }

    /// Build with every listed pair installed as a default value.
    pub fn from_defaults(list: &[&str]) -> Self {
        let mut prop = Self::new();
        prop.set_defaults(list);
        prop
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn effective_value(&self) -> &str {
        if self.value.is_empty() {
            &self.default_value
        } else {
            &self.value
        }
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Children in insertion order.
    pub fn leaf(&self) -> &[Properties] {
        &self.leaf
    }

    fn find_child(&self, name: &str) -> Option<&Properties> {
        self.leaf.iter().find(|p| p.name == name)
    }

    fn child_mut_or_insert(&mut self, name: &str) -> &mut Properties {
        let idx = match self.leaf.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                self.leaf.push(Properties::with_name(name, ""));
                self.leaf.len() - 1
            }
        };
        &mut self.leaf[idx]
    }

    /// Node at `key`, if present.
    pub fn get_node(&self, key: &str) -> Option<&Properties> {
        let mut node = self;
        for part in split_key(key) {
            node = node.find_child(&part)?;
        }
        Some(node)
    }

    /// Node at `key`, creating intermediate nodes as needed.
    pub fn get_node_mut(&mut self, key: &str) -> &mut Properties {
        let mut node = self;
        for part in split_key(key) {
            node = node.child_mut_or_insert(&part);
        }
        node
    }

    /// Value at `key`; falls back to the node default, then to `""`.
    pub fn get_property(&self, key: &str) -> String {
        self.get_property_or(key, "")
    }

    /// Value at `key`, or `default` when the key is absent or has neither a
    /// value nor a default.
    pub fn get_property_or(&self, key: &str, default: &str) -> String {
        match self.get_node(key) {
            Some(node) if !node.value.is_empty() => node.value.clone(),
            Some(node) if !node.default_value.is_empty() => node.default_value.clone(),
            _ => default.to_string(),
        }
    }

    /// Set `key` to `value`, returning the previous value.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) -> String {
        let node = self.get_node_mut(key);
        std::mem::replace(&mut node.value, value.into())
    }

    /// Set the default for `key`, returning the previous default.
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) -> String {
        let node = self.get_node_mut(key);
        std::mem::replace(&mut node.default_value, value.into())
    }

    /// Install defaults from a `["k", "v", ..., ""]` list.
    pub fn set_defaults(&mut self, list: &[&str]) {
        for pair in list.chunks(2) {
            if pair.len() < 2 || pair[0].is_empty() {
                break;
            }
            self.set_default(pair[0], pair[1]);
        }
    }

    /// Copy of the children of `key` as a root-level tree (empty if the
    /// key is absent).
    pub fn subtree(&self, key: &str) -> Properties {
        match self.get_node(key) {
            Some(node) => Properties {
                leaf: node.leaf.clone(),
                ..Properties::default()
            },
            None => Properties::default(),
        }
    }

    /// `true` if a node exists at `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.get_node(key).is_some()
    }

    /// Detach and return the subtree at `key`.
    pub fn remove_node(&mut self, key: &str) -> Option<Properties> {
        let mut parts = split_key(key);
        let last = parts.pop()?;
        let mut node = self;
        for part in parts {
            let idx = node.leaf.iter().position(|p| p.name == part)?;
            node = &mut node.leaf[idx];
        }
        let idx = node.leaf.iter().position(|p| p.name == last)?;
        Some(node.leaf.remove(idx))
    }

    /// Full keys of every leaf and of every inner node carrying a value,
    /// in tree order.
    pub fn property_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for child in &self.leaf {
            child.collect_names(&escape_component(&child.name), &mut names);
        }
        names
    }

    fn collect_names(&self, prefix: &str, names: &mut Vec<String>) {
        if self.leaf.is_empty() || !self.value.is_empty() || !self.default_value.is_empty() {
            names.push(prefix.to_string());
        }
        for child in &self.leaf {
            let key = format!("{}.{}", prefix, escape_component(&child.name));
            child.collect_names(&key, names);
        }
    }

    /// Number of keys reported by [`property_names`](Self::property_names).
    pub fn size(&self) -> usize {
        self.property_names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf.is_empty()
    }

    /// Overlay every key of `other` onto `self`.
    pub fn merge(&mut self, other: &Properties) {
        for key in other.property_names() {
            let value = other.get_property(&key);
            self.set_property(&key, value);
        }
    }

    /// `(key, value)` pairs for every reported key.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.property_names()
            .into_iter()
            .map(|k| {
                let v = self.get_property(&k);
                (k, v)
            })
            .collect()
    }

    /// Flattened `["k1", "v1", ...]` form (without terminator).
    pub fn to_list(&self) -> Vec<String> {
        self.to_pairs()
            .into_iter()
            .flat_map(|(k, v)| [k, v])
            .collect()
    }

    /// Parse configuration text (`key: value` lines, `#` comments,
    /// trailing `\` continues the value) into this tree.
    pub fn load(&mut self, text: &str) {
        let mut pending = String::new();
        for raw in text.lines() {
            let line = raw.trim();
            if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }
            if let Some(stripped) = line.strip_suffix('\\') {
                pending.push_str(stripped.trim_end());
                continue;
            }
            pending.push_str(line);
            let entry = std::mem::take(&mut pending);
            self.load_entry(&entry);
        }
        if !pending.is_empty() {
            self.load_entry(&pending);
        }
    }

    fn load_entry(&mut self, entry: &str) {
        let sep = entry.find([':', '=']);
        let (key, value) = match sep {
            Some(idx) => (entry[..idx].trim(), entry[idx + 1..].trim()),
            None => (entry.trim(), ""),
        };
        if key.is_empty() {
            return;
        }
        self.set_property(key, value);
    }

    /// Serialize to configuration text.
    pub fn store(&self) -> String {
        let mut out = String::new();
        for (k, v) in self.to_pairs() {
            out.push_str(&k);
            out.push_str(": ");
            out.push_str(&v);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.store())
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name || self.effective_value() != other.effective_value() {
            return false;
        }
        let mut lhs = self.to_pairs();
        let mut rhs = other.to_pairs();
        lhs.sort();
        rhs.sort();
        lhs == rhs
    }
}

impl Eq for Properties {}
