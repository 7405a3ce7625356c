// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Broker name-value lists and their conversion to [`Properties`].
//!
//! Port and connector profiles carry their negotiated settings as a flat
//! list of `(name, value)` records where the value is a string, a number or
//! an object reference. String entries map one-to-one onto dotted keys of a
//! `Properties` tree.

use crate::broker::ObjectRef;
use crate::Properties;
use std::fmt;

/// Value carried by a [`NameValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum NvValue {
    Str(String),
    Long(i64),
    Double(f64),
    Object(ObjectRef),
}

impl NvValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NvValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            NvValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Display for NvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NvValue::Str(s) => f.write_str(s),
            NvValue::Long(v) => write!(f, "{}", v),
            NvValue::Double(v) => write!(f, "{}", v),
            NvValue::Object(obj) => write!(f, "<object {}>", obj.id()),
        }
    }
}

impl From<&str> for NvValue {
    fn from(s: &str) -> Self {
        NvValue::Str(s.to_string())
    }
}

impl From<String> for NvValue {
    fn from(s: String) -> Self {
        NvValue::Str(s)
    }
}

impl From<i64> for NvValue {
    fn from(v: i64) -> Self {
        NvValue::Long(v)
    }
}

impl From<f64> for NvValue {
    fn from(v: f64) -> Self {
        NvValue::Double(v)
    }
}

impl From<ObjectRef> for NvValue {
    fn from(obj: ObjectRef) -> Self {
        NvValue::Object(obj)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameValue {
    pub name: String,
    pub value: NvValue,
}

pub type NVList = Vec<NameValue>;

pub fn new_nv(name: &str, value: impl Into<NvValue>) -> NameValue {
    NameValue {
        name: name.to_string(),
        value: value.into(),
    }
}

/// Replace `nv` with one string entry per key of `prop`.
pub fn copy_from_properties(nv: &mut NVList, prop: &Properties) {
    nv.clear();
    nv.extend(
        prop.to_pairs()
            .into_iter()
            .map(|(k, v)| new_nv(&k, v)),
    );
}

/// Set every string entry of `nv` into `prop`; other values are skipped.
pub fn copy_to_properties(prop: &mut Properties, nv: &[NameValue]) {
    for entry in nv {
        if let NvValue::Str(value) = &entry.value {
            prop.set_property(&entry.name, value.as_str());
        }
    }
}

pub fn to_properties(nv: &[NameValue]) -> Properties {
    let mut prop = Properties::new();
    copy_to_properties(&mut prop, nv);
    prop
}

pub fn from_properties(prop: &Properties) -> NVList {
    let mut nv = NVList::new();
    copy_from_properties(&mut nv, prop);
    nv
}

pub fn find<'a>(nv: &'a [NameValue], name: &str) -> Option<&'a NvValue> {
    nv.iter().find(|e| e.name == name).map(|e| &e.value)
}

pub fn find_index(nv: &[NameValue], name: &str) -> Option<usize> {
    nv.iter().position(|e| e.name == name)
}

/// Object reference stored under `name`.
pub fn find_object(nv: &[NameValue], name: &str) -> Option<ObjectRef> {
    find(nv, name).and_then(NvValue::as_object).cloned()
}

pub fn is_string(nv: &[NameValue], name: &str) -> bool {
    matches!(find(nv, name), Some(NvValue::Str(_)))
}

pub fn is_string_value(nv: &[NameValue], name: &str, value: &str) -> bool {
    find(nv, name).and_then(NvValue::as_str) == Some(value)
}

/// String value under `name`, or `""`.
pub fn to_string(nv: &[NameValue], name: &str) -> String {
    find(nv, name)
        .and_then(NvValue::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Append `value` to the comma-separated string under `name`, skipping it
/// if already listed. Creates the entry when absent. Returns `false` if
/// the existing entry is not a string.
pub fn append_string_value(nv: &mut NVList, name: &str, value: &str) -> bool {
    let Some(idx) = find_index(nv, name) else {
        nv.push(new_nv(name, value));
        return true;
    };
    let NvValue::Str(current) = &mut nv[idx].value else {
        return false;
    };
    if current.split(',').any(|v| v.trim() == value) {
        return true;
    }
    if current.is_empty() {
        current.push_str(value);
    } else {
        current.push(',');
        current.push_str(value);
    }
    true
}

pub fn append(dest: &mut NVList, src: &[NameValue]) {
    dest.extend_from_slice(src);
}

/// `name: value` lines, for logs.
pub fn dump(nv: &[NameValue]) -> String {
    nv.iter()
        .map(|e| format!("{}: {}", e.name, e.value))
        .collect::<Vec<_>>()
        .join("\n")
}
