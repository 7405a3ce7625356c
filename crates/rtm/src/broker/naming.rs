// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hierarchical name service.
//!
//! Names are sequences of `(id, kind)` components, written as
//! `id.kind/id.kind/...`. The kind is the part after the last dot of a
//! component and may be empty.

use super::{BrokerError, ObjectRef};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;

/// One component of a hierarchical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameComponent {
    pub id: String,
    pub kind: String,
}

impl NameComponent {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}.{}", self.id, self.kind)
        }
    }
}

/// Parse `id.kind/id.kind` into components.
pub fn parse_name(text: &str) -> Result<Vec<NameComponent>, BrokerError> {
    let text = text.trim().trim_matches('/');
    if text.is_empty() {
        return Err(BrokerError::InvalidName(text.to_string()));
    }
    text.split('/')
        .map(|part| {
            if part.is_empty() {
                return Err(BrokerError::InvalidName(text.to_string()));
            }
            Ok(match part.rsplit_once('.') {
                Some((id, kind)) => NameComponent::new(id, kind),
                None => NameComponent::new(part, ""),
            })
        })
        .collect()
}

/// Inverse of [`parse_name`].
pub fn format_name(name: &[NameComponent]) -> String {
    name.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    Object,
    Context,
}

/// Entry returned by [`NamingService::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: NameComponent,
    pub binding_type: BindingType,
}

/// Name-service contract.
///
/// Intermediate components of a name must be bound contexts; the last
/// component addresses the object or context being operated on.
pub trait NamingService: Send + Sync {
    fn bind(&self, name: &[NameComponent], obj: ObjectRef) -> Result<(), BrokerError>;

    fn rebind(&self, name: &[NameComponent], obj: ObjectRef) -> Result<(), BrokerError>;

    fn bind_new_context(&self, name: &[NameComponent]) -> Result<(), BrokerError>;

    fn resolve(&self, name: &[NameComponent]) -> Result<ObjectRef, BrokerError>;

    fn unbind(&self, name: &[NameComponent]) -> Result<(), BrokerError>;

    /// Bindings of the context at `name` (empty slice = root).
    fn list(&self, name: &[NameComponent]) -> Result<Vec<Binding>, BrokerError>;

    /// `rebind`, creating missing intermediate contexts first.
    fn rebind_recursive(&self, name: &[NameComponent], obj: ObjectRef) -> Result<(), BrokerError> {
        if name.is_empty() {
            return Err(BrokerError::InvalidName(String::new()));
        }
        for depth in 1..name.len() {
            match self.bind_new_context(&name[..depth]) {
                Ok(()) | Err(BrokerError::AlreadyBound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.rebind(name, obj)
    }

    fn resolve_str(&self, name: &str) -> Result<ObjectRef, BrokerError> {
        self.resolve(&parse_name(name)?)
    }
}

#[derive(Debug, Default)]
struct Context {
    entries: BTreeMap<NameComponent, Entry>,
}

#[derive(Debug)]
enum Entry {
    Object(ObjectRef),
    Context(Context),
}

impl Context {
    fn context(&self, path: &[NameComponent]) -> Result<&Context, BrokerError> {
        let mut ctx = self;
        for component in path {
            ctx = match ctx.entries.get(component) {
                Some(Entry::Context(next)) => next,
                _ => return Err(BrokerError::NotFound(component.to_string())),
            };
        }
        Ok(ctx)
    }

    fn context_mut(&mut self, path: &[NameComponent]) -> Result<&mut Context, BrokerError> {
        let mut ctx = self;
        for component in path {
            ctx = match ctx.entries.get_mut(component) {
                Some(Entry::Context(next)) => next,
                _ => return Err(BrokerError::NotFound(component.to_string())),
            };
        }
        Ok(ctx)
    }
}

struct State {
    available: bool,
    root: Context,
}

/// Name service held in memory.
///
/// Can be taken down and brought back to exercise re-registration: while
/// down every call fails with `Unavailable`, and a restart starts from an
/// empty tree.
pub struct InMemoryNamingService {
    state: RwLock<State>,
}

fn split_last(name: &[NameComponent]) -> Result<(&[NameComponent], &NameComponent), BrokerError> {
    match name.split_last() {
        Some((last, parent)) => Ok((parent, last)),
        None => Err(BrokerError::InvalidName(String::new())),
    }
}

impl InMemoryNamingService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                available: true,
                root: Context::default(),
            }),
        }
    }

    pub fn shutdown(&self) {
        let mut state = self.state.write();
        state.available = false;
        state.root = Context::default();
        log::debug!("[naming] in-memory name service down");
    }

    pub fn restart(&self) {
        let mut state = self.state.write();
        state.available = true;
        state.root = Context::default();
        log::debug!("[naming] in-memory name service up");
    }

    pub fn is_available(&self) -> bool {
        self.state.read().available
    }

    fn insert(&self, name: &[NameComponent], entry: Entry, replace: bool) -> Result<(), BrokerError> {
        let (parent, last) = split_last(name)?;
        let mut state = self.state.write();
        if !state.available {
            return Err(BrokerError::Unavailable);
        }
        let ctx = state.root.context_mut(parent)?;
        if !replace && ctx.entries.contains_key(last) {
            return Err(BrokerError::AlreadyBound(format_name(name)));
        }
        ctx.entries.insert(last.clone(), entry);
        Ok(())
    }
}

impl Default for InMemoryNamingService {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingService for InMemoryNamingService {
    fn bind(&self, name: &[NameComponent], obj: ObjectRef) -> Result<(), BrokerError> {
        self.insert(name, Entry::Object(obj), false)
    }

    fn rebind(&self, name: &[NameComponent], obj: ObjectRef) -> Result<(), BrokerError> {
        self.insert(name, Entry::Object(obj), true)
    }

    fn bind_new_context(&self, name: &[NameComponent]) -> Result<(), BrokerError> {
        self.insert(name, Entry::Context(Context::default()), false)
    }

    fn resolve(&self, name: &[NameComponent]) -> Result<ObjectRef, BrokerError> {
        let (parent, last) = split_last(name)?;
        let state = self.state.read();
        if !state.available {
            return Err(BrokerError::Unavailable);
        }
        match state.root.context(parent)?.entries.get(last) {
            Some(Entry::Object(obj)) => Ok(obj.clone()),
            _ => Err(BrokerError::NotFound(format_name(name))),
        }
    }

    fn unbind(&self, name: &[NameComponent]) -> Result<(), BrokerError> {
        let (parent, last) = split_last(name)?;
        let mut state = self.state.write();
        if !state.available {
            return Err(BrokerError::Unavailable);
        }
        state
            .root
            .context_mut(parent)?
            .entries
            .remove(last)
            .map(|_| ())
            .ok_or_else(|| BrokerError::NotFound(format_name(name)))
    }

    fn list(&self, name: &[NameComponent]) -> Result<Vec<Binding>, BrokerError> {
        let state = self.state.read();
        if !state.available {
            return Err(BrokerError::Unavailable);
        }
        Ok(state
            .root
            .context(name)?
            .entries
            .iter()
            .map(|(component, entry)| Binding {
                name: component.clone(),
                binding_type: match entry {
                    Entry::Object(_) => BindingType::Object,
                    Entry::Context(_) => BindingType::Context,
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Poa;

    #[test]
    fn test_parse_and_format() {
        let name = parse_name("host.example.host/comp0.rtc").expect("parse");
        assert_eq!(name[0], NameComponent::new("host.example", "host"));
        assert_eq!(name[1], NameComponent::new("comp0", "rtc"));
        assert_eq!(format_name(&name), "host.example.host/comp0.rtc");
        assert!(parse_name("").is_err());
        assert!(parse_name("a//b").is_err());
        assert_eq!(parse_name("plain").expect("parse")[0].kind, "");
    }

    #[test]
    fn test_bind_resolve_unbind() {
        let poa = Poa::new();
        let obj = poa.activate_object("IDL:Test:1.0", 1u8);
        let ns = InMemoryNamingService::new();
        let name = parse_name("ctx.host/obj.rtc").expect("parse");

        assert!(matches!(ns.bind(&name, obj.clone()), Err(BrokerError::NotFound(_))));
        ns.rebind_recursive(&name, obj.clone()).expect("rebind_recursive");
        assert_eq!(ns.resolve(&name).expect("resolve"), obj);
        assert!(matches!(
            ns.bind(&name, obj.clone()),
            Err(BrokerError::AlreadyBound(_))
        ));

        let root = ns.list(&[]).expect("list root");
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].binding_type, BindingType::Context);

        ns.unbind(&name).expect("unbind");
        assert!(ns.resolve(&name).is_err());
    }

    #[test]
    fn test_shutdown_and_restart() {
        let poa = Poa::new();
        let obj = poa.activate_object("IDL:Test:1.0", 1u8);
        let ns = InMemoryNamingService::new();
        let name = parse_name("obj.rtc").expect("parse");
        ns.bind(&name, obj.clone()).expect("bind");

        ns.shutdown();
        assert_eq!(ns.resolve(&name), Err(BrokerError::Unavailable));
        assert_eq!(ns.rebind(&name, obj.clone()), Err(BrokerError::Unavailable));

        ns.restart();
        assert!(matches!(ns.resolve(&name), Err(BrokerError::NotFound(_))));
        ns.rebind(&name, obj.clone()).expect("rebind after restart");
        assert_eq!(ns.resolve_str("obj.rtc").expect("resolve"), obj);
    }
}
