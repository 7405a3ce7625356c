// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Location-transparent object references.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifier assigned by the servant-activation pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse the `{:016x}` form produced by `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        u64::from_str_radix(text, 16).ok().map(Self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

struct ObjectEntry {
    id: ObjectId,
    repository_id: String,
    servant: Arc<dyn Any + Send + Sync>,
    active: AtomicBool,
}

/// Reference to an activated servant.
///
/// Cloning is cheap. Holding a reference keeps the servant alive even
/// after deactivation; calls through a deactivated reference must fail
/// with `ObjectNotExist` (see [`ObjectRef::ensure_active`]).
#[derive(Clone)]
pub struct ObjectRef {
    entry: Arc<ObjectEntry>,
}

impl ObjectRef {
    pub(crate) fn new<S>(id: ObjectId, repository_id: &str, servant: S) -> Self
    where
        S: Any + Send + Sync,
    {
        Self {
            entry: Arc::new(ObjectEntry {
                id,
                repository_id: repository_id.to_string(),
                servant: Arc::new(servant),
                active: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.entry.id
    }

    /// Interface repository id, e.g. `IDL:RTC/InPortCdr:1.0`.
    pub fn repository_id(&self) -> &str {
        &self.entry.repository_id
    }

    /// Recover the typed servant handle the object was activated with.
    pub fn narrow<T>(&self) -> Option<T>
    where
        T: Any + Clone,
    {
        self.entry.servant.downcast_ref::<T>().cloned()
    }

    pub fn is_active(&self) -> bool {
        self.entry.active.load(Ordering::Acquire)
    }

    /// `Err(ObjectNotExist)` once the servant has been deactivated.
    pub fn ensure_active(&self) -> Result<(), super::BrokerError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(super::BrokerError::ObjectNotExist(self.entry.id.to_string()))
        }
    }

    pub(crate) fn deactivate(&self) {
        self.entry.active.store(false, Ordering::Release);
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.entry.id == other.entry.id
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("id", &self.entry.id)
            .field("repository_id", &self.entry.repository_id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_narrow_to_trait_handle() {
        let servant: Arc<dyn Greeter> = Arc::new(Hello);
        let obj = ObjectRef::new(ObjectId::new(1), "IDL:Test/Greeter:1.0", servant);
        let greeter = obj.narrow::<Arc<dyn Greeter>>().expect("narrow to Greeter");
        assert_eq!(greeter.greet(), "hello");
        assert!(obj.narrow::<String>().is_none());
    }

    #[test]
    fn test_equality_by_id() {
        let a = ObjectRef::new(ObjectId::new(7), "IDL:A:1.0", 1u32);
        let b = ObjectRef::new(ObjectId::new(7), "IDL:B:1.0", 2u32);
        let c = ObjectRef::new(ObjectId::new(8), "IDL:A:1.0", 1u32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_object_id_text_form() {
        let id = ObjectId::new(0xabc);
        assert_eq!(ObjectId::parse(&id.to_string()), Some(id));
        assert_eq!(ObjectId::parse("zz"), None);
    }
}
