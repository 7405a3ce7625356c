// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callback hooks invoked by ports.
//!
//! Hooks are plain closures stored per port. Each one has exactly one call
//! site, and no port lock is held while it runs.

use super::ConnectorProfile;
use std::sync::Arc;

pub type ConnectorHook = Arc<dyn Fn(&ConnectorProfile) + Send + Sync>;

/// Fired when a connector is stored in or erased from a port.
#[derive(Clone, Default)]
pub struct ConnectionHooks {
    pub on_connect: Option<ConnectorHook>,
    pub on_disconnect: Option<ConnectorHook>,
}

impl ConnectionHooks {
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectorProfile) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectorProfile) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(f));
        self
    }
}

type SampleHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ConvertHook<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
type UnderflowHook<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Sample-level hooks of a data port.
///
/// Convert hooks run before the plain hooks, and their return value is the
/// sample that gets stored or returned.
pub struct DataHooks<T> {
    pub on_write: Option<SampleHook<T>>,
    pub on_write_convert: Option<ConvertHook<T>>,
    pub on_overflow: Option<SampleHook<T>>,
    pub on_read: Option<SampleHook<T>>,
    pub on_read_convert: Option<ConvertHook<T>>,
    /// Supplies a substitute sample when a read finds nothing.
    pub on_underflow: Option<UnderflowHook<T>>,
}

impl<T> Default for DataHooks<T> {
    fn default() -> Self {
        Self {
            on_write: None,
            on_write_convert: None,
            on_overflow: None,
            on_read: None,
            on_read_convert: None,
            on_underflow: None,
        }
    }
}

impl<T> Clone for DataHooks<T> {
    fn clone(&self) -> Self {
        Self {
            on_write: self.on_write.clone(),
            on_write_convert: self.on_write_convert.clone(),
            on_overflow: self.on_overflow.clone(),
            on_read: self.on_read.clone(),
            on_read_convert: self.on_read_convert.clone(),
            on_underflow: self.on_underflow.clone(),
        }
    }
}

impl<T> DataHooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_write(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_write = Some(Arc::new(f));
        self
    }

    pub fn on_write_convert(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.on_write_convert = Some(Arc::new(f));
        self
    }

    pub fn on_overflow(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_overflow = Some(Arc::new(f));
        self
    }

    pub fn on_read(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_read = Some(Arc::new(f));
        self
    }

    pub fn on_read_convert(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.on_read_convert = Some(Arc::new(f));
        self
    }

    pub fn on_underflow(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.on_underflow = Some(Arc::new(f));
        self
    }

    /// Write path: convert, on_write, then on_overflow when `is_full`.
    pub(crate) fn before_write(&self, value: T, is_full: impl FnOnce() -> bool) -> T {
        let value = match &self.on_write_convert {
            Some(convert) => convert(value),
            None => value,
        };
        if let Some(hook) = &self.on_write {
            hook(&value);
        }
        if let Some(hook) = &self.on_overflow {
            if is_full() {
                hook(&value);
            }
        }
        value
    }

    /// Read path: convert, then on_read.
    pub(crate) fn after_read(&self, value: T) -> T {
        let value = match &self.on_read_convert {
            Some(convert) => convert(value),
            None => value,
        };
        if let Some(hook) = &self.on_read {
            hook(&value);
        }
        value
    }

    pub(crate) fn underflow(&self) -> Option<T> {
        self.on_underflow.as_ref().map(|hook| hook())
    }
}
