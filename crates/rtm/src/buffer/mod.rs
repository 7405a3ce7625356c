// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded sample buffers shared between a data port and its
//! publishers/providers.
//!
//! Both built-in variants are latest-wins: `read` hands back the most
//! recently written sample, and `write` never blocks (it overwrites).

mod null;
mod ring;

pub use null::NullBuffer;
pub use ring::RingBuffer;

use std::sync::Arc;

/// Default ring capacity when a port does not configure one.
pub const DEFAULT_BUFFER_LENGTH: usize = 8;

/// Ordered bounded container of samples of one payload type.
pub trait BufferBase<T>: Send + Sync {
    /// Capacity, as constructed.
    fn length(&self) -> usize;

    /// Store a sample. Never blocks; returns `true` for the built-in variants.
    fn write(&self, value: T) -> bool;

    /// Latest sample, or `None` when nothing is readable.
    ///
    /// A successful read clears the "new" flag.
    fn read(&self) -> Option<T>;

    /// Latest sample without touching the "new" flag; `None` before the
    /// first write. Lets several readers share one written sample.
    fn peek(&self) -> Option<T>;

    /// `true` when unread samples fill every slot.
    fn is_full(&self) -> bool;

    /// `true` until the first write.
    fn is_empty(&self) -> bool;

    /// `true` iff a write occurred after the last successful read.
    fn is_new(&self) -> bool;
}

/// Buffer variant selected by the `buffer.type` port property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Null,
    Ring,
}

impl BufferKind {
    /// Parse a property value; anything unknown selects the ring buffer.
    pub fn from_property(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "null" | "single" => BufferKind::Null,
            _ => BufferKind::Ring,
        }
    }
}

/// Construct a shared buffer of the requested kind.
pub fn create_buffer<T>(kind: BufferKind, length: usize) -> Arc<dyn BufferBase<T>>
where
    T: Clone + Send + 'static,
{
    match kind {
        BufferKind::Null => Arc::new(NullBuffer::<T>::new()),
        BufferKind::Ring => Arc::new(RingBuffer::<T>::new(length)),
    }
}
