// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-slot buffer.

use super::BufferBase;
use parking_lot::Mutex;

struct Slot<T> {
    value: Option<T>,
    is_new: bool,
}

/// One-sample buffer: writes overwrite, reads consume the "new" flag and
/// fail until the next write.
pub struct NullBuffer<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> NullBuffer<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                is_new: false,
            }),
        }
    }
}

impl<T> Default for NullBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> BufferBase<T> for NullBuffer<T> {
    fn length(&self) -> usize {
        1
    }

    fn write(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        slot.value = Some(value);
        slot.is_new = true;
        true
    }

    fn read(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        if !slot.is_new {
            return None;
        }
        slot.is_new = false;
        slot.value.clone()
    }

    fn peek(&self) -> Option<T> {
        self.slot.lock().value.clone()
    }

    fn is_full(&self) -> bool {
        self.slot.lock().is_new
    }

    fn is_empty(&self) -> bool {
        self.slot.lock().value.is_none()
    }

    fn is_new(&self) -> bool {
        self.slot.lock().is_new
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_requires_new_sample() {
        let buf = NullBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.read(), None);

        assert!(buf.write(7));
        assert!(buf.is_new());
        assert!(buf.is_full());
        assert_eq!(buf.read(), Some(7));
        assert!(!buf.is_new());
        assert_eq!(buf.read(), None);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_write_overwrites() {
        let buf = NullBuffer::new();
        buf.write("a".to_string());
        buf.write("b".to_string());
        assert_eq!(buf.read().as_deref(), Some("b"));
    }

    #[test]
    fn test_peek_keeps_new_flag() {
        let buf = NullBuffer::new();
        assert_eq!(buf.peek(), None);
        buf.write(3);
        assert_eq!(buf.peek(), Some(3));
        assert_eq!(buf.peek(), Some(3));
        assert!(buf.is_new());
        assert_eq!(buf.read(), Some(3));
        assert_eq!(buf.peek(), Some(3));
    }
}
