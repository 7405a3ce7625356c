// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-capacity ring with latest-wins reads.
//!
//! Control-style wiring depends on `read` returning the newest sample, not
//! the oldest, so this is deliberately not a FIFO.

use super::BufferBase;
use parking_lot::Mutex;

const MIN_RING_LENGTH: usize = 2;

struct Ring<T> {
    slots: Vec<Option<T>>,
    /// Slot holding the most recent write.
    head: usize,
    /// Writes since the last successful read, capped at capacity.
    unread: usize,
    written: bool,
}

/// Ring buffer of `length >= 2` slots.
pub struct RingBuffer<T> {
    ring: Mutex<Ring<T>>,
    length: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(length: usize) -> Self {
        let length = if length < MIN_RING_LENGTH {
            log::warn!(
                "[buffer] ring length {} too small, using {}",
                length,
                MIN_RING_LENGTH
            );
            MIN_RING_LENGTH
        } else {
            length
        };
        let mut slots = Vec::with_capacity(length);
        slots.resize_with(length, || None);
        Self {
            ring: Mutex::new(Ring {
                slots,
                head: length - 1,
                unread: 0,
                written: false,
            }),
            length,
        }
    }
}

impl<T: Clone + Send> BufferBase<T> for RingBuffer<T> {
    fn length(&self) -> usize {
        self.length
    }

    fn write(&self, value: T) -> bool {
        let mut ring = self.ring.lock();
        let next = (ring.head + 1) % self.length;
        ring.slots[next] = Some(value);
        ring.head = next;
        ring.unread = (ring.unread + 1).min(self.length);
        ring.written = true;
        true
    }

    fn read(&self) -> Option<T> {
        let mut ring = self.ring.lock();
        if !ring.written {
            return None;
        }
        ring.unread = 0;
        let head = ring.head;
        ring.slots[head].clone()
    }

    fn peek(&self) -> Option<T> {
        let ring = self.ring.lock();
        ring.slots[ring.head].clone()
    }

    fn is_full(&self) -> bool {
        self.ring.lock().unread >= self.length
    }

    fn is_empty(&self) -> bool {
        !self.ring.lock().written
    }

    fn is_new(&self) -> bool {
        self.ring.lock().unread > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_as_constructed() {
        assert_eq!(RingBuffer::<u8>::new(8).length(), 8);
        assert_eq!(RingBuffer::<u8>::new(0).length(), 2);
    }

    #[test]
    fn test_read_returns_latest_after_wrap() {
        let buf = RingBuffer::new(4);
        assert!(buf.is_empty());
        assert_eq!(buf.read(), None);

        for i in 0..11 {
            assert!(buf.write(i));
        }
        assert!(buf.is_new());
        assert_eq!(buf.read(), Some(10));
        assert!(!buf.is_new());

        // Still readable, just not new.
        assert_eq!(buf.read(), Some(10));
    }

    #[test]
    fn test_full_tracks_unread_writes() {
        let buf = RingBuffer::new(2);
        buf.write(1);
        assert!(!buf.is_full());
        buf.write(2);
        assert!(buf.is_full());
        buf.write(3);
        assert!(buf.is_full());
        buf.read();
        assert!(!buf.is_full());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let buf = RingBuffer::new(3);
        assert_eq!(buf.peek(), None);
        buf.write(1);
        buf.write(2);
        assert_eq!(buf.peek(), Some(2));
        assert!(buf.is_new());
        assert_eq!(buf.read(), Some(2));
    }
}
