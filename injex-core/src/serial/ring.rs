//! Lock-free byte ring
//!
//! One producer context and one consumer context, each owning a cursor.
//! One slot is kept empty to tell a full ring from an empty one, so a ring
//! of `N` slots holds `N - 1` bytes.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity circular byte queue
pub struct ByteRing<const N: usize> {
    slots: [AtomicU8; N],
    /// Next slot to write (producer)
    head: AtomicUsize,
    /// Next slot to read (consumer, or producer on overrun)
    tail: AtomicUsize,
}

impl<const N: usize> ByteRing<N> {
    /// Create an empty ring
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Usable capacity in bytes
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of queued bytes
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Check if no byte is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can be pushed without overrun
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Queue one byte, failing when full
    pub fn push(&self, byte: u8) -> bool {
        self.push_slice(&[byte])
    }

    /// Queue all bytes or none
    ///
    /// The head cursor is published once, after the last byte is written,
    /// so the consumer never sees part of the slice.
    pub fn push_slice(&self, bytes: &[u8]) -> bool {
        if bytes.len() > self.free() {
            return false;
        }

        let mut head = self.head.load(Ordering::Relaxed);
        for &byte in bytes {
            self.slots[head].store(byte, Ordering::Relaxed);
            head = (head + 1) % N;
        }
        self.head.store(head, Ordering::Release);
        true
    }

    /// Queue one byte, dropping the oldest unread byte when full
    ///
    /// Returns `true` when a byte was dropped.
    pub fn push_overwrite(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % N;

        let tail = self.tail.load(Ordering::Acquire);
        let dropped = next == tail;
        if dropped {
            // Lose the race gracefully if the consumer just freed a slot
            let _ = self.tail.compare_exchange(
                tail,
                (tail + 1) % N,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        self.slots[head].store(byte, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        dropped
    }

    /// Take the oldest byte
    pub fn pop(&self) -> Option<u8> {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            if tail == self.head.load(Ordering::Acquire) {
                return None;
            }

            let byte = self.slots[tail].load(Ordering::Relaxed);
            if self
                .tail
                .compare_exchange(tail, (tail + 1) % N, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(byte);
            }
        }
    }
}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
