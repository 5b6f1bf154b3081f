//! Fixed-capacity receive ring with overwrite-oldest semantics.
//!
//! [`Ring`] is the plain data structure. [`SharedRing`] wraps it for the
//! single-producer/single-consumer case where the producer is an interrupt
//! handler (or UART task) and the consumer is the main-loop framer. Both sides
//! take a short critical section, so an overwrite in the producer cannot race
//! the consumer's read index.

use core::cell::RefCell;
use critical_section::Mutex;

/// Byte ring buffer of capacity `N`.
///
/// `read` always stays in `0..N`; the write slot is derived from it and the
/// fill level. When full, [`push`](Self::push) drops the oldest byte.
pub struct Ring<const N: usize> {
    buf: [u8; N],
    read: usize,
    len: usize,
}

impl<const N: usize> Ring<N> {
    /// Create an empty ring.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            read: 0,
            len: 0,
        }
    }

    /// Append a byte. Returns `true` if the oldest byte was overwritten.
    pub fn push(&mut self, byte: u8) -> bool {
        let write = (self.read + self.len) % N;
        self.buf[write] = byte;
        if self.len == N {
            self.read = (self.read + 1) % N;
            true
        } else {
            self.len += 1;
            false
        }
    }

    /// Take the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.read];
        self.read = (self.read + 1) % N;
        self.len -= 1;
        Some(byte)
    }

    /// Number of bytes waiting.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for Ring<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of link bytes for the framer.
pub trait ByteSource {
    /// Next available byte, or `None` if nothing has arrived yet.
    fn next_byte(&mut self) -> Option<u8>;
}

impl<const N: usize> ByteSource for Ring<N> {
    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        self.pop()
    }
}

/// [`Ring`] shareable between an interrupt producer and the main loop.
///
/// Suitable for a `static`.
pub struct SharedRing<const N: usize> {
    inner: Mutex<RefCell<Ring<N>>>,
}

impl<const N: usize> SharedRing<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Ring::new())),
        }
    }

    /// Producer side. Returns `true` if a byte was lost to overwrite.
    pub fn push(&self, byte: u8) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).push(byte))
    }

    /// Producer side, several bytes at once. Returns how many were lost.
    pub fn push_slice(&self, bytes: &[u8]) -> usize {
        critical_section::with(|cs| {
            let mut ring = self.inner.borrow_ref_mut(cs);
            bytes.iter().filter(|&&b| ring.push(b)).count()
        })
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<u8> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for SharedRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteSource for &SharedRing<N> {
    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        self.pop()
    }
}
