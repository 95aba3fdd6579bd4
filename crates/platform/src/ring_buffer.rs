//! Byte FIFO with caller-supplied storage.
//!
//! [`ByteRing`] queues completed DMA frames between the streaming ISR
//! (producer) and a reading task (consumer). The storage slice is borrowed
//! from the caller, and the `ByteRing` value itself is the control block, so
//! the caller decides where both live (internal RAM for small pools,
//! external RAM for large ones).
//!
//! # Constraints
//!
//! - Every method takes `&self` and runs inside a short
//!   `critical_section::with`, so producer and consumer may live in
//!   different interrupt priorities.
//! - Pushes are all-or-nothing: a frame is never split by a full buffer.
//! - No allocation, no blocking.

use core::cell::RefCell;

use critical_section::Mutex;
use thiserror_no_std::Error;

/// Returned when a push does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("ring buffer full")]
pub struct RingFull;

struct RingState<'a> {
    buf: &'a mut [u8],
    /// Index of the next byte to read.
    read: usize,
    /// Number of valid bytes currently held.
    count: usize,
}

impl RingState<'_> {
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn free(&self) -> usize {
        self.capacity().saturating_sub(self.count)
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: read < cap, count <= cap, data.len() <= free; all sums < 2 * cap
    fn copy_in(&mut self, data: &[u8]) {
        let cap = self.capacity();
        if data.is_empty() || cap == 0 {
            return;
        }
        let start = (self.read + self.count) % cap;
        let first = data.len().min(cap - start);
        let (head, tail) = data.split_at(first);
        if let Some(dst) = self.buf.get_mut(start..start + first) {
            dst.copy_from_slice(head);
        }
        if let Some(dst) = self.buf.get_mut(..tail.len()) {
            dst.copy_from_slice(tail);
        }
        self.count += data.len();
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: n <= count <= cap; read + n wraps via % cap
    fn discard(&mut self, n: usize) -> usize {
        let n = n.min(self.count);
        let cap = self.capacity();
        if n == 0 || cap == 0 {
            return 0;
        }
        self.read = (self.read + n) % cap;
        self.count -= n;
        n
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: n <= count; read < cap; first <= cap - read
    fn copy_out(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.count);
        let cap = self.capacity();
        if n == 0 || cap == 0 {
            return 0;
        }
        let first = n.min(cap - self.read);
        let (head, tail) = out.split_at_mut(first);
        if let Some(src) = self.buf.get(self.read..self.read + first) {
            head.copy_from_slice(src);
        }
        let rest = n - first;
        if let (Some(dst), Some(src)) = (tail.get_mut(..rest), self.buf.get(..rest)) {
            dst.copy_from_slice(src);
        }
        self.discard(n)
    }
}

/// Interrupt-safe byte FIFO over borrowed storage.
pub struct ByteRing<'a> {
    state: Mutex<RefCell<RingState<'a>>>,
}

impl<'a> ByteRing<'a> {
    /// Create an empty ring over `storage`. Capacity is `storage.len()`.
    pub fn new(storage: &'a mut [u8]) -> Self {
        Self {
            state: Mutex::new(RefCell::new(RingState {
                buf: storage,
                read: 0,
                count: 0,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut RingState<'a>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.with(|s| s.capacity())
    }

    /// Bytes currently queued.
    pub fn len(&self) -> usize {
        self.with(|s| s.count)
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can be pushed without eviction.
    pub fn free(&self) -> usize {
        self.with(|s| s.free())
    }

    /// Append `data` if it fits entirely.
    ///
    /// # Errors
    ///
    /// Returns [`RingFull`] and leaves the ring unchanged if `data` does not
    /// fit in the free space.
    pub fn push(&self, data: &[u8]) -> Result<(), RingFull> {
        self.with(|s| {
            if data.len() > s.free() {
                return Err(RingFull);
            }
            s.copy_in(data);
            Ok(())
        })
    }

    /// Append `data`, first discarding the oldest bytes needed to make room.
    ///
    /// Returns the number of bytes evicted.
    ///
    /// # Errors
    ///
    /// Returns [`RingFull`] only if `data` is larger than the whole ring.
    pub fn push_evicting(&self, data: &[u8]) -> Result<usize, RingFull> {
        self.with(|s| {
            if data.len() > s.capacity() {
                return Err(RingFull);
            }
            let needed = data.len().saturating_sub(s.free());
            let evicted = s.discard(needed);
            s.copy_in(data);
            Ok(evicted)
        })
    }

    /// Move up to `out.len()` of the oldest bytes into `out`.
    ///
    /// Returns the number of bytes copied.
    pub fn pop_into(&self, out: &mut [u8]) -> usize {
        self.with(|s| s.copy_out(out))
    }

    /// Drop every queued byte.
    pub fn clear(&self) {
        self.with(|s| {
            s.read = 0;
            s.count = 0;
        });
    }
}
