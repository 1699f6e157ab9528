//! Lock-free single-producer/single-consumer byte ring for serial receive.
//!
//! The receive path (an interrupt handler or a dedicated reader task) pushes
//! bytes in; the command loop is the only consumer. Each side advances only
//! its own index, so no locking is needed. Capacity must be a power of two
//! so wraparound is a single bitmask.
//!
//! If the ring is full, [`RxRing::push`] drops the byte and reports it to
//! the caller; overflow is never signaled to the consumer. Bytes already
//! buffered are never corrupted by overflow.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity SPSC byte ring.
///
/// `N` must be a power of two (checked at compile time). Indices count
/// total bytes pushed/popped and wrap naturally; slot position is
/// `index & (N - 1)`.
///
/// # Example
///
/// ```rust
/// use arm_pilot::ring::RxRing;
///
/// static RX: RxRing<64> = RxRing::new();
///
/// assert!(RX.push(b'A'));
/// assert_eq!(RX.pop(), Some(b'A'));
/// assert_eq!(RX.pop(), None);
/// ```
pub struct RxRing<const N: usize> {
    buf: [AtomicU8; N],
    /// Total bytes pushed. Written only by the producer.
    head: AtomicUsize,
    /// Total bytes popped. Written only by the consumer.
    tail: AtomicUsize,
}

impl<const N: usize> RxRing<N> {
    /// Create an empty ring. Usable in `static` initializers.
    #[must_use]
    pub const fn new() -> Self {
        const { assert!(N.is_power_of_two(), "ring capacity must be a power of two") }
        Self {
            buf: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Push one byte from the producer side.
    ///
    /// Returns `false` if the ring is full; the byte is silently dropped as
    /// far as the consumer is concerned.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= N {
            return false; // full: drop
        }
        self.buf[head & (N - 1)].store(byte, Ordering::Relaxed);
        // Release: the slot write above must be visible before the index.
        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Pop one byte from the consumer side, if any is buffered.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let byte = self.buf[tail & (N - 1)].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.head
            .load(Ordering::Acquire)
            .wrapping_sub(self.tail.load(Ordering::Acquire))
    }

    /// Whether the ring holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for RxRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
