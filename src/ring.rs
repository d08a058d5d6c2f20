//! Lock-free SPSC slot ring.
//!
//! A fixed pool of `K` preallocated slots is shared by exactly one producer
//! (the decoder thread) and one consumer (the callback thread). The ring
//! never allocates after construction and never blocks either side: the
//! producer backs off (returns `None`) when the ring is full or the caller's
//! lookahead budget is exceeded; the consumer sees an empty ring as a normal,
//! countable underrun.
//!
//! Slot ownership is a baton pass enforced by protocol, not by the type
//! system: `take_free_buffer` hands the producer exclusive access to the
//! slot at `writer`; `put_ready_buffer` publishes it to the consumer;
//! `advance_reader` hands the now-fully-consumed slot back to the producer's
//! future claim. Because only one side ever touches a given slot at a time,
//! a `Vec<UnsafeCell<T>>` with raw index arithmetic is sound, matching the
//! "float ring buffer with raw pointer arithmetic, but bounds-checked and
//! encapsulated" shape called for by a realtime ring of this kind.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The bookkeeping half of the ring: slot indices and the two running
/// counters the producer and consumer publish to each other.
#[derive(Debug)]
pub struct RingState {
    capacity: usize,
    reader: AtomicUsize,
    writer: AtomicUsize,
    ready_count: AtomicUsize,
    samples_in_buffers: AtomicUsize,
}

impl RingState {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            reader: AtomicUsize::new(0),
            writer: AtomicUsize::new(0),
            ready_count: AtomicUsize::new(0),
            samples_in_buffers: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ready_count(&self) -> usize {
        self.ready_count.load(Ordering::Acquire)
    }

    pub fn samples_in_buffers(&self) -> usize {
        self.samples_in_buffers.load(Ordering::Acquire)
    }

    fn writer_index(&self) -> usize {
        self.writer.load(Ordering::Relaxed) % self.capacity
    }

    fn reader_index(&self) -> usize {
        self.reader.load(Ordering::Relaxed) % self.capacity
    }
}

/// A ring of `K` preallocated slots of type `T`.
pub struct SlotRing<T> {
    slots: Vec<UnsafeCell<T>>,
    state: RingState,
}

// SAFETY: access to each slot is serialized by the SPSC protocol described
// in the module docs; the ring itself only ever hands out a slot reference
// to the single thread entitled to it at that moment.
unsafe impl<T: Send> Sync for SlotRing<T> {}

impl<T> SlotRing<T> {
    pub fn new<F: FnMut() -> T>(capacity: usize, mut make_slot: F) -> Self {
        let slots = (0..capacity).map(|_| UnsafeCell::new(make_slot())).collect();
        Self {
            slots,
            state: RingState::new(capacity),
        }
    }

    pub fn state(&self) -> &RingState {
        &self.state
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    pub fn ready_count(&self) -> usize {
        self.state.ready_count()
    }

    pub fn samples_in_buffers(&self) -> usize {
        self.state.samples_in_buffers()
    }

    /// Producer side. Returns `None` (back-pressure) if the ring is full or
    /// `samples_in_buffers` already exceeds `min_samples_required`.
    /// Otherwise claims the slot at `writer` and advances `writer`.
    ///
    /// # Safety
    /// Must only be called from the single producer thread.
    pub fn take_free_buffer(&self, min_samples_required: usize) -> Option<&mut T> {
        if self.state.ready_count() >= self.state.capacity {
            return None;
        }
        if self.state.samples_in_buffers() > min_samples_required {
            return None;
        }
        let idx = self.state.writer_index();
        self.state.writer.fetch_add(1, Ordering::Relaxed);
        // SAFETY: the SPSC protocol guarantees this slot is not concurrently
        // held by the consumer (it only becomes consumer-visible after
        // `put_ready_buffer`, and is only handed to the producer again once
        // `ready_count` has room, i.e. the consumer already released it).
        let slot = unsafe { &mut *self.slots[idx].get() };
        Some(slot)
    }

    /// Producer side. Publishes the most recently claimed slot: the consumer
    /// may observe it (and everything written into it) from this point on.
    ///
    /// # Safety
    /// Must only be called from the single producer thread, once per
    /// successful `take_free_buffer`, after the slot has been filled.
    pub fn put_ready_buffer(&self, samples_in_that_buffer: usize) {
        self.state
            .samples_in_buffers
            .fetch_add(samples_in_that_buffer, Ordering::Relaxed);
        // Release: everything written to the slot happens-before the
        // consumer's acquire read of ready_count.
        self.state.ready_count.fetch_add(1, Ordering::Release);
    }

    /// Consumer side. Returns the current head slot if one is ready.
    ///
    /// # Safety
    /// Must only be called from the single consumer thread.
    pub fn head(&self) -> Option<&mut T> {
        // Acquire: pairs with the producer's release in `put_ready_buffer`.
        if self.state.ready_count.load(Ordering::Acquire) == 0 {
            return None;
        }
        let idx = self.state.reader_index();
        // SAFETY: ready_count > 0 means this slot was published by the
        // producer and not yet advanced past by the consumer.
        let slot = unsafe { &mut *self.slots[idx].get() };
        Some(slot)
    }

    /// Consumer side. Subtracts `amount` samples from `samples_in_buffers`
    /// as they are consumed from the head slot, keeping the counter equal
    /// to the true sum of `L - offset` across ready slots at every step
    /// (not just when a slot is fully drained).
    ///
    /// # Safety
    /// Must only be called from the single consumer thread.
    pub fn consume(&self, amount: usize) {
        self.state.samples_in_buffers.fetch_sub(amount, Ordering::Relaxed);
    }

    /// Consumer side. Releases the now-fully-drained head slot back to the
    /// producer pool.
    ///
    /// # Safety
    /// Must only be called from the single consumer thread, and only when
    /// `head()` returned `Some` and that slot is fully consumed.
    pub fn advance_reader(&self) {
        self.state.reader.fetch_add(1, Ordering::Relaxed);
        self.state.ready_count.fetch_sub(1, Ordering::Release);
    }
}
