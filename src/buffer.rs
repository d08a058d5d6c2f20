//! Decoded audio held in a fixed-capacity planar float block.

use crate::timestamp::Timestamp;

/// One pre-allocated chunk of planar float samples plus the metadata needed
/// to consume it incrementally across callbacks.
///
/// `DecodedBuffer`s are created once, at pipeline init, as part of the
/// ring's slot pool (see [`crate::ring::SlotRing`]); they are never
/// reallocated afterwards. The decoder thread fills one via [`fill_planar`]
/// or [`fill_interleaved`], and the callback thread advances `offset` as it
/// consumes samples.
///
/// [`fill_planar`]: DecodedBuffer::fill_planar
/// [`fill_interleaved`]: DecodedBuffer::fill_interleaved
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    channels: Vec<Vec<f32>>,
    capacity: usize,
    len: usize,
    pub timestamp: Timestamp,
    pub offset: usize,
}

impl DecodedBuffer {
    /// Allocates a buffer for `channel_count` channels of up to
    /// `capacity_samples` samples each. This allocation happens once, at
    /// pipeline init; it never grows afterward.
    pub fn new(channel_count: usize, capacity_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity_samples]; channel_count],
            capacity: capacity_samples,
            len: 0,
            timestamp: Timestamp::ZERO,
            offset: 0,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of valid samples currently held (`<= capacity`).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once every sample has been consumed by the callback thread.
    pub fn is_fully_consumed(&self) -> bool {
        self.offset >= self.len
    }

    pub fn remaining(&self) -> usize {
        self.len.saturating_sub(self.offset)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.len]
    }

    /// Fills the buffer from already-planar float channels. `planes.len()`
    /// must match `channel_count()`; each plane is truncated to
    /// `capacity()`.
    pub fn fill_planar(&mut self, timestamp: Timestamp, planes: &[&[f32]]) {
        debug_assert_eq!(planes.len(), self.channels.len());
        let n = planes.iter().map(|p| p.len()).min().unwrap_or(0).min(self.capacity);
        for (dst, src) in self.channels.iter_mut().zip(planes.iter()) {
            dst[..n].copy_from_slice(&src[..n]);
        }
        self.len = n;
        self.offset = 0;
        self.timestamp = timestamp;
    }

    /// Fills the buffer from interleaved 16-bit PCM, de-interleaving and
    /// converting to float by multiplying by `1/65536`.
    pub fn fill_interleaved(&mut self, timestamp: Timestamp, interleaved: &[i16], channels: usize) {
        debug_assert_eq!(channels, self.channels.len());
        const SCALE: f32 = 1.0 / 65536.0;
        let frames = (interleaved.len() / channels).min(self.capacity);
        for frame in 0..frames {
            for ch in 0..channels {
                self.channels[ch][frame] = interleaved[frame * channels + ch] as f32 * SCALE;
            }
        }
        self.len = frames;
        self.offset = 0;
        self.timestamp = timestamp;
    }

    /// Resets the buffer to empty without touching sample storage; used when
    /// a slot is recycled but will be overwritten before the next read.
    pub fn clear(&mut self) {
        self.len = 0;
        self.offset = 0;
    }
}
