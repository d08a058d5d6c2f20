//! Bridges a decoder thread to the hardware callback: buffering, play/pause,
//! seek, and the presentation-timestamp bookkeeping that makes A/V sync
//! possible.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use tracing::debug;

use crate::atomic_float::{AtomicF32, AtomicF64};
use crate::buffer::DecodedBuffer;
use crate::error::TransferError;
use crate::ring::SlotRing;
use crate::timestamp::Timestamp;

/// Default pool size for the slot ring (spec default).
pub const DEFAULT_RING_CAPACITY: usize = 200;

/// How much of a generation's audio a seek is allowed to burn through
/// before the transfer treats it as an underrun to let A/V resync catch up.
/// ~1/24s of a 44.1kHz stream, expressed as a fraction of the sample rate.
const SEEK_CATCHUP_FRACTION: f64 = 1.0 / 24.0;

/// Effective gain multiplier applied while a seek is in flight, to duck
/// the (stale-ish) audio still draining from the ring.
const SEEKING_GAIN_MULTIPLIER: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Play,
    Pause,
}

/// Wall-clock context the hardware callback driver hands in on every
/// invocation. `output_time_seconds` is the time, on the driver's clock,
/// at which the first sample of this callback's output will actually reach
/// the speakers.
#[derive(Debug, Clone, Copy)]
pub struct CallbackTime {
    pub output_time_seconds: f64,
}

/// One-producer / one-consumer bridge between a decoder thread and a
/// realtime audio callback.
pub struct AudioTransfer {
    ring: SlotRing<DecodedBuffer>,
    channel_count: usize,
    sample_rate: f64,

    play_mode: AtomicU8, // 0 = Play, 1 = Pause
    seeking: AtomicBool,
    seek_generation: AtomicU64,
    gain: AtomicF32,
    enabled: AtomicBool,
    decoding_finished: AtomicBool,

    underrun_counter: AtomicU64,

    // Written only by the callback thread; read by control-thread queries.
    // A benign, wait-free race (pts may lag generation by one store) is
    // accepted here: `to_pts` is an advisory A/V-sync query, not a
    // correctness-critical read.
    last_pts_seconds: AtomicF64,
    last_pts_generation: AtomicU64,
    resonant_to_pts: AtomicF64,
    used_seek_generation: AtomicU64,

    /// How many samples of the current seek generation have been consumed
    /// since the generation last changed, used for the seek-catchup rule.
    consumed_since_generation: AtomicU64,
}

impl AudioTransfer {
    pub fn new(
        channel_count: usize,
        slot_capacity_samples: usize,
        sample_rate: f64,
        ring_capacity: usize,
    ) -> Result<Self, TransferError> {
        if ring_capacity == 0 {
            return Err(TransferError::ZeroCapacity);
        }
        if slot_capacity_samples == 0 {
            return Err(TransferError::ZeroSlotLength);
        }
        if channel_count == 0 {
            return Err(TransferError::ZeroChannels);
        }

        let ring = SlotRing::new(ring_capacity, || DecodedBuffer::new(channel_count, slot_capacity_samples));

        Ok(Self {
            ring,
            channel_count,
            sample_rate,
            play_mode: AtomicU8::new(0),
            seeking: AtomicBool::new(false),
            seek_generation: AtomicU64::new(0),
            gain: AtomicF32::new(1.0),
            enabled: AtomicBool::new(true),
            decoding_finished: AtomicBool::new(false),
            underrun_counter: AtomicU64::new(0),
            last_pts_seconds: AtomicF64::new(0.0),
            last_pts_generation: AtomicU64::new(0),
            resonant_to_pts: AtomicF64::new(0.0),
            used_seek_generation: AtomicU64::new(0),
            consumed_since_generation: AtomicU64::new(0),
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    // --- decoder-thread API -------------------------------------------

    pub fn take_free_buffer(&self, min_samples_required: usize) -> Option<&mut DecodedBuffer> {
        self.ring.take_free_buffer(min_samples_required)
    }

    pub fn put_ready_buffer(&self, samples_in_that_buffer: usize) {
        self.ring.put_ready_buffer(samples_in_that_buffer);
    }

    // --- control-thread API ---------------------------------------------

    pub fn set_play_mode(&self, mode: PlayMode) {
        self.play_mode.store(mode as u8, Ordering::Relaxed);
    }

    pub fn play_mode(&self) -> PlayMode {
        match self.play_mode.load(Ordering::Relaxed) {
            0 => PlayMode::Play,
            _ => PlayMode::Pause,
        }
    }

    pub fn set_seeking(&self, seeking: bool) {
        self.seeking.store(seeking, Ordering::Relaxed);
    }

    pub fn set_seek_generation(&self, generation: u64) {
        if self.seek_generation.load(Ordering::Relaxed) != generation {
            debug!(generation, "audio transfer seek generation bumped");
            self.seek_generation.store(generation, Ordering::Relaxed);
            self.consumed_since_generation.store(0, Ordering::Relaxed);
        }
    }

    pub fn seek_generation(&self) -> u64 {
        self.seek_generation.load(Ordering::Relaxed)
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.max(0.0), Ordering::Relaxed);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_decoding_finished(&self, finished: bool) {
        self.decoding_finished.store(finished, Ordering::Relaxed);
    }

    pub fn buffer_underrun_counter(&self) -> u64 {
        self.underrun_counter.load(Ordering::Relaxed)
    }

    /// Seconds of audio currently buffered in the ring, at this transfer's
    /// sample rate.
    pub fn buffer_state_seconds(&self) -> f32 {
        (self.ring.samples_in_buffers() as f64 / self.sample_rate) as f32
    }

    pub fn last_pts(&self) -> Timestamp {
        Timestamp::new(
            self.last_pts_seconds.load(Ordering::Acquire),
            self.last_pts_generation.load(Ordering::Acquire),
        )
    }

    /// Maps a future output time to the corresponding source pts, for A/V
    /// sync. See spec §4.1: the result never overshoots the last sample
    /// actually delivered.
    pub fn to_pts(&self, wall_clock_time: f64) -> Timestamp {
        let projected = Timestamp::new(
            wall_clock_time + self.resonant_to_pts.load(Ordering::Acquire),
            self.used_seek_generation.load(Ordering::Acquire),
        );
        std::cmp::min(self.last_pts(), projected)
    }

    // --- callback-thread API ---------------------------------------------

    /// Fills `out_channels` (one slice per output channel, each of length
    /// `n`) with the next `n` frames. Never allocates, never blocks.
    pub fn process(&self, out_channels: &mut [&mut [f32]], n: usize, callback_time: CallbackTime) {
        if !self.enabled() {
            for ch in out_channels.iter_mut() {
                ch[..n].fill(0.0);
            }
            return;
        }

        let mut remaining = n;
        let mut written = 0usize;
        let mut first = true;
        let seeking = self.seeking.load(Ordering::Relaxed);
        let seek_generation = self.seek_generation.load(Ordering::Relaxed);

        while remaining > 0 {
            // (a) discard stale slots
            while let Some(head) = self.ring.head() {
                if head.timestamp.seek_generation < seek_generation {
                    self.ring.consume(head.remaining());
                    self.ring.advance_reader();
                } else {
                    break;
                }
            }

            let ready = self.ring.ready_count() > 0;
            let paused = self.play_mode() == PlayMode::Pause && !seeking;

            if paused || !ready {
                for ch in out_channels.iter_mut() {
                    ch[written..written + remaining].fill(0.0);
                }
                if self.decoding_finished.load(Ordering::Relaxed) {
                    self.enabled.store(false, Ordering::Relaxed);
                } else {
                    self.underrun_counter.fetch_add(remaining as u64, Ordering::Relaxed);
                }
                return;
            }

            if seeking {
                let catchup_limit = (self.sample_rate * SEEK_CATCHUP_FRACTION) as u64;
                if self.consumed_since_generation.load(Ordering::Relaxed) > catchup_limit {
                    for ch in out_channels.iter_mut() {
                        ch[written..written + remaining].fill(0.0);
                    }
                    self.underrun_counter.fetch_add(remaining as u64, Ordering::Relaxed);
                    return;
                }
            }

            let head = self.ring.head().expect("ready_count > 0 implies a head slot");
            let take = remaining.min(head.remaining());

            let pts_here = head.timestamp.pts + head.offset as f64 / self.sample_rate;
            self.last_pts_seconds
                .store(pts_here + take as f64 / self.sample_rate, Ordering::Release);
            self.last_pts_generation
                .store(head.timestamp.seek_generation, Ordering::Release);

            if first {
                self.resonant_to_pts
                    .store(pts_here - callback_time.output_time_seconds, Ordering::Release);
                self.used_seek_generation
                    .store(head.timestamp.seek_generation, Ordering::Release);
                first = false;
            }

            let effective_gain = if seeking {
                self.gain.load(Ordering::Relaxed) * SEEKING_GAIN_MULTIPLIER
            } else {
                self.gain.load(Ordering::Relaxed)
            };

            let channels = out_channels.len().min(head.channel_count());
            if (effective_gain - 1.0).abs() < 1e-5 {
                for c in 0..channels {
                    let src = &head.channel(c)[head.offset..head.offset + take];
                    out_channels[c][written..written + take].copy_from_slice(src);
                }
            } else {
                for c in 0..channels {
                    let src = &head.channel(c)[head.offset..head.offset + take];
                    for (dst, &s) in out_channels[c][written..written + take].iter_mut().zip(src) {
                        *dst = s * effective_gain;
                    }
                }
            }
            for c in channels..out_channels.len() {
                out_channels[c][written..written + take].fill(0.0);
            }

            head.offset += take;
            self.ring.consume(take);
            if head.is_fully_consumed() {
                self.ring.advance_reader();
            }

            self.consumed_since_generation.fetch_add(take as u64, Ordering::Relaxed);
            written += take;
            remaining -= take;
        }
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
