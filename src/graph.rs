//! Graph Root: the thing the hardware callback driver actually calls. Owns
//! every source, the panner, and one look-ahead limiter per output
//! channel, and drives them in the fixed order the realtime contract
//! requires.

use crate::limiter::ChannelLimiter;
use crate::panner::{Mode, Panner};
use crate::transfer::{AudioTransfer, CallbackTime};

/// A node that can fill its own channel buffers for one callback. Sources
/// wired into the panner are expected to be mono (`channel_count() == 1`):
/// the panner spatializes a single feed across the output channel set.
pub trait AudioSource: Send {
    fn channel_count(&self) -> usize;
    fn process(&self, out: &mut [&mut [f32]], n: usize, callback_time: CallbackTime);
}

impl AudioSource for AudioTransfer {
    fn channel_count(&self) -> usize {
        AudioTransfer::channel_count(self)
    }

    fn process(&self, out: &mut [&mut [f32]], n: usize, callback_time: CallbackTime) {
        AudioTransfer::process(self, out, n, callback_time)
    }
}

/// An auxiliary module whose output is mixed directly into the final
/// channel set rather than spatialized by the panner.
pub struct Auxiliary {
    pub source: Box<dyn AudioSource>,
    /// `true` if this source's level is already guaranteed to stay within
    /// the limiter's threshold, so it can skip the limiter entirely.
    /// `false` routes it through the limiter along with everything else.
    pub bypass_limiter: bool,
}

pub struct GraphRoot {
    panner: Panner,
    panned_sources: Vec<Box<dyn AudioSource>>,
    auxiliaries: Vec<Auxiliary>,
    limiters: Vec<ChannelLimiter>,
    limiter_params: (f32, u32, u32),
    max_block_size: usize,

    source_scratch: Vec<Vec<f32>>,
    aux_scratch: Vec<Vec<f32>>,
}

impl GraphRoot {
    pub fn new(mode: Mode, max_block_size: usize) -> Self {
        Self {
            panner: Panner::new(mode),
            panned_sources: Vec::new(),
            auxiliaries: Vec::new(),
            limiters: Vec::new(),
            limiter_params: (1.0, 256, 4096),
            max_block_size,
            source_scratch: Vec::new(),
            aux_scratch: Vec::new(),
        }
    }

    pub fn panner(&self) -> &Panner {
        &self.panner
    }

    pub fn panner_mut(&mut self) -> &mut Panner {
        &mut self.panner
    }

    /// Sets the threshold/attack/release used for every channel limiter.
    /// Applies immediately to existing limiters and to any created by a
    /// later topology change.
    pub fn set_limiter_params(&mut self, threshold: f32, attack: u32, release: u32) {
        self.limiter_params = (threshold, attack, release);
        for limiter in self.limiters.iter_mut() {
            limiter.prepare(threshold, attack, release);
        }
    }

    /// Registers a mono source to be spatialized by the panner. Must be
    /// followed by a matching `add_source` on the panner with the same
    /// index ordering — call `sync_topology` after both sides agree.
    pub fn add_panned_source(&mut self, source: Box<dyn AudioSource>) {
        debug_assert_eq!(source.channel_count(), 1, "panned sources must be mono");
        self.panned_sources.push(source);
        self.source_scratch.push(vec![0.0; self.max_block_size]);
    }

    pub fn add_auxiliary(&mut self, source: Box<dyn AudioSource>, bypass_limiter: bool) {
        self.auxiliaries.push(Auxiliary { source, bypass_limiter });
    }

    /// Resizes the limiter bank and output-channel scratch space to match
    /// the panner's current channel count. Called from the control thread
    /// after any reconfiguration that can change channel count
    /// (`set_mode`, `replace_speakers`, `replace_rectangles`,
    /// `apply_config`); never called from the callback path.
    pub fn sync_topology(&mut self) {
        let channel_count = self.panner.channel_count();
        let (threshold, attack, release) = self.limiter_params;

        while self.limiters.len() < channel_count {
            let mut limiter = ChannelLimiter::new();
            limiter.prepare(threshold, attack, release);
            self.limiters.push(limiter);
        }
        self.limiters.truncate(channel_count);

        while self.aux_scratch.len() < channel_count {
            self.aux_scratch.push(vec![0.0; self.max_block_size]);
        }
        self.aux_scratch.truncate(channel_count);
    }

    /// The realtime callback entry point: `out` must have exactly
    /// `panner.channel_count()` channels, each at least `n` frames long.
    pub fn process(&mut self, out: &mut [&mut [f32]], n: usize, callback_time: CallbackTime) {
        debug_assert!(n <= self.max_block_size);
        let channel_count = self.panner.channel_count();
        debug_assert_eq!(out.len(), channel_count);
        debug_assert_eq!(self.limiters.len(), channel_count);

        for (source, scratch) in self.panned_sources.iter().zip(self.source_scratch.iter_mut()) {
            let mut one_channel = [scratch.as_mut_slice()];
            source.process(&mut one_channel, n, callback_time);
        }

        let input_slices: Vec<&[f32]> = self.source_scratch.iter().map(|s| &s[..n]).collect();
        self.panner.process(&input_slices, out, n);

        for aux in self.auxiliaries.iter().filter(|a| !a.bypass_limiter) {
            let mut channels: Vec<&mut [f32]> = self.aux_scratch.iter_mut().map(|s| &mut s[..n]).collect();
            aux.source.process(&mut channels, n, callback_time);
            for (c, scratch) in self.aux_scratch.iter().enumerate() {
                for i in 0..n {
                    out[c][i] += scratch[i];
                }
            }
        }

        for (c, limiter) in self.limiters.iter_mut().enumerate() {
            for i in 0..n {
                out[c][i] = limiter.put_get(out[c][i]);
            }
        }

        for aux in self.auxiliaries.iter().filter(|a| a.bypass_limiter) {
            let mut channels: Vec<&mut [f32]> = self.aux_scratch.iter_mut().map(|s| &mut s[..n]).collect();
            aux.source.process(&mut channels, n, callback_time);
            for (c, scratch) in self.aux_scratch.iter().enumerate() {
                for i in 0..n {
                    out[c][i] += scratch[i];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panner::{Loudspeaker, Point2D};
    use crate::timestamp::Timestamp;

    fn callback_time() -> CallbackTime {
        CallbackTime { output_time_seconds: 0.0 }
    }

    #[test]
    fn single_source_panned_to_single_speaker_passes_through_limiter() {
        let mut graph = GraphRoot::new(Mode::Radial, 256);
        graph.panner_mut().replace_speakers(vec![Loudspeaker::new(Point2D::new(0.0, 0.0))]);
        graph.panner_mut().set_max_radius(1000.0);
        graph.sync_topology();
        graph.set_limiter_params(1.0, 8, 64);

        let transfer = AudioTransfer::new(1, 64, 44_100.0, 4).unwrap();
        let slot = transfer.take_free_buffer(usize::MAX).unwrap();
        slot.fill_planar(Timestamp::ZERO, &[&[0.2f32; 64]]);
        transfer.put_ready_buffer(64);

        graph.add_panned_source(Box::new(transfer));
        graph.panner_mut().add_source(b"src".to_vec());
        graph
            .panner_mut()
            .set_source_location(b"src", b"p", Point2D::new(0.0, 0.0))
            .unwrap();

        // Settle the pipe ramp before checking levels.
        let mut silence_out = vec![0.0f32; 256];
        for _ in 0..8 {
            let mut out: Vec<&mut [f32]> = vec![silence_out.as_mut_slice()];
            graph.process(&mut out, 256, callback_time());
        }

        let mut out_buf = vec![0.0f32; 64];
        {
            let mut out: Vec<&mut [f32]> = vec![out_buf.as_mut_slice()];
            graph.process(&mut out, 64, callback_time());
        }
        assert!(out_buf.iter().all(|&s| s.abs() <= 1.0 * 1.001));
    }
}
