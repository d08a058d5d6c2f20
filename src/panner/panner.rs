//! The Spatial Panner: mixes named, independently moving sources onto a set
//! of output channels using a 2-D geometric model, with glitch-free gain
//! ramping.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PannerError;

use super::config::PannerConfig;
use super::geometry::{Pipe, Point2D, Source, RAMP_INTERP_SAMPLES};
use super::rectangle::SoundRectangle;
use super::speaker::Loudspeaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Radial,
    Rectangles,
}

/// Owns the set of registered sources and the active geometric model, and
/// produces per-channel mixed output every callback.
pub struct Panner {
    mode: Mode,
    max_radius: f32,
    speakers: Vec<Loudspeaker>,
    rectangles: Vec<SoundRectangle>,
    sources: Vec<Source>,
    generation: u64,
    channel_count: usize,
}

impl Panner {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            max_radius: 1500.0,
            speakers: Vec::new(),
            rectangles: Vec::new(),
            sources: Vec::new(),
            generation: 0,
            channel_count: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_max_radius(&mut self, radius: f32) {
        self.max_radius = radius;
        self.generation += 1;
        self.resync_all();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        debug!(?mode, "panner mode changed");
        self.mode = mode;
        self.generation += 1;
        self.update_channel_count();
        self.resync_all();
    }

    pub fn replace_speakers(&mut self, speakers: Vec<Loudspeaker>) {
        self.speakers = speakers;
        self.generation += 1;
        self.update_channel_count();
        self.resync_all();
    }

    pub fn replace_rectangles(&mut self, rectangles: Vec<SoundRectangle>) {
        self.rectangles = rectangles;
        self.generation += 1;
        self.update_channel_count();
        self.resync_all();
    }

    pub fn add_rectangle(&mut self, rectangle: SoundRectangle) {
        self.rectangles.push(rectangle);
        self.generation += 1;
        self.update_channel_count();
        self.resync_all();
    }

    pub fn add_source(&mut self, id: impl Into<Vec<u8>>) {
        self.sources.push(Source::new(id.into()));
    }

    pub fn remove_source(&mut self, id: &[u8]) -> Result<(), PannerError> {
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        if self.sources.len() == before {
            warn!(id = ?String::from_utf8_lossy(id), "panner: no such source to remove");
            return Err(PannerError::UnknownSource(id.to_vec()));
        }
        debug!(remaining = self.sources.len(), "panner source removed");
        Ok(())
    }

    pub fn set_source_location(
        &mut self,
        id: &[u8],
        path: &[u8],
        location: Point2D,
    ) -> Result<(), PannerError> {
        let generation = self.generation;
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PannerError::UnknownSource(id.to_vec()))?;

        let changed = match source.locations.get(path) {
            Some(&existing) => !(source.generation == generation && existing == location),
            None => true,
        };
        source.locations.insert(path.to_vec(), location);

        if changed {
            source.generation = generation;
            let mode = self.mode;
            let channel_count = self.channel_count;
            let max_radius = self.max_radius;
            let speakers = &self.speakers;
            let rectangles = &self.rectangles;
            sync_source(source, channel_count, |channel, loc| {
                compute_gain(mode, speakers, rectangles, max_radius, channel, loc)
            });
        }
        Ok(())
    }

    pub fn clear_source_location(&mut self, id: &[u8], path: &[u8]) -> Result<(), PannerError> {
        let generation = self.generation;
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PannerError::UnknownSource(id.to_vec()))?;

        if source.locations.remove(path).is_none() {
            return Ok(());
        }
        source.generation = generation;
        let mode = self.mode;
        let channel_count = self.channel_count;
        let max_radius = self.max_radius;
        let speakers = &self.speakers;
        let rectangles = &self.rectangles;
        sync_source(source, channel_count, |channel, loc| {
            compute_gain(mode, speakers, rectangles, max_radius, channel, loc)
        });
        Ok(())
    }

    /// The output channel nearest a query point: the closest loudspeaker in
    /// `Radial` mode, or the left/right channel of the closest rectangle
    /// (split at its horizontal midpoint) in `Rectangles` mode.
    pub fn locate_channel(&self, point: Point2D) -> usize {
        match self.mode {
            Mode::Radial => {
                let mut best = 0;
                let mut best_dist = f32::INFINITY;
                for (i, speaker) in self.speakers.iter().enumerate() {
                    let dist = speaker.location.distance(point);
                    if dist < best_dist {
                        best = i;
                        best_dist = dist;
                    }
                }
                best
            }
            Mode::Rectangles => {
                let mut best: Option<&SoundRectangle> = None;
                let mut best_dist = 0.0f32;
                for rect in &self.rectangles {
                    let dist = rect.distance(point);
                    if best.is_none() || dist < best_dist {
                        best = Some(rect);
                        best_dist = dist;
                    }
                }
                match best {
                    Some(rect) => {
                        if point.x < rect.center().x {
                            rect.left_channel
                        } else {
                            rect.right_channel
                        }
                    }
                    None => 0,
                }
            }
        }
    }

    pub fn to_config(&self) -> PannerConfig {
        PannerConfig {
            mode: self.mode,
            max_radius: self.max_radius,
            speakers: self.speakers.iter().map(|s| s.location).collect(),
            rectangles: self.rectangles.clone(),
        }
    }

    pub fn apply_config(&mut self, config: &PannerConfig) {
        self.mode = config.mode;
        self.max_radius = config.max_radius;
        self.speakers = config.speaker_locations();
        self.rectangles = config.rectangles.clone();
        self.generation += 1;
        self.update_channel_count();
        self.resync_all();
    }

    /// Zeros `out`, then for each source adds `gain(t) * input[t]` into
    /// every pipe's destination channel, advancing each pipe's ramp one
    /// sample at a time. Pipes whose ramp has settled at 0 are skipped but
    /// not removed, so they can be reused by a future `sync_source`.
    pub fn process(&mut self, inputs: &[&[f32]], out: &mut [&mut [f32]], n: usize) {
        for channel in out.iter_mut() {
            channel[..n].fill(0.0);
        }

        for (source, input) in self.sources.iter_mut().zip(inputs.iter()) {
            for pipe in source.pipes.iter_mut() {
                if pipe.is_done() {
                    continue;
                }
                let dest = &mut out[pipe.to][..n];
                if pipe.ramp.is_ramping() {
                    for i in 0..n {
                        dest[i] += input[i] * pipe.ramp.value();
                        pipe.ramp.update();
                    }
                } else {
                    let gain = pipe.ramp.value();
                    for i in 0..n {
                        dest[i] += input[i] * gain;
                    }
                }
            }
        }
    }

    fn update_channel_count(&mut self) {
        self.channel_count = match self.mode {
            Mode::Radial => self.speakers.len(),
            Mode::Rectangles => self
                .rectangles
                .iter()
                .map(|r| r.left_channel.max(r.right_channel) + 1)
                .max()
                .unwrap_or(0),
        };
    }

    fn resync_all(&mut self) {
        let mode = self.mode;
        let channel_count = self.channel_count;
        let max_radius = self.max_radius;
        let speakers = self.speakers.clone();
        let rectangles = self.rectangles.clone();
        for source in self.sources.iter_mut() {
            sync_source(source, channel_count, |channel, loc| {
                compute_gain(mode, &speakers, &rectangles, max_radius, channel, loc)
            });
        }
    }
}

fn compute_gain(
    mode: Mode,
    speakers: &[Loudspeaker],
    rectangles: &[SoundRectangle],
    max_radius: f32,
    channel: usize,
    location: Point2D,
) -> f32 {
    match mode {
        Mode::Radial => {
            let Some(speaker) = speakers.get(channel) else {
                return 0.0;
            };
            let rel = speaker.location.distance(location) / max_radius;
            ((1.0 - rel) * 2.0).min(1.0).max(0.0)
        }
        Mode::Rectangles => rectangles
            .iter()
            .map(|r| r.gain(channel, location))
            .fold(0.0f32, f32::max),
    }
}

/// Re-derives every output pipe for one source from its current set of
/// locations, ramping toward the new target gain over
/// [`RAMP_INTERP_SAMPLES`] rather than jumping.
fn sync_source(source: &mut Source, channel_count: usize, gain_at: impl Fn(usize, Point2D) -> f32) {
    for channel in 0..channel_count {
        let target = source
            .locations
            .values()
            .map(|&loc| gain_at(channel, loc))
            .fold(0.0f32, f32::max);

        if target <= 0.0000001 {
            if let Some(pipe) = source
                .pipes
                .iter_mut()
                .find(|p| p.to == channel && p.ramp.target() >= 0.0001)
            {
                pipe.ramp.set_target(0.0, RAMP_INTERP_SAMPLES);
            }
            continue;
        }

        if let Some(pipe) = source.pipes.iter_mut().find(|p| p.to == channel) {
            pipe.ramp.set_target(target, RAMP_INTERP_SAMPLES);
            continue;
        }

        if let Some(pipe) = source.pipes.iter_mut().find(|p| p.is_done()) {
            pipe.to = channel;
            pipe.ramp.set_target(target, RAMP_INTERP_SAMPLES);
        } else {
            let mut pipe = Pipe::new(channel, 0.0);
            pipe.ramp.set_target(target, RAMP_INTERP_SAMPLES);
            source.pipes.push(pipe);
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
