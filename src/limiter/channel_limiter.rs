//! Look-ahead peak limiter for a single audio channel.
//!
//! The limiter delays the signal by `attack` samples and uses that window
//! to see peaks coming: it plans a straight-line gain reduction in the log
//! domain so the gain has already reached the value a peak requires by the
//! time that peak reaches the head of the delay line. Gain recovers along a
//! bounded linear ramp of length `release` once no louder peak is pending.

use tracing::error;

use super::delay_line::DelayLine;
use super::level_meter::LevelMeter;

/// Numeric slack allowed on the hard output bound, to absorb `f32`
/// transients from the log/exp round trip.
const INVARIANT_SLACK: f32 = 1e-3;

pub struct ChannelLimiter {
    threshold: f32,
    threshold_log: f32,
    attack: u32,
    release: u32,

    x_line: DelayLine<f32>,
    l_line: DelayLine<f32>,
    level: LevelMeter,

    /// Current gain in the log domain; always `<= 0` (no amplification).
    gain: f32,
    /// Per-sample log-gain increment: negative during an attack redesign,
    /// positive during release.
    step: f32,
    samples_until_peak: u32,
}

impl ChannelLimiter {
    pub fn new() -> Self {
        Self {
            threshold: 1.0,
            threshold_log: 0.0,
            attack: 2,
            release: 1,
            x_line: DelayLine::new(2, 0.0),
            l_line: DelayLine::new(2, 0.0),
            level: LevelMeter::new(),
            gain: 0.0,
            step: 0.0,
            samples_until_peak: 0,
        }
    }

    /// `threshold` is the linear clamp level (`T > 0`). `attack` is clamped
    /// to at least 2 samples: the per-sample redesign divides by
    /// `attack - 1`, so a 1-sample attack window is not representable.
    pub fn prepare(&mut self, threshold: f32, attack: u32, release: u32) {
        let threshold_log = threshold.max(1e-10).ln();
        self.threshold = threshold;
        self.threshold_log = threshold_log;
        self.attack = attack.max(2);
        self.release = release.max(1);
        self.x_line = DelayLine::new(self.attack as usize, 0.0);
        self.l_line = DelayLine::new(self.attack as usize, threshold_log);
        self.level.reset(threshold_log);
        self.gain = 0.0;
        self.step = 0.0;
        self.samples_until_peak = 0;
    }

    /// Current linear gain being applied to the sample leaving the delay
    /// line.
    pub fn current_gain(&self) -> f32 {
        self.gain.exp()
    }

    pub fn attack(&self) -> u32 {
        self.attack
    }

    /// Delays `input` by `attack` samples and returns the limited output.
    pub fn put_get(&mut self, input: f32) -> f32 {
        let attack = self.attack;
        let threshold_log = self.threshold_log;

        self.x_line.put(input);

        let abs_input = input.abs().max(1e-10);
        let input_log = abs_input.ln().max(threshold_log);
        self.l_line.put(input_log);

        let mut design = false;

        // Fast-path redesign: does the sample just pushed break the plan
        // already in flight?
        if self.samples_until_peak > 0 {
            let required_gain = threshold_log - input_log;
            let ats = (attack - 1) as f32;
            let planned = self.step * ats + self.gain;
            if planned > required_gain {
                self.step = (required_gain - self.gain) / ats;
                self.samples_until_peak = attack;
                design = true;
            }
        }

        if self.samples_until_peak > 0 {
            self.samples_until_peak -= 1;
        }

        // Full redesign: walk the whole attack window for the worst peak.
        if !design {
            self.step = 0.0;
            for i in 1..=attack {
                let tmp = self.l_line.get_newest((attack - i) as usize);
                let required_gain = threshold_log - tmp;
                let i_f = i as f32;
                let planned = self.step * i_f + self.gain;
                if planned > required_gain {
                    self.step = (required_gain - self.gain) / i_f;
                    self.samples_until_peak = i - 1;
                    design = true;
                }
            }
        }

        let delayed_sample = self.x_line.get_newest((attack - 1) as usize);
        let delayed_log = self.l_line.get_newest((attack - 1) as usize);
        self.level.put(delayed_log, threshold_log, self.release);

        // Release planning: only when no attack redesign happened this
        // sample.
        if !design {
            let peak = self.level.peak();
            let required_gain = threshold_log - peak;
            self.step = (required_gain - self.gain) / self.release as f32;
        }

        self.gain += self.step;

        let gain_linear = self.gain.exp();
        let output = delayed_sample * gain_linear;

        self.enforce_invariant(output, threshold_log)
    }

    fn enforce_invariant(&self, output: f32, threshold_log: f32) -> f32 {
        let out_log = output.abs().ln();
        if out_log <= threshold_log + INVARIANT_SLACK && output.is_finite() {
            return output;
        }

        error!(
            gain = self.gain,
            step = self.step,
            threshold_log,
            out_log,
            samples_until_peak = self.samples_until_peak,
            attack = self.attack,
            "limiter invariant violated: output exceeds threshold"
        );

        if cfg!(debug_assertions) {
            panic!("limiter invariant violated: |y| exceeds threshold");
        }

        if output.is_finite() && output < 0.0 {
            -self.threshold
        } else {
            self.threshold
        }
    }
}

impl Default for ChannelLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
