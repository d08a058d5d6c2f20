//! Two-tap peak-with-hold level meter: tracks the loudest sample seen in
//! the last `hold_time` calls to `put`, plus a runner-up so the reported
//! peak doesn't drop to zero the instant the loudest sample ages out.

#[derive(Debug, Clone, Copy)]
pub struct LevelMeter {
    time: u32,
    v1: f32,
    v2: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self { time: 1, v1: 0.0, v2: 0.0 }
    }

    /// Resets both taps to `value` and re-arms the hold timer.
    pub fn reset(&mut self, value: f32) {
        self.time = 1;
        self.v1 = value;
        self.v2 = value;
    }

    /// Feeds a new sample. When the hold timer expires, the runner-up
    /// becomes the new peak and `floor` takes its place as the new
    /// runner-up, so the meter never reports below `floor`.
    pub fn put(&mut self, value: f32, floor: f32, hold_time: u32) {
        self.time = self.time.saturating_sub(1);
        if self.time == 0 {
            self.time = hold_time;
            self.v1 = self.v2;
            self.v2 = floor;
        }

        if value > self.v1 {
            self.time = hold_time;
            self.v2 = self.v1;
            self.v1 = value;
        } else if value > self.v2 {
            self.v2 = value;
        }
    }

    pub fn peak(&self) -> f32 {
        self.v1
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}
