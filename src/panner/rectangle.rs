//! Sound Rectangle: a rectangular "speaker patch" in screen space with a
//! fade border and a left/right output channel pair.

use super::geometry::Point2D;

/// Piecewise-linear interpolation through four ordered `(x, y)` keys,
/// clamped to the first/last key's value outside their range.
fn interp4(keys: [(f32, f32); 4], x: f32) -> f32 {
    if x <= keys[0].0 {
        return keys[0].1;
    }
    if x >= keys[3].0 {
        return keys[3].1;
    }
    for pair in keys.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x >= x0 && x <= x1 {
            if (x1 - x0).abs() < f32::EPSILON {
                return y1;
            }
            let t = (x - x0) / (x1 - x0);
            return y0 + t * (y1 - y0);
        }
    }
    keys[3].1
}

/// A rectangular stereo patch: audio fades between `left_channel` and
/// `right_channel` across its width, and fades to zero across `fade_width`
/// outside its bounds on every side.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SoundRectangle {
    pub location: Point2D,
    pub size: Point2D,
    /// Loss of gain on the non-adjacent channel at the near edge, in `[0,1]`.
    pub stereo_pan: f32,
    pub fade_width: f32,
    pub left_channel: usize,
    pub right_channel: usize,
}

impl SoundRectangle {
    pub fn new(
        location: Point2D,
        size: Point2D,
        stereo_pan: f32,
        fade_width: f32,
        left_channel: usize,
        right_channel: usize,
    ) -> Self {
        Self {
            location,
            size,
            stereo_pan,
            fade_width,
            left_channel,
            right_channel,
        }
    }

    /// Distance from `point` to the nearest edge of the rectangle (0 if
    /// inside), used to find the rectangle nearest to a query point.
    pub fn distance(&self, point: Point2D) -> f32 {
        let dx = (self.location.x - point.x).max(point.x - (self.location.x + self.size.x)).max(0.0);
        let dy = (self.location.y - point.y).max(point.y - (self.location.y + self.size.y)).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.location.x + self.size.x / 2.0, self.location.y + self.size.y / 2.0)
    }

    /// Gain this rectangle contributes to `channel` for a source at
    /// `source_location`. Zero if the rectangle doesn't list `channel`.
    pub fn gain(&self, channel: usize, source_location: Point2D) -> f32 {
        if self.left_channel != channel && self.right_channel != channel {
            return 0.0;
        }

        let local_x = source_location.x - self.location.x;
        let local_y = source_location.y - self.location.y;

        let gain_y = interp4(
            [
                (-self.fade_width, 0.0),
                (0.0, 1.0),
                (self.size.y, 1.0),
                (self.size.y + self.fade_width, 0.0),
            ],
            local_y,
        );

        let gain_x = if self.left_channel == self.right_channel {
            interp4(
                [
                    (-self.fade_width, 0.0),
                    (0.0, 1.0),
                    (self.size.x, 1.0),
                    (self.size.x + self.fade_width, 0.0),
                ],
                local_x,
            )
        } else if self.left_channel == channel {
            interp4(
                [
                    (-self.fade_width, 0.0),
                    (0.0, 1.0),
                    (self.size.x, 1.0 - self.stereo_pan),
                    (self.size.x + self.fade_width, 0.0),
                ],
                local_x,
            )
        } else {
            interp4(
                [
                    (-self.fade_width, 0.0),
                    (0.0, 1.0 - self.stereo_pan),
                    (self.size.x, 1.0),
                    (self.size.x + self.fade_width, 0.0),
                ],
                local_x,
            )
        };

        gain_x * gain_y
    }
}
