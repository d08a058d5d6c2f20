//! Persistable snapshot of a [`Panner`](super::panner::Panner)'s
//! configuration, round-tripped through `serde`.

use serde::{Deserialize, Serialize};

use super::geometry::Point2D;
use super::panner::Mode;
use super::rectangle::SoundRectangle;
use super::speaker::Loudspeaker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PannerConfig {
    pub mode: Mode,
    pub max_radius: f32,
    pub speakers: Vec<Point2D>,
    pub rectangles: Vec<SoundRectangle>,
}

impl PannerConfig {
    pub fn speaker_locations(&self) -> Vec<Loudspeaker> {
        self.speakers.iter().copied().map(Loudspeaker::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let config = PannerConfig {
            mode: Mode::Rectangles,
            max_radius: 1500.0,
            speakers: vec![Point2D::new(0.0, 540.0), Point2D::new(1920.0, 540.0)],
            rectangles: vec![SoundRectangle::new(Point2D::ZERO, Point2D::new(100.0, 100.0), 0.3, 10.0, 0, 1)],
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: PannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
