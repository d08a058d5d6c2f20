use super::geometry::Point2D;

/// A physical loudspeaker used by [`Mode::Radial`](super::panner::Mode::Radial).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Loudspeaker {
    pub location: Point2D,
}

impl Loudspeaker {
    pub fn new(location: Point2D) -> Self {
        Self { location }
    }
}
