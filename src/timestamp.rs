//! Presentation timestamps and seek-generation freshness.

use std::cmp::Ordering;

/// A presentation timestamp paired with the seek generation it was produced
/// under.
///
/// Ordering is lexicographic on `(seek_generation, pts)`: timestamps from
/// different generations are incomparable for *content* (a pts of 4.0 under
/// generation 2 is not "later" than a pts of 1.0 under generation 3 in any
/// musical sense) but still need a total order so the transfer can reason
/// about freshness without special-casing every comparison site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamp {
    pub pts: f64,
    pub seek_generation: u64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp {
        pts: 0.0,
        seek_generation: 0,
    };

    pub fn new(pts: f64, seek_generation: u64) -> Self {
        Self { pts, seek_generation }
    }

    /// Returns a copy advanced by `seconds`, generation unchanged.
    pub fn advanced(&self, seconds: f64) -> Self {
        Self {
            pts: self.pts + seconds,
            seek_generation: self.seek_generation,
        }
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seek_generation
            .cmp(&other.seek_generation)
            .then_with(|| self.pts.partial_cmp(&other.pts).unwrap_or(Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_generation_first() {
        let a = Timestamp::new(100.0, 0);
        let b = Timestamp::new(0.0, 1);
        assert!(a < b);
    }

    #[test]
    fn orders_by_pts_within_generation() {
        let a = Timestamp::new(1.0, 5);
        let b = Timestamp::new(2.0, 5);
        assert!(a < b);
    }

    #[test]
    fn advanced_keeps_generation() {
        let a = Timestamp::new(1.0, 3);
        let b = a.advanced(0.5);
        assert_eq!(b.seek_generation, 3);
        assert!((b.pts - 1.5).abs() < 1e-12);
    }
}
