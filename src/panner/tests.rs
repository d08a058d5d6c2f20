use approx::assert_abs_diff_eq;

use super::*;
use crate::panner::geometry::{self, RAMP_INTERP_SAMPLES};

/// Drives `panner.process` with silent input until every pipe's ramp has
/// settled, so assertions can read a stabilized gain.
fn settle(panner: &mut Panner, source_count: usize) {
    let input = vec![0.0f32; 64];
    let inputs: Vec<&[f32]> = (0..source_count).map(|_| input.as_slice()).collect();
    let channel_count = panner.channel_count().max(1);
    let mut scratch: Vec<Vec<f32>> = (0..channel_count).map(|_| vec![0.0f32; 64]).collect();

    let mut remaining = RAMP_INTERP_SAMPLES as usize;
    while remaining > 0 {
        let chunk = remaining.min(64);
        let mut out: Vec<&mut [f32]> = scratch.iter_mut().map(|c| c.as_mut_slice()).collect();
        panner.process(&inputs, &mut out, chunk);
        remaining -= chunk;
    }
}

fn pipe_gain(panner: &Panner, source_index: usize, channel: usize) -> f32 {
    panner
        .sources_for_test()[source_index]
        .pipes
        .iter()
        .find(|p| p.to == channel)
        .map(|p| p.ramp.value())
        .unwrap_or(0.0)
}

// test-only accessor: keeps Panner's fields private to production callers
// while letting the test module inspect pipe state directly.
impl Panner {
    fn sources_for_test(&self) -> &[geometry::Source] {
        &self.sources
    }
}

#[test]
fn s3_radial_single_speaker() {
    let mut panner = Panner::new(Mode::Radial);
    panner.replace_speakers(vec![Loudspeaker::new(Point2D::new(0.0, 0.0))]);
    panner.set_max_radius(1000.0);
    panner.add_source(b"a".to_vec());
    panner.set_source_location(b"a", b"p", Point2D::new(500.0, 0.0)).unwrap();

    settle(&mut panner, 1);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 0), 1.0, epsilon = 1e-4);

    panner.set_source_location(b"a", b"p", Point2D::new(2000.0, 0.0)).unwrap();
    settle(&mut panner, 1);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 0), 0.0, epsilon = 1e-4);
}

#[test]
fn s4_rectangle_stereo_fade_through_panner() {
    let mut panner = Panner::new(Mode::Rectangles);
    panner.add_rectangle(SoundRectangle::new(
        Point2D::ZERO,
        Point2D::new(1000.0, 1000.0),
        0.3,
        100.0,
        0,
        1,
    ));
    panner.add_source(b"src".to_vec());
    panner
        .set_source_location(b"src", b"p", Point2D::new(0.0, 500.0))
        .unwrap();

    settle(&mut panner, 1);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 0), 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 1), 0.7, epsilon = 1e-4);
}

#[test]
fn radial_conservation_gain_never_exceeds_one() {
    let mut panner = Panner::new(Mode::Radial);
    panner.replace_speakers(vec![
        Loudspeaker::new(Point2D::new(0.0, 0.0)),
        Loudspeaker::new(Point2D::new(1000.0, 0.0)),
    ]);
    panner.set_max_radius(1000.0);
    panner.add_source(b"a".to_vec());
    panner.set_source_location(b"a", b"p", Point2D::new(0.0, 0.0)).unwrap();

    settle(&mut panner, 1);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 0), 1.0, epsilon = 1e-4);
    assert!(pipe_gain(&panner, 0, 1) <= 1.0);
}

#[test]
fn multi_location_source_takes_max_not_sum() {
    let mut panner = Panner::new(Mode::Radial);
    panner.replace_speakers(vec![Loudspeaker::new(Point2D::new(0.0, 0.0))]);
    panner.set_max_radius(1000.0);
    panner.add_source(b"dup".to_vec());
    // Both locations are exactly on the speaker: gain should still cap at 1,
    // not 2, confirming duplication doesn't inflate loudness.
    panner
        .set_source_location(b"dup", b"left-copy", Point2D::new(0.0, 0.0))
        .unwrap();
    panner
        .set_source_location(b"dup", b"right-copy", Point2D::new(0.0, 0.0))
        .unwrap();

    settle(&mut panner, 1);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 0), 1.0, epsilon = 1e-4);
}

#[test]
fn set_location_then_clear_restores_topology() {
    let mut panner = Panner::new(Mode::Radial);
    panner.replace_speakers(vec![Loudspeaker::new(Point2D::new(0.0, 0.0))]);
    panner.set_max_radius(1000.0);
    panner.add_source(b"a".to_vec());

    panner.set_source_location(b"a", b"p", Point2D::new(0.0, 0.0)).unwrap();
    settle(&mut panner, 1);
    let pipe_count_before = panner.sources_for_test()[0].pipes.len();

    panner.clear_source_location(b"a", b"p").unwrap();
    settle(&mut panner, 1);

    assert_eq!(panner.sources_for_test()[0].pipes.len(), pipe_count_before);
    assert_abs_diff_eq!(pipe_gain(&panner, 0, 0), 0.0, epsilon = 1e-4);
}

#[test]
fn setting_same_mode_twice_bumps_generation_only() {
    let mut panner = Panner::new(Mode::Radial);
    let before = panner.generation();
    panner.set_mode(Mode::Radial);
    panner.set_mode(Mode::Radial);
    assert_eq!(panner.generation(), before + 2);
    assert_eq!(panner.mode(), Mode::Radial);
}

#[test]
fn unknown_source_location_is_reported_not_panicked() {
    let mut panner = Panner::new(Mode::Radial);
    let err = panner.set_source_location(b"ghost", b"p", Point2D::ZERO).unwrap_err();
    assert!(matches!(err, crate::error::PannerError::UnknownSource(id) if id == b"ghost"));
}

#[test]
fn locate_channel_picks_nearest_speaker() {
    let mut panner = Panner::new(Mode::Radial);
    panner.replace_speakers(vec![
        Loudspeaker::new(Point2D::new(0.0, 0.0)),
        Loudspeaker::new(Point2D::new(1000.0, 0.0)),
    ]);
    assert_eq!(panner.locate_channel(Point2D::new(10.0, 0.0)), 0);
    assert_eq!(panner.locate_channel(Point2D::new(990.0, 0.0)), 1);
}

#[test]
fn config_round_trip_preserves_live_state() {
    let mut panner = Panner::new(Mode::Radial);
    panner.replace_speakers(vec![Loudspeaker::new(Point2D::new(0.0, 540.0))]);
    panner.set_max_radius(1200.0);

    let config = panner.to_config();
    let mut other = Panner::new(Mode::Rectangles);
    other.apply_config(&config);

    assert_eq!(other.to_config(), config);
}
