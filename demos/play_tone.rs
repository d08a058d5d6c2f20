//! Manual smoke test for the `cpal-backend` feature: wires a single sine-wave
//! source through the panner and limiter to the default output device.
//!
//! Run with: `cargo run --features cpal-backend --bin play_tone`

use std::thread;
use std::time::Duration;

use resonant_audio::backend::CpalOutputBackend;
use resonant_audio::graph::AudioSource;
use resonant_audio::transfer::CallbackTime;
use resonant_audio::{GraphRoot, Mode};

struct SineSource {
    frequency_hz: f32,
    sample_rate: f32,
    phase: std::sync::atomic::AtomicU32,
}

impl SineSource {
    fn new(frequency_hz: f32, sample_rate: f32) -> Self {
        Self {
            frequency_hz,
            sample_rate,
            phase: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

impl AudioSource for SineSource {
    fn channel_count(&self) -> usize {
        1
    }

    fn process(&self, out: &mut [&mut [f32]], n: usize, _callback_time: CallbackTime) {
        use std::sync::atomic::Ordering;
        let step = self.frequency_hz / self.sample_rate;
        let mut phase = f32::from_bits(self.phase.load(Ordering::Relaxed));
        for sample in out[0][..n].iter_mut() {
            *sample = (phase * std::f32::consts::TAU).sin() * 0.2;
            phase = (phase + step).fract();
        }
        self.phase.store(phase.to_bits(), Ordering::Relaxed);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut graph = GraphRoot::new(Mode::Radial, 1024);
    graph.panner_mut().replace_speakers(vec![
        resonant_audio::panner::Loudspeaker::new(resonant_audio::panner::Point2D::new(-1.0, 0.0)),
        resonant_audio::panner::Loudspeaker::new(resonant_audio::panner::Point2D::new(1.0, 0.0)),
    ]);
    graph.panner_mut().set_max_radius(2.0);
    graph.set_limiter_params(0.9, 64, 4096);
    graph.sync_topology();

    graph.add_panned_source(Box::new(SineSource::new(440.0, 44_100.0)));
    graph.panner_mut().add_source(b"tone".to_vec());
    graph
        .panner_mut()
        .set_source_location(b"tone", b"only", resonant_audio::panner::Point2D::new(0.0, 0.0))
        .expect("source was just registered");

    let backend = CpalOutputBackend::start(graph, 1024).expect("failed to start output stream");
    tracing::info!("playing a 440Hz tone for 3 seconds, ctrl-c to stop early");
    thread::sleep(Duration::from_secs(3));
    backend.pause().ok();
}
