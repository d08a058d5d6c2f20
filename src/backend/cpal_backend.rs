//! Optional adapter that drives a [`GraphRoot`] from a real `cpal` output
//! stream. Demonstrates the contract described for the hardware callback
//! driver; not part of the core audio algorithms.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};

use crate::graph::GraphRoot;
use crate::transfer::CallbackTime;

/// Owns the live `cpal::Stream`; dropping it stops playback.
pub struct CpalOutputBackend {
    stream: Stream,
}

impl CpalOutputBackend {
    /// Opens the default output device and starts driving `graph` from its
    /// callback. `graph` must already be configured with a channel count
    /// matching the device (call `sync_topology` first).
    pub fn start(mut graph: GraphRoot, max_block_size: usize) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no default output device available".to_string())?;

        let supported = device
            .default_output_config()
            .map_err(|e| format!("failed to get device config: {e}"))?;

        let channel_count = supported.channels() as usize;
        let config = StreamConfig {
            channels: channel_count as u16,
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        // Deinterleave/reinterleave scratch, preallocated once; the
        // callback itself never allocates.
        let mut planar: Vec<Vec<f32>> = (0..channel_count).map(|_| vec![0.0f32; max_block_size]).collect();

        let err_fn = |err| tracing::error!(%err, "cpal output stream error");

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
                    let n = (data.len() / channel_count).min(max_block_size);
                    let output_time_seconds = info
                        .timestamp()
                        .playback
                        .duration_since(&info.timestamp().callback)
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0);

                    {
                        let mut channels: Vec<&mut [f32]> =
                            planar.iter_mut().map(|c| &mut c[..n]).collect();
                        graph.process(&mut channels, n, CallbackTime { output_time_seconds });
                    }

                    for frame in 0..n {
                        for c in 0..channel_count {
                            data[frame * channel_count + c] = planar[c][frame];
                        }
                    }
                    for sample in data[n * channel_count..].iter_mut() {
                        *sample = 0.0;
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| format!("failed to build output stream: {e}"))?;

        stream.play().map_err(|e| format!("failed to start stream: {e}"))?;

        Ok(Self { stream })
    }

    pub fn pause(&self) -> Result<(), String> {
        self.stream.pause().map_err(|e| e.to_string())
    }

    pub fn play(&self) -> Result<(), String> {
        self.stream.play().map_err(|e| e.to_string())
    }
}
