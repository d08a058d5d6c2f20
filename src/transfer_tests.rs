use super::*;
use crate::timestamp::Timestamp;

fn make_transfer(channels: usize, slot_len: usize, ring_capacity: usize) -> AudioTransfer {
    AudioTransfer::new(channels, slot_len, 44_100.0, ring_capacity).unwrap()
}

fn fill_slot(transfer: &AudioTransfer, pts: f64, generation: u64, value: f32, len: usize) {
    let budget = usize::MAX;
    let slot = transfer.take_free_buffer(budget).expect("slot available");
    let plane = vec![value; len];
    slot.fill_planar(Timestamp::new(pts, generation), &[&plane]);
    transfer.put_ready_buffer(len);
}

#[test]
fn construction_rejects_zero_sizes() {
    assert!(AudioTransfer::new(0, 10, 44_100.0, 4).is_err());
    assert!(AudioTransfer::new(1, 0, 44_100.0, 4).is_err());
    assert!(AudioTransfer::new(1, 10, 44_100.0, 0).is_err());
}

#[test]
fn underrun_fills_silence_and_counts() {
    let transfer = make_transfer(1, 128, 4);
    let mut out = vec![1.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!(out.iter().all(|&s| s == 0.0));
    assert_eq!(transfer.buffer_underrun_counter(), 64);
}

#[test]
fn decoding_finished_disables_after_drain() {
    let transfer = make_transfer(1, 64, 4);
    fill_slot(&transfer, 0.0, 0, 0.5, 64);
    transfer.set_decoding_finished(true);

    let mut out = vec![0.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    assert!(transfer.enabled());

    let mut out2 = vec![1.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out2];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!(out2.iter().all(|&s| s == 0.0));
    assert!(!transfer.enabled());
}

#[test]
fn gain_is_applied_when_not_unity() {
    let transfer = make_transfer(1, 64, 4);
    transfer.set_gain(0.5);
    fill_slot(&transfer, 0.0, 0, 1.0, 64);

    let mut out = vec![0.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn pause_produces_silence_without_consuming() {
    let transfer = make_transfer(1, 64, 4);
    fill_slot(&transfer, 0.0, 0, 1.0, 64);
    transfer.set_play_mode(PlayMode::Pause);

    let mut out = vec![1.0f32; 32];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 32, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!(out.iter().all(|&s| s == 0.0));
    // buffer untouched: still 64 samples buffered
    assert_eq!(transfer.buffer_state_seconds(), (64.0 / 44_100.0) as f32);
}

// S5 — back-pressure: ring of 4 slots, 1024 samples each.
#[test]
fn back_pressure_budget_then_recovers_after_consumption() {
    let transfer = make_transfer(1, 1024, 4);
    // The decoder wants no more than ~1.5 buffers of lookahead queued.
    let budget = 1536;

    fill_slot(&transfer, 0.0, 0, 0.1, 1024);
    assert_eq!(transfer.buffer_state_seconds(), (1024.0 / 44_100.0) as f32);

    fill_slot(&transfer, 1.0, 0, 0.1, 1024);
    assert_eq!(transfer.ring.ready_count(), 2);

    // samples_in_buffers is now 2048 > 1536: back-pressure kicks in.
    assert!(transfer.take_free_buffer(budget).is_none());

    let mut out = vec![0.0f32; 1024];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 1024, CallbackTime { output_time_seconds: 0.0 });
    }

    assert!(transfer.take_free_buffer(budget).is_some());
}

// S6 — seek invalidates stale audio.
#[test]
fn seek_skips_stale_generations() {
    let transfer = make_transfer(1, 64, 4);
    fill_slot(&transfer, 0.0, 0, -1.0, 64); // stale, generation 0
    fill_slot(&transfer, 0.0, 0, -1.0, 64); // stale, generation 0
    transfer.set_seek_generation(1);
    fill_slot(&transfer, 0.0, 1, 1.0, 64); // fresh, generation 1

    let mut out = vec![0.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!(out.iter().all(|&s| (s - 1.0).abs() < 1e-6));
    assert_eq!(transfer.last_pts().seek_generation, 1);
}

#[test]
fn monotonic_pts_across_callbacks() {
    let transfer = make_transfer(1, 128, 4);
    fill_slot(&transfer, 0.0, 0, 0.2, 128);

    let mut out = vec![0.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 0.0 });
    }
    let first_last = transfer.last_pts();

    let mut out2 = vec![0.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out2];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 64.0 / 44_100.0 });
    }
    let second_last = transfer.last_pts();
    assert!(second_last >= first_last);
}

#[test]
fn to_pts_never_overshoots_last_delivered_sample() {
    let transfer = make_transfer(1, 64, 4);
    fill_slot(&transfer, 0.0, 0, 0.0, 64);
    let mut out = vec![0.0f32; 64];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut out];
        transfer.process(&mut channels, 64, CallbackTime { output_time_seconds: 10.0 });
    }
    let far_future = transfer.to_pts(1_000_000.0);
    assert!(far_future <= transfer.last_pts());
}

#[test]
fn fill_interleaved_roundtrips_through_transfer() {
    let transfer = make_transfer(2, 64, 4);
    let samples = transfer.take_free_buffer(usize::MAX).unwrap();
    let interleaved = [100i16, -100, 200, -200];
    samples.fill_interleaved(Timestamp::ZERO, &interleaved, 2);
    transfer.put_ready_buffer(2);

    let mut left = vec![0.0f32; 2];
    let mut right = vec![0.0f32; 2];
    {
        let mut channels: Vec<&mut [f32]> = vec![&mut left, &mut right];
        transfer.process(&mut channels, 2, CallbackTime { output_time_seconds: 0.0 });
    }
    assert!((left[0] - 100.0 / 65536.0).abs() < 1e-6);
    assert!((right[0] - (-100.0 / 65536.0)).abs() < 1e-6);
}
