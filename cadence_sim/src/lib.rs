//! Simulated devices for running the cadence engine without hardware.
//!
//! - `SimulatedWalker`: deterministic accelerometer with a settable cadence
//! - `SimulatedClickOutput`: records clicks, with failure injection
//! - `SimulatedNativeEngine`: host fast-path stand-in
//! - `AcceleratedClock`: real clock running faster than wall time

pub mod click;
pub mod clock;
pub mod error;
pub mod native;
pub mod walker;

pub use click::{ClickRecord, SimulatedClickOutput, render_click};
pub use clock::AcceleratedClock;
pub use error::SimError;
pub use native::{NativeSnapshot, SimulatedNativeEngine};
pub use walker::{CadenceHandle, SimulatedWalker, XorShift};

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_traits::{Accelerometer, ClickOutput, ClickSound, NativeBeatEngine, Waveform};
    use rstest::rstest;
    use std::time::Duration;

    #[test]
    fn walker_is_deterministic_per_seed() {
        let mut a = SimulatedWalker::new(50).with_cadence(100.0).with_seed(7);
        let mut b = SimulatedWalker::new(50).with_cadence(100.0).with_seed(7);
        for _ in 0..20 {
            assert_eq!(a.next_reading(), b.next_reading());
        }
    }

    #[test]
    fn walker_timestamps_follow_the_grid() {
        let mut w = SimulatedWalker::new(50);
        let stamps: Vec<u64> = (0..4).map(|_| w.next_reading().timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 20, 40, 60]);
    }

    #[test]
    fn standing_walker_reads_gravity() {
        let mut w = SimulatedWalker::new(50).with_noise(0.0);
        let r = w.next_reading();
        assert_eq!((r.x, r.y, r.z), (0.0, 0.0, walker::GRAVITY));
    }

    #[test]
    fn injected_read_failures_time_out() {
        let mut w = SimulatedWalker::new(50);
        w.fail_next_reads(2);
        let timeout = Duration::from_millis(10);
        assert!(w.read(timeout).is_err());
        assert!(w.read(timeout).is_err());
        assert!(w.read(timeout).is_ok());
    }

    #[test]
    fn cadence_handle_is_shared() {
        let w = SimulatedWalker::new(50);
        let h = w.cadence_handle();
        h.set(112.0);
        assert_eq!(w.cadence_handle().get(), 112.0);
    }

    #[rstest]
    #[case(Waveform::Sine)]
    #[case(Waveform::Square)]
    #[case(Waveform::Triangle)]
    #[case(Waveform::Sawtooth)]
    fn rendered_click_respects_volume(#[case] waveform: Waveform) {
        let sound = ClickSound {
            frequency_hz: 1_000.0,
            duration_ms: 50,
            waveform,
        };
        let pcm = render_click(&sound, 0.5, 44_100);
        assert_eq!(pcm.len(), 2_205);
        let peak = pcm.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.5 + 1e-6);
        assert!(peak > 0.3, "peak {peak}");
        assert_eq!(pcm[0], 0.0);
    }

    #[test]
    fn click_output_records_and_recovers() {
        let mut out = SimulatedClickOutput::new();
        let played = out.clone();
        assert!(out.play(1.0).is_err(), "play before prepare");
        out.prepare(&ClickSound::default()).expect("prepare");
        out.play(0.8).expect("play");
        played.fail_until_reset();
        assert!(out.play(0.8).is_err());
        out.reset().expect("reset");
        out.prepare(&ClickSound::default()).expect("prepare");
        out.play(0.8).expect("play");
        assert_eq!(played.click_count(), 2);
        assert_eq!(played.resets(), 1);
        assert!((played.clicks()[0].volume - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn native_engine_modes() {
        let mut failing = SimulatedNativeEngine::failing();
        assert!(failing.is_available());
        assert!(
            failing
                .start(120.0, Duration::from_millis(500), &ClickSound::default(), 0.8)
                .is_err()
        );
        assert!(!SimulatedNativeEngine::unavailable().is_available());

        let mut ok = SimulatedNativeEngine::available();
        ok.start(120.0, Duration::from_millis(500), &ClickSound::default(), 0.8)
            .expect("start");
        let snap = ok.snapshot();
        assert!(snap.running);
        assert_eq!(snap.lookahead_ms, 500);
        ok.stop().expect("stop");
        assert!(!ok.snapshot().running);
    }
}
