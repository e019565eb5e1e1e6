//! `From` implementations bridging `cadence_config` types to `cadence_core` types.

use cadence_traits::{ClickSound, Waveform};

use crate::calibration::CalibrationCoefficients;
use crate::config::{PrecisionMode, SchedulerCfg, SensingCfg, SensorPosition};

// ── SensingCfg ───────────────────────────────────────────────────────────────

impl From<cadence_config::SensorPosition> for SensorPosition {
    fn from(p: cadence_config::SensorPosition) -> Self {
        match p {
            cadence_config::SensorPosition::Waist => SensorPosition::Waist,
            cadence_config::SensorPosition::Ankle => SensorPosition::Ankle,
        }
    }
}

impl From<&cadence_config::Config> for SensingCfg {
    fn from(c: &cadence_config::Config) -> Self {
        Self {
            position: c.sensor.position.into(),
            sample_rate_hz: c.sensor.sample_rate_hz,
            buffer_capacity: c.sensor.buffer_capacity,
            initial_samples: c.processing.initial_samples,
            update_every: c.processing.update_every,
            activity_window: c.processing.activity_window,
            smoothing_window: c.processing.smoothing_window,
            hysteresis_bpm: c.processing.hysteresis_bpm,
            min_bpm: c.processing.min_bpm,
            max_bpm: c.processing.max_bpm,
            read_timeout_ms: c.sensor.read_timeout_ms,
        }
    }
}

// ── SchedulerCfg ─────────────────────────────────────────────────────────────

impl From<cadence_config::Precision> for PrecisionMode {
    fn from(p: cadence_config::Precision) -> Self {
        match p {
            cadence_config::Precision::Basic => PrecisionMode::Basic,
            cadence_config::Precision::HighPrecision => PrecisionMode::HighPrecision,
            cadence_config::Precision::Synthesized => PrecisionMode::Synthesized,
        }
    }
}

impl From<&cadence_config::Scheduler> for SchedulerCfg {
    fn from(c: &cadence_config::Scheduler) -> Self {
        Self {
            precision: c.precision.into(),
            prefer_native: c.prefer_native,
            lookahead_ms: c.lookahead_ms,
            refresh_ms: c.refresh_ms,
            volume: c.volume,
            max_playback_failures: c.max_playback_failures,
        }
    }
}

// ── ClickSound ───────────────────────────────────────────────────────────────

/// `ClickSound` lives in `cadence_traits`, so this is a function rather than a `From` impl.
pub fn click_sound(c: &cadence_config::Click) -> ClickSound {
    let waveform = match c.waveform {
        cadence_config::Waveform::Sine => Waveform::Sine,
        cadence_config::Waveform::Square => Waveform::Square,
        cadence_config::Waveform::Triangle => Waveform::Triangle,
        cadence_config::Waveform::Sawtooth => Waveform::Sawtooth,
    };
    ClickSound {
        frequency_hz: c.frequency_hz,
        duration_ms: c.duration_ms,
        waveform,
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&cadence_config::CalibrationCfg> for CalibrationCoefficients {
    fn from(c: &cadence_config::CalibrationCfg) -> Self {
        match c.persisted() {
            Some((multiplier, offset)) => CalibrationCoefficients::new(multiplier, offset),
            None => CalibrationCoefficients::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_sound_carries_timbre() {
        let click = cadence_config::Click {
            frequency_hz: 880.0,
            duration_ms: 30,
            waveform: cadence_config::Waveform::Square,
        };
        let sound = click_sound(&click);
        assert_eq!(sound.waveform, Waveform::Square);
        assert_eq!(sound.frequency_hz, 880.0);
        assert_eq!(sound.duration_ms, 30);
    }

    #[test]
    fn default_click_matches_default_sound() {
        assert_eq!(
            click_sound(&cadence_config::Click::default()),
            ClickSound::default()
        );
    }
}
