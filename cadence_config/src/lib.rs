#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the cadence sensing and cueing engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Only `[sensor]` is mandatory; every other section falls back to defaults.
//! - Persisted calibration coefficients live under `[calibration]` and are
//!   preferred at startup over the identity correction.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorPosition {
    #[default]
    Waist,
    Ankle,
}

#[derive(Debug, Deserialize)]
pub struct Sensor {
    pub position: SensorPosition,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Per-read accelerometer timeout (ms).
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_sample_rate_hz() -> u32 {
    50
}
fn default_buffer_capacity() -> usize {
    500
}
fn default_read_timeout_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Processing {
    /// Samples required before the first cadence cycle.
    pub initial_samples: usize,
    /// New samples between subsequent cycles.
    pub update_every: usize,
    /// Samples inspected by the activity gate.
    pub activity_window: usize,
    pub smoothing_window: usize,
    /// Minimum change (BPM) before a new cadence is published.
    pub hysteresis_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for Processing {
    fn default() -> Self {
        Self {
            initial_samples: 200,
            update_every: 100,
            activity_window: 50,
            smoothing_window: 5,
            hysteresis_bpm: 2.0,
            min_bpm: 40.0,
            max_bpm: 160.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Basic,
    #[default]
    HighPrecision,
    Synthesized,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    pub precision: Precision,
    /// Try the host's native beat engine first when one is available.
    pub prefer_native: bool,
    pub lookahead_ms: u64,
    pub refresh_ms: u64,
    pub volume: f32,
    /// Consecutive playback failures tolerated before the output is re-initialised.
    pub max_playback_failures: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            precision: Precision::HighPrecision,
            prefer_native: true,
            lookahead_ms: 500,
            refresh_ms: 100,
            volume: 0.8,
            max_playback_failures: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Click {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    pub waveform: Waveform,
}

impl Default for Click {
    fn default() -> Self {
        Self {
            frequency_hz: 1_000.0,
            duration_ms: 50,
            waveform: Waveform::Sine,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Reference tempos played during the calibration routine.
    pub reference_bpms: Vec<f64>,
    pub seconds_per_tempo: u64,
    /// Persisted correction; both must be present to take effect.
    pub multiplier: Option<f64>,
    pub offset: Option<f64>,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            reference_bpms: vec![80.0, 100.0, 120.0],
            seconds_per_tempo: 30,
            multiplier: None,
            offset: None,
        }
    }
}

impl CalibrationCfg {
    /// Persisted coefficients as `(multiplier, offset)` when fully specified.
    pub fn persisted(&self) -> Option<(f64, f64)> {
        match (self.multiplier, self.offset) {
            (Some(m), Some(b)) => Some((m, b)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sensor: Sensor,
    #[serde(default)]
    pub processing: Processing,
    #[serde(default)]
    pub scheduler: Scheduler,
    #[serde(default)]
    pub click: Click,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.sample_rate_hz == 0 {
            eyre::bail!("sensor.sample_rate_hz must be > 0");
        }
        if self.sensor.sample_rate_hz > 1_000 {
            eyre::bail!("sensor.sample_rate_hz is unreasonably large (>1000)");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.sensor.buffer_capacity < self.processing.initial_samples {
            eyre::bail!("sensor.buffer_capacity must be >= processing.initial_samples");
        }

        // Processing
        if self.processing.initial_samples == 0 {
            eyre::bail!("processing.initial_samples must be >= 1");
        }
        if self.processing.update_every == 0 {
            eyre::bail!("processing.update_every must be >= 1");
        }
        if self.processing.activity_window < 2 {
            eyre::bail!("processing.activity_window must be >= 2");
        }
        if self.processing.smoothing_window == 0 {
            eyre::bail!("processing.smoothing_window must be >= 1");
        }
        if !(self.processing.hysteresis_bpm >= 0.0) {
            eyre::bail!("processing.hysteresis_bpm must be >= 0");
        }
        if !(self.processing.min_bpm > 0.0 && self.processing.min_bpm < self.processing.max_bpm) {
            eyre::bail!("processing.min_bpm must be > 0 and < processing.max_bpm");
        }

        // Scheduler
        if !(0.0..=1.0).contains(&self.scheduler.volume) {
            eyre::bail!("scheduler.volume must be in [0.0, 1.0]");
        }
        if self.scheduler.lookahead_ms == 0 {
            eyre::bail!("scheduler.lookahead_ms must be >= 1");
        }
        if self.scheduler.refresh_ms == 0 || self.scheduler.refresh_ms > self.scheduler.lookahead_ms
        {
            eyre::bail!("scheduler.refresh_ms must be in [1, scheduler.lookahead_ms]");
        }

        // Click
        if !(self.click.frequency_hz > 0.0 && self.click.frequency_hz <= 20_000.0) {
            eyre::bail!("click.frequency_hz must be in (0, 20000]");
        }
        if self.click.duration_ms == 0 || self.click.duration_ms > 1_000 {
            eyre::bail!("click.duration_ms must be in [1, 1000]");
        }

        // Calibration
        if self.calibration.reference_bpms.is_empty() {
            eyre::bail!("calibration.reference_bpms must not be empty");
        }
        if self
            .calibration
            .reference_bpms
            .iter()
            .any(|b| !(10.0..=300.0).contains(b))
        {
            eyre::bail!("calibration.reference_bpms entries must be in [10, 300]");
        }
        if self.calibration.seconds_per_tempo == 0 {
            eyre::bail!("calibration.seconds_per_tempo must be >= 1");
        }
        if self.calibration.multiplier.is_some() != self.calibration.offset.is_some() {
            eyre::bail!("calibration.multiplier and calibration.offset must be set together");
        }
        if let Some(m) = self.calibration.multiplier
            && !(0.5..=2.0).contains(&m)
        {
            eyre::bail!("calibration.multiplier must be in [0.5, 2.0]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = load_toml("[sensor]\nposition = \"ankle\"\n").expect("parse");
        assert_eq!(cfg.sensor.position, SensorPosition::Ankle);
        assert_eq!(cfg.sensor.sample_rate_hz, 50);
        assert_eq!(cfg.processing.initial_samples, 200);
        assert_eq!(cfg.scheduler.precision, Precision::HighPrecision);
        assert_eq!(cfg.calibration.persisted(), None);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn persisted_requires_both_halves() {
        let cfg = load_toml(
            "[sensor]\nposition = \"waist\"\n[calibration]\nmultiplier = 1.1\n",
        )
        .expect("parse");
        assert!(cfg.validate().is_err());
    }
}
