//! Runtime configuration types for the sensing pipeline and beat scheduler.
//!
//! These are separate from the TOML-deserialized config in `cadence_config`;
//! see `conversions` for the bridge.

/// Where the sensor is worn. Selects a fixed filter/threshold profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorPosition {
    #[default]
    Waist,
    Ankle,
}

/// Filter and threshold tuple for one sensor placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionProfile {
    pub low_cut_hz: f64,
    pub high_cut_hz: f64,
    /// Minimum magnitude standard deviation (m/s²) to count as walking.
    pub activity_threshold: f64,
    /// Peak height in standard deviations of the filtered series.
    pub peak_threshold: f64,
}

impl SensorPosition {
    pub fn profile(self) -> PositionProfile {
        match self {
            SensorPosition::Waist => PositionProfile {
                low_cut_hz: 0.5,
                high_cut_hz: 3.0,
                activity_threshold: 0.15,
                peak_threshold: 0.5,
            },
            // Limb acceleration is larger at the ankle.
            SensorPosition::Ankle => PositionProfile {
                low_cut_hz: 0.5,
                high_cut_hz: 4.0,
                activity_threshold: 0.30,
                peak_threshold: 0.6,
            },
        }
    }
}

/// Sensing pipeline configuration.
#[derive(Debug, Clone)]
pub struct SensingCfg {
    pub position: SensorPosition,
    pub sample_rate_hz: u32,
    /// Ring capacity in samples (≈10 s at 50 Hz).
    pub buffer_capacity: usize,
    /// Buffer length that triggers the first processing cycle.
    pub initial_samples: usize,
    /// New samples between subsequent cycles.
    pub update_every: usize,
    pub activity_window: usize,
    pub smoothing_window: usize,
    pub hysteresis_bpm: f64,
    /// Physiological band; estimates outside it are discarded.
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Max accelerometer wait per read (ms).
    pub read_timeout_ms: u64,
}

impl Default for SensingCfg {
    fn default() -> Self {
        Self {
            position: SensorPosition::Waist,
            sample_rate_hz: 50,
            buffer_capacity: 500,
            initial_samples: 200,
            update_every: 100,
            activity_window: 50,
            smoothing_window: 5,
            hysteresis_bpm: 2.0,
            min_bpm: 40.0,
            max_bpm: 160.0,
            read_timeout_ms: 100,
        }
    }
}

impl SensingCfg {
    pub fn profile(&self) -> PositionProfile {
        self.position.profile()
    }
}

/// In-process timing strategy of the beat scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionMode {
    /// Coarse periodic check; accepts accumulated drift.
    Basic,
    /// Look-ahead queue drained by a tempo-scaled fast poll.
    #[default]
    HighPrecision,
    /// 1 ms poll with drift-corrected absolute deadlines.
    Synthesized,
}

impl PrecisionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PrecisionMode::Basic => "basic",
            PrecisionMode::HighPrecision => "high_precision",
            PrecisionMode::Synthesized => "synthesized",
        }
    }
}

/// Beat scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerCfg {
    pub precision: PrecisionMode,
    pub prefer_native: bool,
    pub lookahead_ms: u64,
    pub refresh_ms: u64,
    pub volume: f32,
    pub max_playback_failures: u32,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            precision: PrecisionMode::HighPrecision,
            prefer_native: true,
            lookahead_ms: 500,
            refresh_ms: 100,
            volume: 0.8,
            max_playback_failures: 3,
        }
    }
}
