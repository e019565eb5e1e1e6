//! Cadence calibration against known reference tempos.
//!
//! The engine records `(target, measured)` pairs while the beat scheduler plays
//! a known tempo and fits `target ≈ multiplier * measured + offset` by ordinary
//! least squares. Degenerate fits fall back to the identity correction.
//!
//! Accuracy verification is separate: it only produces a trust readout and
//! never touches the coefficients.

use std::sync::Arc;

use crate::signal::{AccuracyReadout, SignalHub};

/// Points closer than this (BPM) to an existing target replace it.
pub const POINT_MATCH_BPM: f64 = 5.0;
pub const MIN_MULTIPLIER: f64 = 0.5;
pub const MAX_MULTIPLIER: f64 = 2.0;
/// Neutral points present before any calibration has run.
pub const SEED_TARGETS: [f64; 3] = [80.0, 100.0, 120.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub target_bpm: f64,
    pub measured_bpm: f64,
    /// `measured - target`
    pub error: f64,
}

impl CalibrationPoint {
    pub fn new(target_bpm: f64, measured_bpm: f64) -> Self {
        Self {
            target_bpm,
            measured_bpm,
            error: measured_bpm - target_bpm,
        }
    }
}

/// Linear correction applied to fused cadence: `bpm * multiplier + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCoefficients {
    pub multiplier: f64,
    pub offset: f64,
}

impl Default for CalibrationCoefficients {
    fn default() -> Self {
        Self::identity()
    }
}

impl CalibrationCoefficients {
    pub const fn identity() -> Self {
        Self {
            multiplier: 1.0,
            offset: 0.0,
        }
    }

    /// Validated constructor; out-of-range or non-finite input yields identity.
    pub fn new(multiplier: f64, offset: f64) -> Self {
        if multiplier.is_finite()
            && offset.is_finite()
            && (MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&multiplier)
        {
            Self { multiplier, offset }
        } else {
            Self::identity()
        }
    }

    #[inline]
    pub fn apply(&self, bpm: f64) -> f64 {
        bpm * self.multiplier + self.offset
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Closed-form least squares with `x = measured`, `y = target`.
pub fn fit_coefficients(points: &[CalibrationPoint]) -> CalibrationCoefficients {
    if points.len() < 2 {
        return CalibrationCoefficients::identity();
    }
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for p in points {
        let (x, y) = (p.measured_bpm, p.target_bpm);
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }
    let denom = n * sxx - sx * sx;
    // Relative guard: the raw sums scale with BPM², so compare against that scale.
    if !denom.is_finite() || denom.abs() <= 1e-9 * (n * sxx).max(1.0) {
        return CalibrationCoefficients::identity();
    }
    let multiplier = (n * sxy - sx * sy) / denom;
    let offset = (sy - multiplier * sx) / n;
    CalibrationCoefficients::new(multiplier, offset)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    Idle,
    Calibrating { target_bpm: f64 },
}

/// Outcome of one `stop_calibration` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    pub success: bool,
    pub target_bpm: f64,
    /// Median of the collected values; 0 on failure.
    pub measured_bpm: f64,
    pub error: f64,
    pub coefficients: CalibrationCoefficients,
    /// Full point set after the update, for display and diagnostics.
    pub points: Vec<CalibrationPoint>,
}

#[derive(Debug)]
pub struct CalibrationEngine {
    state: CalibrationState,
    collected: Vec<f64>,
    points: Vec<CalibrationPoint>,
    verification_errors: Vec<f64>,
    hub: Arc<SignalHub>,
}

impl CalibrationEngine {
    /// New engine seeded with neutral points. Coefficients already held by the
    /// hub (e.g. persisted ones) stay in effect until the first refit.
    pub fn new(hub: Arc<SignalHub>) -> Self {
        let points = SEED_TARGETS
            .iter()
            .map(|&t| CalibrationPoint::new(t, t))
            .collect();
        Self {
            state: CalibrationState::Idle,
            collected: Vec::new(),
            points,
            verification_errors: Vec::new(),
            hub,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrating { .. })
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn coefficients(&self) -> CalibrationCoefficients {
        self.hub.coefficients()
    }

    pub fn collected(&self) -> usize {
        self.collected.len()
    }

    /// Enter `Calibrating(target)`. Any previous capture is discarded.
    ///
    /// The caller is responsible for clearing the cadence smoothing history
    /// and for playing `target_bpm` on the beat scheduler.
    pub fn start_calibration(&mut self, target_bpm: f64) {
        let target_bpm = crate::util::clamp_tempo(target_bpm);
        self.collected.clear();
        self.state = CalibrationState::Calibrating { target_bpm };
        tracing::info!(target_bpm, "calibration started");
    }

    /// Feed one calibrated cadence value; ignored unless calibrating.
    pub fn observe(&mut self, calibrated_bpm: f64) {
        if self.is_calibrating() && calibrated_bpm.is_finite() && calibrated_bpm > 0.0 {
            self.collected.push(calibrated_bpm);
        }
    }

    /// Finish the capture, update the point set and refit.
    ///
    /// Returns `None` when no calibration was in progress.
    pub fn stop_calibration(&mut self) -> Option<CalibrationResult> {
        let CalibrationState::Calibrating { target_bpm } = self.state else {
            return None;
        };
        self.state = CalibrationState::Idle;
        let collected = std::mem::take(&mut self.collected);

        let Some(measured_bpm) = crate::util::median(&collected) else {
            let coefficients = self.hub.coefficients();
            tracing::warn!(target_bpm, "calibration failed: no cadence samples collected");
            return Some(CalibrationResult {
                success: false,
                target_bpm,
                measured_bpm: 0.0,
                error: 0.0,
                coefficients,
                points: self.points.clone(),
            });
        };

        let point = CalibrationPoint::new(target_bpm, measured_bpm);
        self.upsert(point);
        let coefficients = fit_coefficients(&self.points);
        self.hub.publish_coefficients(coefficients);
        tracing::info!(
            target_bpm,
            measured_bpm,
            error = point.error,
            samples = collected.len(),
            multiplier = coefficients.multiplier,
            offset = coefficients.offset,
            "calibration complete"
        );
        Some(CalibrationResult {
            success: true,
            target_bpm,
            measured_bpm,
            error: point.error,
            coefficients,
            points: self.points.clone(),
        })
    }

    /// Abandon the capture without touching the point set or the coefficients.
    ///
    /// Returns a failed result carrying the current fit, or `None` when idle.
    pub fn cancel(&mut self) -> Option<CalibrationResult> {
        let CalibrationState::Calibrating { target_bpm } = self.state else {
            return None;
        };
        self.state = CalibrationState::Idle;
        let discarded = std::mem::take(&mut self.collected).len();
        tracing::warn!(target_bpm, discarded, "calibration cancelled; capture discarded");
        Some(CalibrationResult {
            success: false,
            target_bpm,
            measured_bpm: 0.0,
            error: 0.0,
            coefficients: self.hub.coefficients(),
            points: self.points.clone(),
        })
    }

    fn upsert(&mut self, point: CalibrationPoint) {
        match self
            .points
            .iter_mut()
            .find(|p| (p.target_bpm - point.target_bpm).abs() < POINT_MATCH_BPM)
        {
            Some(existing) => *existing = point,
            None => self.points.push(point),
        }
    }

    /// Compare the published cadence to a known reference and update the trust readout.
    pub fn verify_accuracy(&mut self, known_bpm: f64) -> AccuracyReadout {
        if !(known_bpm.is_finite() && known_bpm > 0.0) {
            return self.hub.accuracy();
        }
        let current = self.hub.cadence().bpm;
        let error_pct = (current - known_bpm).abs() / known_bpm * 100.0;
        self.verification_errors.push(error_pct);
        let avg = self.verification_errors.iter().sum::<f64>()
            / self.verification_errors.len() as f64;
        let readout = AccuracyReadout {
            avg_error_pct: avg,
            accuracy_pct: (100.0 - avg).clamp(0.0, 100.0),
            confidence: (1.0 - avg / 20.0).clamp(0.0, 1.0),
            verifications: self.verification_errors.len(),
        };
        self.hub.publish_accuracy(readout);
        tracing::debug!(known_bpm, current, error_pct, avg, "accuracy verified");
        readout
    }

    /// Drop all verification history.
    pub fn reset_verification(&mut self) {
        self.verification_errors.clear();
        self.hub.publish_accuracy(AccuracyReadout::default());
    }
}
