//! Published single-writer/multi-reader values.
//!
//! Each cell is replaced wholesale on update; readers take cheap snapshots
//! and never observe a half-written value.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::calibration::CalibrationCoefficients;

/// The published cadence reading. `bpm == 0.0` means "not walking".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CadenceSignal {
    pub bpm: f64,
    pub is_walking: bool,
    pub accuracy_pct: f64,
    pub confidence: f64,
}

/// Trust signal derived from accuracy verification runs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccuracyReadout {
    pub avg_error_pct: f64,
    pub accuracy_pct: f64,
    pub confidence: f64,
    pub verifications: usize,
}

/// Shared cells written by exactly one subsystem each:
/// the tracker writes `cadence`, the calibration engine writes
/// `coefficients` and `accuracy`.
#[derive(Debug)]
pub struct SignalHub {
    cadence: ArcSwap<CadenceSignal>,
    coefficients: ArcSwap<CalibrationCoefficients>,
    accuracy: ArcSwap<AccuracyReadout>,
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new(CalibrationCoefficients::identity())
    }
}

impl SignalHub {
    pub fn new(coefficients: CalibrationCoefficients) -> Self {
        Self {
            cadence: ArcSwap::from_pointee(CadenceSignal::default()),
            coefficients: ArcSwap::from_pointee(coefficients),
            accuracy: ArcSwap::from_pointee(AccuracyReadout::default()),
        }
    }

    pub fn shared(coefficients: CalibrationCoefficients) -> Arc<Self> {
        Arc::new(Self::new(coefficients))
    }

    /// Current cadence with the latest accuracy readout folded in.
    pub fn cadence(&self) -> CadenceSignal {
        let acc = self.accuracy();
        CadenceSignal {
            accuracy_pct: acc.accuracy_pct,
            confidence: acc.confidence,
            ..**self.cadence.load()
        }
    }

    pub fn coefficients(&self) -> CalibrationCoefficients {
        **self.coefficients.load()
    }

    pub fn accuracy(&self) -> AccuracyReadout {
        **self.accuracy.load()
    }

    pub(crate) fn publish_cadence(&self, bpm: f64, is_walking: bool) -> CadenceSignal {
        self.cadence.store(Arc::new(CadenceSignal {
            bpm,
            is_walking,
            ..CadenceSignal::default()
        }));
        self.cadence()
    }

    pub(crate) fn publish_coefficients(&self, coefficients: CalibrationCoefficients) {
        self.coefficients.store(Arc::new(coefficients));
    }

    pub(crate) fn publish_accuracy(&self, readout: AccuracyReadout) {
        self.accuracy.store(Arc::new(readout));
    }
}
