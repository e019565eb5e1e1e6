//! Confidence-weighted fusion and median smoothing with publish hysteresis.

use std::collections::VecDeque;

use crate::estimators::CadenceEstimate;

/// Weighted average of the surviving estimates, weights renormalised over the
/// estimators that produced a value. `None` when nothing survived.
pub fn fuse(estimates: &[CadenceEstimate]) -> Option<f64> {
    let total_weight: f64 = estimates.iter().map(|e| e.method.weight()).sum();
    if estimates.is_empty() || total_weight <= 0.0 {
        return None;
    }
    let weighted: f64 = estimates.iter().map(|e| e.bpm * e.method.weight()).sum();
    Some(weighted / total_weight)
}

/// Result of pushing one calibrated value through the smoother.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    /// Median of the bounded history.
    pub median: f64,
    /// New value to publish, when the hysteresis test passed.
    pub publish: Option<f64>,
}

/// Bounded history of calibrated cadence values with median output.
///
/// A new value is only published when it moves more than `hysteresis_bpm`
/// away from the last published value, or when nothing has been published yet.
#[derive(Debug, Clone)]
pub struct CadenceSmoother {
    history: VecDeque<f64>,
    window: usize,
    hysteresis_bpm: f64,
    published: f64,
}

impl CadenceSmoother {
    pub fn new(window: usize, hysteresis_bpm: f64) -> Self {
        let window = window.max(1);
        Self {
            history: VecDeque::with_capacity(window),
            window,
            hysteresis_bpm,
            published: 0.0,
        }
    }

    pub fn push(&mut self, calibrated_bpm: f64) -> Smoothed {
        self.history.push_back(calibrated_bpm);
        if self.history.len() > self.window {
            self.history.pop_front();
        }
        let values: Vec<f64> = self.history.iter().copied().collect();
        let median = crate::util::median(&values).unwrap_or(calibrated_bpm);
        let publish = if self.published == 0.0
            || (median - self.published).abs() > self.hysteresis_bpm
        {
            self.published = median;
            Some(median)
        } else {
            None
        };
        Smoothed { median, publish }
    }

    /// Last published value (0 when nothing has been published since the last reset).
    pub fn published(&self) -> f64 {
        self.published
    }

    /// Drop the rolling history but keep the published value.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Forget everything, including the published value.
    pub fn reset(&mut self) {
        self.history.clear();
        self.published = 0.0;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::EstimatorKind;

    fn est(method: EstimatorKind, bpm: f64) -> CadenceEstimate {
        CadenceEstimate { method, bpm }
    }

    #[test]
    fn fuse_renormalises_over_survivors() {
        let all = [
            est(EstimatorKind::Autocorrelation, 100.0),
            est(EstimatorKind::PeakCount, 110.0),
            est(EstimatorKind::FrequencySweep, 120.0),
        ];
        let fused = fuse(&all).expect("fused");
        assert!((fused - 105.0).abs() < 1e-9);

        let two = [
            est(EstimatorKind::PeakCount, 90.0),
            est(EstimatorKind::FrequencySweep, 130.0),
        ];
        let fused = fuse(&two).expect("fused");
        assert!((fused - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fuse_with_nothing_is_none() {
        assert_eq!(fuse(&[]), None);
    }

    #[test]
    fn median_rejects_single_outlier() {
        let mut s = CadenceSmoother::new(5, 2.0);
        let mut last = None;
        for v in [60.0, 62.0, 61.0, 200.0, 59.0] {
            last = Some(s.push(v));
        }
        assert_eq!(last.map(|o| o.median), Some(61.0));
    }

    #[test]
    fn hysteresis_suppresses_small_moves() {
        let mut s = CadenceSmoother::new(5, 2.0);
        assert_eq!(s.push(100.0).publish, Some(100.0));
        assert_eq!(s.push(101.0).publish, None);
        assert_eq!(s.push(102.0).publish, None);
        assert_eq!(s.published(), 100.0);
        // A move of exactly the hysteresis is still held back.
        s.push(110.0);
        let out = s.push(110.0);
        assert_eq!(out.median, 102.0);
        let out = s.push(110.0);
        assert_eq!(out.publish, Some(110.0));
    }

    #[test]
    fn clear_history_keeps_published() {
        let mut s = CadenceSmoother::new(5, 2.0);
        s.push(90.0);
        s.clear_history();
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.published(), 90.0);
        s.reset();
        assert_eq!(s.published(), 0.0);
    }
}
