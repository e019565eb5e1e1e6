//! Two-stage moving-average band-pass for the gait band.
//!
//! Stage 1 smooths with a window of `round(fs / high_cut)` samples, stage 2
//! smooths the stage-1 output with `round(fs / low_cut)` samples to obtain a
//! slow baseline, and the output is `input - baseline`.
//!
//! Windows are centred and shrink at the series edges (no wrap, no padding).
//! The resulting edge bias is a known approximation and is intentionally kept:
//! calibration coefficients are fitted against this exact response.

use crate::config::PositionProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandPassFilter {
    low_pass_window: usize,
    baseline_window: usize,
}

impl BandPassFilter {
    pub fn new(sample_rate_hz: u32, profile: &PositionProfile) -> Self {
        let fs = f64::from(sample_rate_hz.max(1));
        Self {
            low_pass_window: window_for(fs, profile.high_cut_hz),
            baseline_window: window_for(fs, profile.low_cut_hz),
        }
    }

    pub fn low_pass_window(&self) -> usize {
        self.low_pass_window
    }

    pub fn baseline_window(&self) -> usize {
        self.baseline_window
    }

    /// Filter a magnitude series; the output has the same length and order.
    pub fn filter(&self, magnitudes: &[f64]) -> Vec<f64> {
        if magnitudes.is_empty() {
            return Vec::new();
        }
        let low = moving_average(magnitudes, self.low_pass_window);
        let baseline = moving_average(&low, self.baseline_window);
        magnitudes
            .iter()
            .zip(baseline.iter())
            .map(|(x, b)| x - b)
            .collect()
    }
}

fn window_for(fs: f64, cutoff_hz: f64) -> usize {
    if !(cutoff_hz.is_finite() && cutoff_hz > 0.0) {
        return 1;
    }
    ((fs / cutoff_hz).round() as usize).max(1)
}

/// Centred moving average; near the edges the window is truncated to the
/// samples that exist, and the mean is taken over that shorter span.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let window = window.max(1);
    if window == 1 || n == 0 {
        return values.to_vec();
    }
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for v in values {
        acc += v;
        prefix.push(acc);
    }
    let before = window / 2;
    let after = window - 1 - before;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(n - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorPosition;

    #[test]
    fn windows_follow_profile() {
        let waist = BandPassFilter::new(50, &SensorPosition::Waist.profile());
        assert_eq!(waist.low_pass_window(), 17);
        assert_eq!(waist.baseline_window(), 100);
        let ankle = BandPassFilter::new(50, &SensorPosition::Ankle.profile());
        assert_eq!(ankle.low_pass_window(), 13);
    }

    #[test]
    fn moving_average_shrinks_at_edges() {
        let out = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![1.5, 2.0, 3.0, 4.0, 4.5]);
    }

    #[test]
    fn constant_input_filters_to_zero() {
        let f = BandPassFilter::new(50, &SensorPosition::Waist.profile());
        let out = f.filter(&vec![9.81; 250]);
        assert_eq!(out.len(), 250);
        assert!(out.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn gait_band_oscillation_survives() {
        let f = BandPassFilter::new(50, &SensorPosition::Waist.profile());
        let input: Vec<f64> = (0..400)
            .map(|i| 9.81 + (2.0 * std::f64::consts::PI * 1.8 * i as f64 / 50.0).sin())
            .collect();
        let out = f.filter(&input);
        let (mean, std) = crate::util::mean_std(&out[100..300]);
        assert!(mean.abs() < 0.1, "baseline not removed: {mean}");
        assert!(std > 0.5, "oscillation attenuated: {std}");
    }
}
