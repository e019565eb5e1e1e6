//! Independent cadence estimators over one filtered series.
//!
//! Each estimator is a pure function returning `None` when it has no usable
//! answer this cycle. Results outside the physiological band are dropped by
//! `estimate_all`, never down-weighted.

use crate::util::{mean_std, median};

/// Central slice length used by the autocorrelation estimator.
pub const AUTOCORR_SLICE: usize = 250;
/// Most recent samples scanned by the peak counter.
pub const PEAK_WINDOW: usize = 200;
/// Minimum spacing between counted peaks, in seconds.
pub const MIN_PEAK_DISTANCE_S: f64 = 0.3;
/// Peaks required before intervals are trusted.
pub const MIN_CONSECUTIVE_STEPS: usize = 4;
/// Frame length of the coarse frequency sweep.
pub const SWEEP_FRAME: usize = 256;
pub const SWEEP_MIN_HZ: f64 = 0.5;
pub const SWEEP_MAX_HZ: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimatorKind {
    Autocorrelation,
    PeakCount,
    FrequencySweep,
}

impl EstimatorKind {
    /// Fusion weight before renormalisation.
    pub fn weight(self) -> f64 {
        match self {
            EstimatorKind::Autocorrelation => 0.6,
            EstimatorKind::PeakCount => 0.3,
            EstimatorKind::FrequencySweep => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EstimatorKind::Autocorrelation => "autocorrelation",
            EstimatorKind::PeakCount => "peak_count",
            EstimatorKind::FrequencySweep => "frequency_sweep",
        }
    }
}

/// One estimator's proposal for this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadenceEstimate {
    pub method: EstimatorKind,
    pub bpm: f64,
}

/// Run every estimator and keep the in-band results.
pub fn estimate_all(
    filtered: &[f64],
    sample_rate_hz: u32,
    peak_threshold: f64,
    band: (f64, f64),
) -> Vec<CadenceEstimate> {
    let fs = f64::from(sample_rate_hz.max(1));
    let candidates = [
        (
            EstimatorKind::Autocorrelation,
            autocorrelation_bpm(filtered, fs),
        ),
        (
            EstimatorKind::PeakCount,
            peak_count_bpm(filtered, fs, peak_threshold),
        ),
        (
            EstimatorKind::FrequencySweep,
            frequency_sweep_bpm(filtered, fs),
        ),
    ];
    candidates
        .into_iter()
        .filter_map(|(method, bpm)| {
            let bpm = bpm?;
            if bpm.is_finite() && bpm >= band.0 && bpm <= band.1 {
                Some(CadenceEstimate { method, bpm })
            } else {
                tracing::trace!(method = method.as_str(), bpm, "estimate outside band");
                None
            }
        })
        .collect()
}

/// Fundamental period from the first autocorrelation peak.
///
/// The first peak is used rather than the global maximum because the
/// autocorrelation of a periodic signal repeats at every multiple of the period.
pub fn autocorrelation_bpm(series: &[f64], fs: f64) -> Option<f64> {
    let n = series.len();
    let start = n.saturating_sub(AUTOCORR_SLICE) / 2;
    let slice = &series[start..(start + AUTOCORR_SLICE).min(n)];
    let len = slice.len();

    let (mean, std) = mean_std(slice);
    if std < 0.001 {
        return None;
    }
    let z: Vec<f64> = slice.iter().map(|v| (v - mean) / std).collect();

    let max_lag = ((2.0 * fs) as usize).min(len / 2);
    let min_lag = (0.25 * fs).floor() as usize + 1;
    if max_lag < min_lag + 2 {
        return None;
    }

    let acf: Vec<f64> = (0..=max_lag)
        .map(|lag| {
            let overlap = len - lag;
            let sum: f64 = z[..overlap]
                .iter()
                .zip(&z[lag..])
                .map(|(a, b)| a * b)
                .sum();
            sum / overlap as f64
        })
        .collect();

    let lag = (min_lag..max_lag)
        .find(|&lag| acf[lag] > 0.0 && acf[lag] > acf[lag - 1] && acf[lag] >= acf[lag + 1])?;

    // Parabolic vertex through the peak and its neighbours for sub-sample lag.
    let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
    let denom = a - 2.0 * b + c;
    let shift = if denom.abs() > f64::EPSILON {
        (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    Some(60.0 * fs / (lag as f64 + shift))
}

/// Step rate from well-separated local maxima in the most recent window.
pub fn peak_count_bpm(series: &[f64], fs: f64, peak_threshold: f64) -> Option<f64> {
    let start = series.len().saturating_sub(PEAK_WINDOW);
    let recent = &series[start..];
    if recent.len() < 3 {
        return None;
    }
    let (_, std) = mean_std(recent);
    let threshold = std * peak_threshold;
    let min_distance = (MIN_PEAK_DISTANCE_S * fs).round() as usize;

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..recent.len() - 1 {
        let v = recent[i];
        if !(v > threshold && v > recent[i - 1] && v >= recent[i + 1]) {
            continue;
        }
        match peaks.last_mut() {
            Some(last) if i - *last < min_distance => {
                if v > recent[*last] {
                    *last = i;
                }
            }
            _ => peaks.push(i),
        }
    }
    if peaks.len() < MIN_CONSECUTIVE_STEPS {
        return None;
    }

    let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let med = median(&intervals)?;
    let kept: Vec<f64> = intervals
        .into_iter()
        .filter(|iv| *iv >= 0.5 * med && *iv <= 1.5 * med)
        .collect();
    if kept.is_empty() {
        return None;
    }
    let avg = kept.iter().sum::<f64>() / kept.len() as f64;
    if avg <= 0.0 {
        return None;
    }
    Some(60.0 * fs / avg)
}

/// Coarse narrow-band estimate: Hamming-windowed correlation against
/// sine/cosine pairs at each bin in the gait range, keeping the strongest bin.
pub fn frequency_sweep_bpm(series: &[f64], fs: f64) -> Option<f64> {
    if series.len() < SWEEP_FRAME {
        return None;
    }
    let frame = &series[series.len() - SWEEP_FRAME..];
    let n = SWEEP_FRAME as f64;
    let (mean, std) = mean_std(frame);
    if std < 0.001 {
        return None;
    }
    let windowed: Vec<f64> = frame
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let w = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1.0)).cos();
            (v - mean) * w
        })
        .collect();

    let first_bin = (SWEEP_MIN_HZ * n / fs).ceil() as usize;
    let last_bin = (SWEEP_MAX_HZ * n / fs).floor() as usize;
    let mut best: Option<(usize, f64)> = None;
    for k in first_bin.max(1)..=last_bin {
        let omega = 2.0 * std::f64::consts::PI * k as f64 / n;
        let (re, im) = windowed
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(re, im), (i, x)| {
                let phase = omega * i as f64;
                (re + x * phase.cos(), im - x * phase.sin())
            });
        let power = re * re + im * im;
        if best.is_none_or(|(_, p)| power > p) {
            best = Some((k, power));
        }
    }
    let (k, _) = best?;
    Some(k as f64 * fs / n * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, fs: f64, n: usize, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn autocorrelation_recovers_100_bpm() {
        let series: Vec<f64> = sine(1.67, 50.0, 500, 1.2)
            .into_iter()
            .map(|v| v + 9.81)
            .collect();
        let bpm = autocorrelation_bpm(&series, 50.0).expect("estimate");
        assert!((bpm - 100.0).abs() <= 3.0, "got {bpm}");
    }

    #[test]
    fn autocorrelation_aborts_on_flat_series() {
        assert_eq!(autocorrelation_bpm(&vec![1.0; 300], 50.0), None);
    }

    #[test]
    fn peak_count_recovers_cadence() {
        let series = sine(1.5, 50.0, 300, 1.0);
        let bpm = peak_count_bpm(&series, 50.0, 0.5).expect("estimate");
        assert!((bpm - 90.0).abs() <= 3.0, "got {bpm}");
    }

    #[test]
    fn peak_count_needs_four_peaks() {
        // 0.6 Hz over 4 s gives at most 3 peaks in the window.
        let series = sine(0.6, 50.0, 200, 1.0);
        assert_eq!(peak_count_bpm(&series, 50.0, 0.5), None);
    }

    #[test]
    fn close_peaks_keep_the_larger() {
        let mut series = vec![0.0; 200];
        for start in [20usize, 60, 100, 140, 180] {
            series[start] = 2.0;
        }
        // A smaller bump 5 samples after the first real peak.
        series[25] = 1.0;
        let bpm = peak_count_bpm(&series, 50.0, 0.5).expect("estimate");
        assert!((bpm - 75.0).abs() < 1e-9, "got {bpm}");
    }

    #[test]
    fn missed_step_interval_is_discarded() {
        let mut series = vec![0.0; 200];
        // Intervals 30, 30, 30, 90: the long gap is outside half-to-1.5x the median.
        for i in [10usize, 40, 70, 100, 190] {
            series[i] = 1.0;
        }
        assert_eq!(peak_count_bpm(&series, 50.0, 0.5), Some(100.0));
    }

    #[test]
    fn frequency_sweep_is_coarse_but_close() {
        let series = sine(1.8, 50.0, 300, 1.0);
        let bpm = frequency_sweep_bpm(&series, 50.0).expect("estimate");
        assert!((bpm - 108.0).abs() <= 12.0, "got {bpm}");
    }

    #[test]
    fn estimate_all_discards_out_of_band() {
        // 3.5 Hz is 210 BPM: every estimator either abstains or is out of band.
        let series = sine(3.5, 50.0, 300, 1.0);
        let out = estimate_all(&series, 50, 0.5, (40.0, 160.0));
        assert!(out.iter().all(|e| e.bpm >= 40.0 && e.bpm <= 160.0));
        assert!(
            out.iter()
                .all(|e| e.method != EstimatorKind::Autocorrelation)
        );
    }
}
