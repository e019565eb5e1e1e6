//! Common time, statistics and tempo helpers for cadence_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Slowest tempo the scheduler will play.
pub const MIN_TEMPO_BPM: f64 = 10.0;
/// Fastest tempo the scheduler will play.
pub const MAX_TEMPO_BPM: f64 = 300.0;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Clamp a requested tempo into the playable range. Non-finite requests map to the minimum.
#[inline]
pub fn clamp_tempo(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return MIN_TEMPO_BPM;
    }
    bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)
}

/// Beat interval in milliseconds for a tempo already inside the playable range.
#[inline]
pub fn beat_interval_ms(bpm: f64) -> f64 {
    60_000.0 / bpm
}

/// Single-pass mean and population standard deviation. Empty input yields `(0, 0)`.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let (sum, sum_sq) = values
        .iter()
        .fold((0.0, 0.0), |(s, sq), v| (s + v, sq + v * v));
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, var.sqrt())
}

/// Median of a slice; averages the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
