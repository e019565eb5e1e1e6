//! Beat timing capture and jitter classification.

use std::time::Duration;

use crate::config::PrecisionMode;

/// Beats later than this count as delayed.
pub const DELAYED_THRESHOLD_MS: f64 = 20.0;
pub const DIAGNOSTIC_BPM: f64 = 120.0;
pub const DIAGNOSTIC_DURATION: Duration = Duration::from_secs(5);

/// Scheduled vs actual fire time of one emitted beat, in ms since the engine started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatTiming {
    pub index: u64,
    pub scheduled_ms: f64,
    pub fired_ms: f64,
}

impl BeatTiming {
    /// Positive when late. The look-ahead mode may fire up to 1 ms early.
    pub fn delay_ms(&self) -> f64 {
        self.fired_ms - self.scheduled_ms
    }
}

/// Running counters over every beat the engine has emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingStats {
    pub beats: u64,
    pub delayed: u64,
    pub total_delay_ms: f64,
    pub max_delay_ms: f64,
    pub playback_failures: u64,
    pub reinitialisations: u64,
}

impl TimingStats {
    pub fn record(&mut self, t: &BeatTiming) {
        let delay = t.delay_ms();
        self.beats += 1;
        if delay > DELAYED_THRESHOLD_MS {
            self.delayed += 1;
        }
        self.total_delay_ms += delay;
        self.max_delay_ms = self.max_delay_ms.max(delay);
    }

    pub fn average_delay_ms(&self) -> f64 {
        if self.beats == 0 {
            0.0
        } else {
            self.total_delay_ms / self.beats as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterRating {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl JitterRating {
    /// Classify the standard deviation of beat delays.
    pub fn classify(jitter_std_ms: f64) -> Self {
        match jitter_std_ms {
            j if j < 5.0 => JitterRating::Excellent,
            j if j < 15.0 => JitterRating::Good,
            j if j < 30.0 => JitterRating::Acceptable,
            _ => JitterRating::Poor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JitterRating::Excellent => "excellent",
            JitterRating::Good => "good",
            JitterRating::Acceptable => "acceptable",
            JitterRating::Poor => "poor",
        }
    }
}

/// Outcome of a timing self-test.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsReport {
    pub mode: PrecisionMode,
    pub bpm: f64,
    pub beats: usize,
    pub delayed: usize,
    pub average_delay_ms: f64,
    pub max_delay_ms: f64,
    pub jitter_std_ms: f64,
    pub rating: JitterRating,
}

impl DiagnosticsReport {
    pub fn from_timings(mode: PrecisionMode, bpm: f64, timings: &[BeatTiming]) -> Self {
        let delays: Vec<f64> = timings.iter().map(BeatTiming::delay_ms).collect();
        let (average_delay_ms, jitter_std_ms) = crate::util::mean_std(&delays);
        let max_delay_ms = delays.iter().copied().fold(0.0, f64::max);
        // No beats at all is a failed run, not a perfect one.
        let rating = if delays.is_empty() {
            JitterRating::Poor
        } else {
            JitterRating::classify(jitter_std_ms)
        };
        Self {
            mode,
            bpm,
            beats: delays.len(),
            delayed: delays.iter().filter(|d| **d > DELAYED_THRESHOLD_MS).count(),
            average_delay_ms,
            max_delay_ms,
            jitter_std_ms,
            rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(index: u64, scheduled_ms: f64, fired_ms: f64) -> BeatTiming {
        BeatTiming {
            index,
            scheduled_ms,
            fired_ms,
        }
    }

    #[test]
    fn stats_count_delayed_beats() {
        let mut s = TimingStats::default();
        s.record(&timing(0, 0.0, 1.0));
        s.record(&timing(1, 500.0, 525.0));
        s.record(&timing(2, 1000.0, 1004.0));
        assert_eq!(s.beats, 3);
        assert_eq!(s.delayed, 1);
        assert!((s.average_delay_ms() - 10.0).abs() < 1e-9);
        assert_eq!(s.max_delay_ms, 25.0);
    }

    #[test]
    fn report_of_steady_run_is_excellent() {
        let timings: Vec<_> = (0..10)
            .map(|i| timing(i, i as f64 * 500.0, i as f64 * 500.0 + 2.0))
            .collect();
        let r = DiagnosticsReport::from_timings(PrecisionMode::Synthesized, 120.0, &timings);
        assert_eq!(r.beats, 10);
        assert!(r.jitter_std_ms < 1e-9);
        assert_eq!(r.rating, JitterRating::Excellent);
    }

    #[test]
    fn empty_run_is_poor() {
        let r = DiagnosticsReport::from_timings(PrecisionMode::Basic, 120.0, &[]);
        assert_eq!(r.rating, JitterRating::Poor);
        assert_eq!(r.beats, 0);
    }
}
