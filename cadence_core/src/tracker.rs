//! Processing cycle of the sensing pipeline.
//!
//! Buffer → activity gate → band-pass → estimators → fusion → calibration
//! correction → median smoothing → publish. A cycle runs once the buffer first
//! holds `initial_samples`, then after every `update_every` new samples.

use std::sync::Arc;

use crate::activity::ActivityDetector;
use crate::buffer::{Sample, SampleBuffer};
use crate::config::SensingCfg;
use crate::estimators::{CadenceEstimate, estimate_all};
use crate::filter::BandPassFilter;
use crate::fusion::{CadenceSmoother, fuse};
use crate::signal::{CadenceSignal, SignalHub};

/// What one processing cycle saw and decided.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub buffered: usize,
    pub active: bool,
    pub estimates: Vec<CadenceEstimate>,
    pub fused_bpm: Option<f64>,
    /// Fused value after calibration correction.
    pub calibrated_bpm: Option<f64>,
    pub median_bpm: Option<f64>,
    /// Set when this cycle changed the published cadence.
    pub published: Option<CadenceSignal>,
}

pub struct CadenceTracker {
    cfg: SensingCfg,
    buffer: SampleBuffer,
    detector: ActivityDetector,
    filter: BandPassFilter,
    smoother: CadenceSmoother,
    hub: Arc<SignalHub>,
    running: bool,
    primed: bool,
    since_cycle: usize,
}

impl CadenceTracker {
    pub fn new(cfg: SensingCfg, hub: Arc<SignalHub>) -> Self {
        let profile = cfg.profile();
        Self {
            buffer: SampleBuffer::new(cfg.buffer_capacity),
            detector: ActivityDetector::new(cfg.activity_window, profile.activity_threshold),
            filter: BandPassFilter::new(cfg.sample_rate_hz, &profile),
            smoother: CadenceSmoother::new(cfg.smoothing_window, cfg.hysteresis_bpm),
            hub,
            cfg,
            running: false,
            primed: false,
            since_cycle: 0,
        }
    }

    pub fn config(&self) -> &SensingCfg {
        &self.cfg
    }

    pub fn hub(&self) -> &Arc<SignalHub> {
        &self.hub
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Begin accepting samples. No-op when already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.clear();
        self.running = true;
        tracing::info!(
            position = ?self.cfg.position,
            sample_rate_hz = self.cfg.sample_rate_hz,
            "cadence tracking started"
        );
    }

    /// Stop, drop buffered samples and publish "not walking". Idempotent.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.clear();
        self.hub.publish_cadence(0.0, false);
        tracing::info!("cadence tracking stopped");
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.smoother.reset();
        self.primed = false;
        self.since_cycle = 0;
    }

    /// Drop the smoothing history but keep the published value.
    ///
    /// Used when a calibration capture starts so stale values do not leak into it.
    pub fn clear_history(&mut self) {
        self.smoother.clear_history();
    }

    /// Push one sample; returns a report when it completed a processing cycle.
    pub fn ingest(&mut self, sample: Sample) -> Option<CycleReport> {
        if !self.running {
            return None;
        }
        self.buffer.push(sample);
        self.since_cycle += 1;

        let due = if self.primed {
            self.since_cycle >= self.cfg.update_every.max(1)
        } else {
            self.buffer.len() >= self.cfg.initial_samples.min(self.buffer.capacity())
        };
        if !due {
            return None;
        }
        self.primed = true;
        self.since_cycle = 0;
        Some(self.run_cycle())
    }

    fn run_cycle(&mut self) -> CycleReport {
        let magnitudes = self.buffer.magnitudes();
        let mut report = CycleReport {
            buffered: magnitudes.len(),
            active: self.detector.is_active(&magnitudes),
            estimates: Vec::new(),
            fused_bpm: None,
            calibrated_bpm: None,
            median_bpm: None,
            published: None,
        };

        if !report.active {
            let was_walking = self.hub.cadence().is_walking || self.smoother.published() != 0.0;
            self.smoother.reset();
            if was_walking {
                report.published = Some(self.hub.publish_cadence(0.0, false));
                tracing::debug!("activity ended");
            }
            return report;
        }

        let profile = self.cfg.profile();
        let filtered = self.filter.filter(&magnitudes);
        report.estimates = estimate_all(
            &filtered,
            self.cfg.sample_rate_hz,
            profile.peak_threshold,
            (self.cfg.min_bpm, self.cfg.max_bpm),
        );
        let Some(fused) = fuse(&report.estimates) else {
            tracing::trace!(buffered = report.buffered, "no valid estimate this cycle");
            return report;
        };
        report.fused_bpm = Some(fused);

        let calibrated = self.hub.coefficients().apply(fused);
        report.calibrated_bpm = Some(calibrated);

        let smoothed = self.smoother.push(calibrated);
        report.median_bpm = Some(smoothed.median);
        if let Some(bpm) = smoothed.publish {
            report.published = Some(self.hub.publish_cadence(bpm, true));
            tracing::debug!(bpm, fused, calibrated, "cadence published");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walking(n: usize, hz: f64) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let t = i as f64 / 50.0;
                let z = 9.81 + 1.5 * (2.0 * std::f64::consts::PI * hz * t).sin();
                Sample::new((t * 1000.0) as u64, 0.1, 0.2, z)
            })
            .collect()
    }

    fn still(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(i as u64 * 20, 0.0, 0.0, 9.81))
            .collect()
    }

    #[test]
    fn ignores_samples_until_started() {
        let mut t = CadenceTracker::new(SensingCfg::default(), Arc::new(SignalHub::default()));
        for s in walking(300, 1.67) {
            assert!(t.ingest(s).is_none());
        }
        assert_eq!(t.buffered(), 0);
    }

    #[test]
    fn cycles_at_200_then_every_100() {
        let mut t = CadenceTracker::new(SensingCfg::default(), Arc::new(SignalHub::default()));
        t.start();
        let cycles: Vec<usize> = walking(500, 1.67)
            .into_iter()
            .enumerate()
            .filter_map(|(i, s)| t.ingest(s).map(|_| i + 1))
            .collect();
        assert_eq!(cycles, vec![200, 300, 400, 500]);
    }

    #[test]
    fn walking_publishes_cadence() {
        let hub = Arc::new(SignalHub::default());
        let mut t = CadenceTracker::new(SensingCfg::default(), hub.clone());
        t.start();
        for s in walking(500, 1.67) {
            t.ingest(s);
        }
        let sig = hub.cadence();
        assert!(sig.is_walking);
        assert!((sig.bpm - 100.0).abs() < 5.0, "got {}", sig.bpm);
    }

    #[test]
    fn standing_still_publishes_zero() {
        let hub = Arc::new(SignalHub::default());
        let mut t = CadenceTracker::new(SensingCfg::default(), hub.clone());
        t.start();
        for s in walking(300, 1.67) {
            t.ingest(s);
        }
        assert!(hub.cadence().is_walking);
        let mut last = None;
        for s in still(100) {
            if let Some(r) = t.ingest(s) {
                last = Some(r);
            }
        }
        let report = last.expect("cycle");
        assert!(!report.active);
        assert_eq!(hub.cadence().bpm, 0.0);
        assert!(!hub.cadence().is_walking);
    }

    #[test]
    fn stop_is_idempotent() {
        let hub = Arc::new(SignalHub::default());
        let mut t = CadenceTracker::new(SensingCfg::default(), hub.clone());
        t.start();
        for s in walking(250, 1.67) {
            t.ingest(s);
        }
        t.stop();
        let after_first = hub.cadence();
        t.stop();
        assert_eq!(hub.cadence(), after_first);
        assert_eq!(t.buffered(), 0);
        assert!(!t.is_running());
    }
}
