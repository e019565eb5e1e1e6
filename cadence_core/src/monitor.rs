//! Sensing-side coordinator: the processing cycle, calibration capture and
//! the outbound event stream, confined to one execution context.

use std::sync::Arc;

use crossbeam_channel as xch;

use crate::buffer::Sample;
use crate::calibration::{CalibrationCoefficients, CalibrationEngine, CalibrationResult};
use crate::config::SensingCfg;
use crate::signal::{AccuracyReadout, CadenceSignal, SignalHub};
use crate::tracker::{CadenceTracker, CycleReport};

/// Outbound events for consumers of the sensing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The published cadence changed.
    Cadence(CadenceSignal),
    Calibration(CalibrationResult),
    Accuracy(AccuracyReadout),
}

pub struct CadenceMonitor {
    tracker: CadenceTracker,
    calibration: CalibrationEngine,
    hub: Arc<SignalHub>,
    subscribers: Vec<xch::Sender<MonitorEvent>>,
}

impl CadenceMonitor {
    pub fn new(cfg: SensingCfg, coefficients: CalibrationCoefficients) -> Self {
        let hub = SignalHub::shared(coefficients);
        Self {
            tracker: CadenceTracker::new(cfg, hub.clone()),
            calibration: CalibrationEngine::new(hub.clone()),
            hub,
            subscribers: Vec::new(),
        }
    }

    /// Lock-free read side for other threads.
    pub fn hub(&self) -> Arc<SignalHub> {
        self.hub.clone()
    }

    pub fn cadence(&self) -> CadenceSignal {
        self.hub.cadence()
    }

    pub fn tracker(&self) -> &CadenceTracker {
        &self.tracker
    }

    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    /// New receiver of every subsequent event. Dropped receivers are pruned on the next send.
    pub fn subscribe(&mut self) -> xch::Receiver<MonitorEvent> {
        let (tx, rx) = xch::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: MonitorEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn is_running(&self) -> bool {
        self.tracker.is_running()
    }

    pub fn start(&mut self) {
        self.tracker.start();
    }

    /// Stop tracking. An unfinished calibration capture is discarded and reported
    /// as failed; the coefficients stay as they were. Idempotent.
    pub fn stop(&mut self) {
        if !self.tracker.is_running() {
            return;
        }
        if self.calibration.is_calibrating() {
            tracing::warn!("sensing stopped during calibration");
            if let Some(result) = self.calibration.cancel() {
                self.emit(MonitorEvent::Calibration(result));
            }
        }
        self.tracker.stop();
        self.emit(MonitorEvent::Cadence(self.hub.cadence()));
    }

    /// Feed one sample through the pipeline.
    pub fn ingest(&mut self, sample: Sample) -> Option<CycleReport> {
        let report = self.tracker.ingest(sample)?;
        if let Some(median) = report.median_bpm {
            self.calibration.observe(median);
        }
        if let Some(signal) = report.published {
            self.emit(MonitorEvent::Cadence(signal));
        }
        Some(report)
    }

    pub fn ingest_all(&mut self, samples: impl IntoIterator<Item = Sample>) -> Vec<CycleReport> {
        samples.into_iter().filter_map(|s| self.ingest(s)).collect()
    }

    /// Begin capturing at `target_bpm`; the smoothing history is cleared first
    /// so the capture only sees cadence measured at the new tempo.
    pub fn start_calibration(&mut self, target_bpm: f64) {
        self.tracker.clear_history();
        self.calibration.start_calibration(target_bpm);
    }

    pub fn stop_calibration(&mut self) -> Option<CalibrationResult> {
        let result = self.calibration.stop_calibration()?;
        self.emit(MonitorEvent::Calibration(result.clone()));
        Some(result)
    }

    pub fn verify_accuracy(&mut self, known_bpm: f64) -> AccuracyReadout {
        let readout = self.calibration.verify_accuracy(known_bpm);
        self.emit(MonitorEvent::Accuracy(readout));
        readout
    }

    pub fn coefficients(&self) -> CalibrationCoefficients {
        self.hub.coefficients()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gait(n: usize, hz: f64) -> impl Iterator<Item = Sample> {
        (0..n).map(move |i| {
            let t = i as f64 / 50.0;
            let z = 9.81 + 1.5 * (2.0 * std::f64::consts::PI * hz * t).sin();
            Sample::new((t * 1000.0) as u64, 0.0, 0.0, z)
        })
    }

    #[test]
    fn subscribers_receive_cadence() {
        let mut m = CadenceMonitor::new(SensingCfg::default(), CalibrationCoefficients::identity());
        let rx = m.subscribe();
        m.start();
        m.ingest_all(gait(400, 1.67));
        let first = rx.try_recv().expect("cadence event");
        match first {
            MonitorEvent::Cadence(sig) => assert!(sig.is_walking),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn calibration_capture_uses_cycle_medians() {
        let mut m = CadenceMonitor::new(SensingCfg::default(), CalibrationCoefficients::identity());
        m.start();
        m.start_calibration(100.0);
        m.ingest_all(gait(600, 1.67));
        let result = m.stop_calibration().expect("result");
        assert!(result.success);
        assert!((result.measured_bpm - 100.0).abs() < 5.0);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut m = CadenceMonitor::new(SensingCfg::default(), CalibrationCoefficients::identity());
        drop(m.subscribe());
        let live = m.subscribe();
        m.verify_accuracy(100.0);
        assert_eq!(m.subscribers.len(), 1);
        assert!(matches!(live.try_recv(), Ok(MonitorEvent::Accuracy(_))));
    }

    #[test]
    fn stop_mid_capture_keeps_coefficients() {
        let mut m = CadenceMonitor::new(SensingCfg::default(), CalibrationCoefficients::identity());
        let rx = m.subscribe();
        m.start();
        m.start_calibration(80.0);
        m.ingest_all(gait(400, 1.67));
        assert!(m.calibration().collected() > 0);
        m.stop();

        assert!(m.coefficients().is_identity());
        assert!(!m.calibration().is_calibrating());
        assert!(
            m.calibration()
                .points()
                .iter()
                .any(|p| p.target_bpm == 80.0 && p.measured_bpm == 80.0)
        );
        let result = rx
            .try_iter()
            .find_map(|e| match e {
                MonitorEvent::Calibration(r) => Some(r),
                _ => None,
            })
            .expect("calibration event");
        assert!(!result.success);
        assert_eq!(result.target_bpm, 80.0);
    }

    #[test]
    fn stop_twice_emits_once() {
        let mut m = CadenceMonitor::new(SensingCfg::default(), CalibrationCoefficients::identity());
        let rx = m.subscribe();
        m.start();
        m.stop();
        m.stop();
        assert_eq!(rx.try_iter().count(), 1);
    }
}
