//! Long-running routines over a `CadenceSession`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;

use crate::calibration::CalibrationResult;
use crate::error::Result;
use crate::session::CadenceSession;
use crate::tracker::CycleReport;

/// How often routines drain the sampler.
pub const POLL_PERIOD: Duration = Duration::from_millis(20);

/// Reference tempos and how long to capture each one.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPlan {
    pub reference_bpms: Vec<f64>,
    pub per_tempo: Duration,
}

impl Default for CalibrationPlan {
    fn default() -> Self {
        Self {
            reference_bpms: crate::calibration::SEED_TARGETS.to_vec(),
            per_tempo: Duration::from_secs(30),
        }
    }
}

/// Play each reference tempo while capturing cadence, then fit.
///
/// `on_tempo` runs right after the scheduler switches tempo; the simulated
/// walker uses it to follow the beat. Sensing is started if needed and left
/// running. The scheduler is stopped when the routine ends or fails.
pub fn run_calibration(
    session: &mut CadenceSession,
    plan: &CalibrationPlan,
    abort: &AtomicBool,
    mut on_tempo: impl FnMut(f64),
) -> Result<Vec<CalibrationResult>> {
    session.start_sensing()?;
    let mut results = Vec::with_capacity(plan.reference_bpms.len());
    for &bpm in &plan.reference_bpms {
        if abort.load(Ordering::Relaxed) {
            tracing::warn!("calibration routine aborted");
            break;
        }
        if let Err(e) = session.scheduler_mut().start(bpm) {
            session.scheduler_mut().stop();
            return Err(e).wrap_err_with(|| format!("playing reference tempo {bpm} BPM"));
        }
        on_tempo(session.scheduler().tempo());
        session.monitor_mut().start_calibration(bpm);
        tracing::info!(
            target_bpm = bpm,
            seconds = plan.per_tempo.as_secs_f64(),
            "capturing reference tempo"
        );

        pump(session, plan.per_tempo, abort, |_| {});

        if let Some(result) = session.monitor_mut().stop_calibration() {
            results.push(result);
        }
    }
    session.scheduler_mut().stop();
    Ok(results)
}

/// Run the sensing pipeline for `duration` (or until `abort`), handing every
/// completed cycle to `on_cycle`.
pub fn run_tracking(
    session: &mut CadenceSession,
    duration: Duration,
    abort: &AtomicBool,
    on_cycle: impl FnMut(&CycleReport),
) -> Result<()> {
    session.start_sensing()?;
    pump(session, duration, abort, on_cycle);
    Ok(())
}

fn pump(
    session: &mut CadenceSession,
    duration: Duration,
    abort: &AtomicBool,
    mut on_cycle: impl FnMut(&CycleReport),
) {
    let clock = session.clock().clone();
    let start = clock.now();
    let limit_ms = duration.as_secs_f64() * 1_000.0;
    while clock.elapsed_ms(start) < limit_ms && !abort.load(Ordering::Relaxed) {
        for report in session.poll() {
            on_cycle(&report);
        }
        clock.sleep(POLL_PERIOD);
    }
    for report in session.poll() {
        on_cycle(&report);
    }
}
