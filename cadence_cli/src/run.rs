//! Subcommand bodies: config mapping, simulated device assembly and output.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use cadence_config::Config;
use cadence_core::conversions::click_sound;
use cadence_core::error::{Result, map_device_error};
use cadence_core::{
    BeatScheduler, CadenceSession, CadenceSignal, CalibrationCoefficients, CalibrationPlan,
    DiagnosticsReport, PrecisionMode, SchedulerCfg, SensingCfg, run_calibration, run_tracking,
};
use cadence_sim::{AcceleratedClock, SimulatedClickOutput, SimulatedWalker};
use cadence_traits::{Accelerometer, ClickOutput};
use eyre::WrapErr;
use serde_json::json;

/// Make the simulated accelerometer fail its first N reads.
const FAIL_READS_ENV: &str = "CADENCE_TEST_SIM_FAIL_READS";

fn walker(cfg: &Config) -> SimulatedWalker {
    let w = SimulatedWalker::new(cfg.sensor.sample_rate_hz);
    if let Some(n) = std::env::var(FAIL_READS_ENV)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
    {
        w.fail_next_reads(n);
    }
    w
}

fn session(
    cfg: &Config,
    walker: SimulatedWalker,
    output: SimulatedClickOutput,
    speed: f64,
) -> Result<CadenceSession> {
    CadenceSession::builder()
        .with_accelerometer(walker)
        .with_click_output(output)
        .with_sensing(SensingCfg::from(cfg))
        .with_scheduler(SchedulerCfg::from(&cfg.scheduler))
        .with_click_sound(click_sound(&cfg.click))
        .with_coefficients(CalibrationCoefficients::from(&cfg.calibration))
        .with_clock(AcceleratedClock::new(speed))
        .build()
}

fn print_signal(sig: &CadenceSignal, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "event": "cadence",
                "bpm": sig.bpm,
                "walking": sig.is_walking,
                "accuracy_pct": sig.accuracy_pct,
                "confidence": sig.confidence,
            })
        );
    } else if sig.is_walking {
        println!("cadence: {:.1} BPM", sig.bpm);
    } else {
        println!("cadence: not walking");
    }
}

pub fn track(
    cfg: &Config,
    cadence: f64,
    seconds: u64,
    cue: Option<f64>,
    speed: f64,
    json: bool,
    shutdown: &AtomicBool,
) -> Result<CadenceSignal> {
    let output = SimulatedClickOutput::new();
    let played = output.clone();
    let mut session = session(cfg, walker(cfg).with_cadence(cadence), output, speed)?;

    if let Some(bpm) = cue {
        session
            .scheduler_mut()
            .start(bpm)
            .wrap_err("starting cue playback")?;
    }
    tracing::info!(cadence, seconds, speed, "tracking simulated walker");

    let mut cycles = 0usize;
    let outcome = run_tracking(&mut session, Duration::from_secs(seconds), shutdown, |report| {
        cycles += 1;
        if let Some(sig) = report.published {
            print_signal(&sig, json);
        }
    });
    session.scheduler_mut().stop();
    let last = session.monitor().cadence();
    session.shutdown();
    outcome?;

    if json {
        println!(
            "{}",
            json!({
                "event": "summary",
                "bpm": last.bpm,
                "walking": last.is_walking,
                "cycles": cycles,
                "clicks": played.click_count(),
            })
        );
    } else {
        println!(
            "tracking complete: {cycles} cycles, final cadence {:.1} BPM",
            last.bpm
        );
    }
    Ok(last)
}

pub fn calibrate(
    cfg: &Config,
    bias: f64,
    seconds_per_tempo: Option<u64>,
    speed: f64,
    json: bool,
    shutdown: &AtomicBool,
) -> Result<CalibrationCoefficients> {
    let walker = walker(cfg);
    let pace = walker.cadence_handle();
    let mut session = session(cfg, walker, SimulatedClickOutput::new(), speed)?;
    let plan = CalibrationPlan {
        reference_bpms: cfg.calibration.reference_bpms.clone(),
        per_tempo: Duration::from_secs(
            seconds_per_tempo.unwrap_or(cfg.calibration.seconds_per_tempo),
        ),
    };

    let results = run_calibration(&mut session, &plan, shutdown, |bpm| pace.set(bpm * bias));
    let coefficients = session.monitor().coefficients();
    session.shutdown();
    let results = results?;
    if results.is_empty() {
        eyre::bail!("calibration aborted before any reference tempo was captured");
    }

    for r in &results {
        if json {
            println!(
                "{}",
                json!({
                    "event": "calibration",
                    "success": r.success,
                    "target_bpm": r.target_bpm,
                    "measured_bpm": r.measured_bpm,
                    "error": r.error,
                })
            );
        } else if r.success {
            println!(
                "reference {:.0} BPM: measured {:.1} BPM ({:+.1})",
                r.target_bpm, r.measured_bpm, r.error
            );
        } else {
            println!("reference {:.0} BPM: no cadence captured", r.target_bpm);
        }
    }

    if json {
        println!(
            "{}",
            json!({
                "event": "coefficients",
                "multiplier": coefficients.multiplier,
                "offset": coefficients.offset,
            })
        );
    } else {
        println!(
            "coefficients: multiplier {:.4}, offset {:.2}",
            coefficients.multiplier, coefficients.offset
        );
        println!("persist with:\n[calibration]");
        println!("multiplier = {:.6}", coefficients.multiplier);
        println!("offset = {:.6}", coefficients.offset);
    }
    Ok(coefficients)
}

pub fn diagnostics(
    cfg: &Config,
    bpm: f64,
    seconds: u64,
    mode: Option<PrecisionMode>,
    speed: f64,
    json: bool,
) -> Result<DiagnosticsReport> {
    let mut sched = SchedulerCfg::from(&cfg.scheduler);
    if let Some(mode) = mode {
        sched.precision = mode;
    }
    let mut scheduler = BeatScheduler::new(
        SimulatedClickOutput::new(),
        AcceleratedClock::new(speed),
        sched,
        click_sound(&cfg.click),
    );
    let report = scheduler.run_diagnostics_for(bpm, Duration::from_secs(seconds))?;

    if json {
        println!(
            "{}",
            json!({
                "event": "diagnostics",
                "mode": report.mode.as_str(),
                "bpm": report.bpm,
                "beats": report.beats,
                "delayed": report.delayed,
                "average_delay_ms": report.average_delay_ms,
                "max_delay_ms": report.max_delay_ms,
                "jitter_ms": report.jitter_std_ms,
                "rating": report.rating.as_str(),
            })
        );
    } else {
        println!(
            "mode {} at {:.0} BPM: {} beats, {} delayed",
            report.mode.as_str(),
            report.bpm,
            report.beats,
            report.delayed
        );
        println!(
            "delay avg {:.2} ms, max {:.2} ms, jitter {:.2} ms",
            report.average_delay_ms, report.max_delay_ms, report.jitter_std_ms
        );
        println!("rating: {}", report.rating.as_str());
    }
    Ok(report)
}

pub fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let mut walker = walker(cfg);
    let timeout = Duration::from_millis(cfg.sensor.read_timeout_ms);
    walker
        .read(timeout)
        .map_err(|e| map_device_error(&*e))
        .wrap_err("reading accelerometer")?;

    let sound = click_sound(&cfg.click);
    let mut output = SimulatedClickOutput::new();
    output
        .prepare(&sound)
        .and_then(|()| output.play(cfg.scheduler.volume))
        .map_err(|e| map_device_error(&*e))
        .wrap_err("playing test click")?;

    // Validates the runtime configuration the same way a real run would.
    let mut session = session(cfg, walker, output, 1.0)?;
    session.shutdown();

    if json {
        println!("{}", json!({ "event": "self_check", "ok": true }));
    } else {
        println!("self-check ok");
    }
    Ok(())
}
