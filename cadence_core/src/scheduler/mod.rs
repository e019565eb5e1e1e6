//! Precision beat scheduler.
//!
//! One worker thread per playing session owns the `ClickOutput` and drives a
//! `BeatSource` for the selected precision mode. Tempo and mode changes stop
//! the worker and start a fresh one; nothing is re-tuned in flight. When the
//! host offers a `NativeBeatEngine` it is tried first in high-precision mode.

pub mod basic;
pub mod diagnostics;
pub mod lookahead;
pub mod synthesized;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cadence_traits::clock::Clock;
use cadence_traits::{ClickOutput, ClickSound, NativeBeatEngine};
use crossbeam_channel as xch;
use eyre::WrapErr;

use crate::config::{PrecisionMode, SchedulerCfg};
use crate::error::{CadenceError, Result};
use crate::util::clamp_tempo;

pub use basic::BasicSource;
pub use diagnostics::{BeatTiming, DiagnosticsReport, JitterRating, TimingStats};
pub use lookahead::LookaheadSource;
pub use synthesized::SynthesizedSource;

/// Decides when beats are due. Times are ms since the worker started.
pub trait BeatSource: Send {
    /// Append the scheduled time of every beat due at `now_ms`.
    fn poll(&mut self, now_ms: f64, due: &mut Vec<f64>);
    fn poll_interval(&self) -> Duration;
    /// Drop pending state and start a fresh grid at `now_ms`.
    fn restart(&mut self, now_ms: f64);
}

pub fn source_for(mode: PrecisionMode, bpm: f64, cfg: &SchedulerCfg) -> Box<dyn BeatSource> {
    match mode {
        PrecisionMode::Basic => Box::new(BasicSource::new(bpm, 0.0)),
        PrecisionMode::HighPrecision => Box::new(LookaheadSource::new(
            bpm,
            0.0,
            Duration::from_millis(cfg.lookahead_ms),
            Duration::from_millis(cfg.refresh_ms),
        )),
        PrecisionMode::Synthesized => Box::new(SynthesizedSource::new(bpm, 0.0)),
    }
}

/// Emitted for each audible beat; for UI synchronisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub index: u64,
    pub bpm: f64,
}

pub type BeatObserver = Arc<dyn Fn(&BeatEvent) + Send + Sync>;
pub type TimingObserver = Arc<dyn Fn(&BeatTiming) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEngineState {
    pub is_playing: bool,
    pub tempo_bpm: f64,
    pub precision: PrecisionMode,
    pub volume: f32,
    /// Playback is delegated to the host engine.
    pub native: bool,
}

struct Worker<O> {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<O>,
}

/// Everything the worker thread needs besides the output it owns.
struct WorkerCtx<C> {
    clock: C,
    source: Box<dyn BeatSource>,
    bpm: f64,
    sound: ClickSound,
    volume: Arc<AtomicU32>,
    max_failures: u32,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<TimingStats>>,
    on_beat: Option<BeatObserver>,
    on_timing: Option<TimingObserver>,
    capture: Option<xch::Sender<BeatTiming>>,
}

pub struct BeatScheduler<O, C>
where
    O: ClickOutput + Send + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    cfg: SchedulerCfg,
    sound: ClickSound,
    clock: C,
    /// `None` while a worker owns it.
    output: Option<O>,
    native: Option<Box<dyn NativeBeatEngine + Send>>,
    state: BeatEngineState,
    volume: Arc<AtomicU32>,
    worker: Option<Worker<O>>,
    stats: Arc<Mutex<TimingStats>>,
    on_beat: Option<BeatObserver>,
    on_timing: Option<TimingObserver>,
    capture: Option<xch::Sender<BeatTiming>>,
}

impl<O, C> BeatScheduler<O, C>
where
    O: ClickOutput + Send + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new(output: O, clock: C, cfg: SchedulerCfg, sound: ClickSound) -> Self {
        let volume = cfg.volume.clamp(0.0, 1.0);
        Self {
            state: BeatEngineState {
                is_playing: false,
                tempo_bpm: 0.0,
                precision: cfg.precision,
                volume,
                native: false,
            },
            volume: Arc::new(AtomicU32::new(volume.to_bits())),
            cfg,
            sound,
            clock,
            output: Some(output),
            native: None,
            worker: None,
            stats: Arc::new(Mutex::new(TimingStats::default())),
            on_beat: None,
            on_timing: None,
            capture: None,
        }
    }

    /// Offer a host engine; it is only used when available at start time.
    pub fn with_native(mut self, engine: Box<dyn NativeBeatEngine + Send>) -> Self {
        self.native = Some(engine);
        self
    }

    pub fn on_beat(&mut self, observer: BeatObserver) {
        self.on_beat = Some(observer);
    }

    pub fn on_timing(&mut self, observer: TimingObserver) {
        self.on_timing = Some(observer);
    }

    pub fn state(&self) -> BeatEngineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn tempo(&self) -> f64 {
        self.state.tempo_bpm
    }

    pub fn stats(&self) -> TimingStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn reset_stats(&self) {
        if let Ok(mut s) = self.stats.lock() {
            *s = TimingStats::default();
        }
    }

    /// Start playing at `bpm` (clamped to [10, 300]). Restarts when already playing.
    pub fn start(&mut self, bpm: f64) -> Result<()> {
        self.stop();
        self.state.tempo_bpm = clamp_tempo(bpm);
        self.launch()
    }

    /// Change tempo; a playing engine is stopped and restarted at the new tempo.
    pub fn update_tempo(&mut self, bpm: f64) -> Result<()> {
        let bpm = clamp_tempo(bpm);
        if bpm != self.state.tempo_bpm {
            tracing::debug!(from = self.state.tempo_bpm, to = bpm, "tempo change");
        }
        self.state.tempo_bpm = bpm;
        self.restart_if_playing()
    }

    pub fn set_precision_mode(&mut self, mode: PrecisionMode) -> Result<()> {
        self.state.precision = mode;
        self.restart_if_playing()
    }

    /// Volume in [0, 1]; applied to the next beat without a restart.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.state.volume = volume;
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
        if self.state.native
            && let Some(native) = self.native.as_mut()
            && let Err(e) = native.set_volume(volume)
        {
            tracing::warn!(error = %e, "native engine rejected volume change");
        }
    }

    fn restart_if_playing(&mut self) -> Result<()> {
        if !self.state.is_playing {
            return Ok(());
        }
        self.stop();
        self.launch()
    }

    fn launch(&mut self) -> Result<()> {
        let bpm = self.state.tempo_bpm;
        let mode = self.state.precision;

        if self.cfg.prefer_native
            && mode == PrecisionMode::HighPrecision
            && self.capture.is_none()
            && let Some(native) = self.native.as_mut()
            && native.is_available()
        {
            let lookahead = Duration::from_millis(self.cfg.lookahead_ms);
            match native.start(bpm, lookahead, &self.sound, self.state.volume) {
                Ok(()) => {
                    self.state.is_playing = true;
                    self.state.native = true;
                    tracing::info!(bpm, "beat engine started (native)");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "native engine failed to start; using in-process high precision");
                }
            }
        }

        let mut output = self
            .output
            .take()
            .ok_or_else(|| CadenceError::State("click output unavailable".into()))?;
        if let Err(e) = output.prepare(&self.sound) {
            self.output = Some(output);
            return Err(CadenceError::Audio(e.to_string())).wrap_err("preparing click sound");
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let ctx = WorkerCtx {
            clock: self.clock.clone(),
            source: source_for(mode, bpm, &self.cfg),
            bpm,
            sound: self.sound,
            volume: self.volume.clone(),
            max_failures: self.cfg.max_playback_failures,
            shutdown: shutdown.clone(),
            stats: self.stats.clone(),
            on_beat: self.on_beat.clone(),
            on_timing: self.on_timing.clone(),
            capture: self.capture.clone(),
        };
        let handle = std::thread::spawn(move || run_worker(output, ctx));
        self.worker = Some(Worker { shutdown, handle });
        self.state.is_playing = true;
        self.state.native = false;
        tracing::info!(bpm, mode = mode.as_str(), "beat engine started");
        Ok(())
    }

    /// Stop playback, cancelling every queued beat. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state.native {
            if let Some(native) = self.native.as_mut()
                && let Err(e) = native.stop()
            {
                tracing::warn!(error = %e, "native engine stop failed");
            }
            self.state.native = false;
        }
        if let Some(worker) = self.worker.take() {
            worker.shutdown.store(true, Ordering::Relaxed);
            match worker.handle.join() {
                Ok(output) => self.output = Some(output),
                // The output went down with the thread; later starts report it.
                Err(e) => tracing::error!(?e, "beat worker panicked"),
            }
        }
        if self.state.is_playing {
            tracing::info!(bpm = self.state.tempo_bpm, "beat engine stopped");
        }
        self.state.is_playing = false;
    }

    /// Timing self-test: 120 BPM for 5 s in the current precision mode.
    pub fn run_diagnostics(&mut self) -> Result<DiagnosticsReport> {
        self.run_diagnostics_for(diagnostics::DIAGNOSTIC_BPM, diagnostics::DIAGNOSTIC_DURATION)
    }

    /// Play `bpm` for `duration` in-process and classify the beat jitter.
    ///
    /// Whatever was playing before is resumed afterwards.
    pub fn run_diagnostics_for(
        &mut self,
        bpm: f64,
        duration: Duration,
    ) -> Result<DiagnosticsReport> {
        let resume = self.state.is_playing.then_some(self.state.tempo_bpm);
        let bpm = clamp_tempo(bpm);
        let expected =
            (duration.as_secs_f64() * 1_000.0 / crate::util::beat_interval_ms(bpm)).floor() as usize + 1;

        let (tx, rx) = xch::unbounded();
        self.capture = Some(tx);
        let started = self.start(bpm);
        self.capture = None;
        if let Err(e) = started {
            self.restore(resume);
            return Err(e).wrap_err("starting diagnostics run");
        }

        // Bounded by real time so a stalled back-end cannot hang the caller.
        let deadline = std::time::Instant::now() + duration + Duration::from_secs(2);
        let mut timings = Vec::with_capacity(expected);
        while timings.len() < expected {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            match rx.recv_timeout(left) {
                Ok(t) => timings.push(t),
                Err(_) => break,
            }
        }
        self.stop();
        let report = DiagnosticsReport::from_timings(self.state.precision, bpm, &timings);
        tracing::info!(
            mode = report.mode.as_str(),
            beats = report.beats,
            delayed = report.delayed,
            jitter_ms = report.jitter_std_ms,
            rating = report.rating.as_str(),
            "diagnostics complete"
        );
        self.restore(resume);
        Ok(report)
    }

    fn restore(&mut self, resume: Option<f64>) {
        if let Some(bpm) = resume
            && let Err(e) = self.start(bpm)
        {
            tracing::warn!(error = %e, "could not resume playback after diagnostics");
        }
    }
}

impl<O, C> Drop for BeatScheduler<O, C>
where
    O: ClickOutput + Send + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<O: ClickOutput, C: Clock>(mut output: O, mut ctx: WorkerCtx<C>) -> O {
    let epoch = ctx.clock.now();
    let mut due = Vec::new();
    let mut index: u64 = 0;
    let mut failures: u32 = 0;

    'outer: loop {
        if ctx.shutdown.load(Ordering::Relaxed) {
            break;
        }
        ctx.source.poll(ctx.clock.elapsed_ms(epoch), &mut due);
        for scheduled_ms in due.drain(..) {
            if ctx.shutdown.load(Ordering::Relaxed) {
                break 'outer;
            }
            let volume = f32::from_bits(ctx.volume.load(Ordering::Relaxed));
            match output.play(volume) {
                Ok(()) => {
                    failures = 0;
                    let timing = BeatTiming {
                        index,
                        scheduled_ms,
                        fired_ms: ctx.clock.elapsed_ms(epoch),
                    };
                    index += 1;
                    record(&ctx, &timing);
                }
                Err(e) => {
                    failures += 1;
                    if let Ok(mut s) = ctx.stats.lock() {
                        s.playback_failures += 1;
                    }
                    tracing::warn!(error = %e, failures, "click playback failed");
                    if failures > ctx.max_failures {
                        failures = 0;
                        reinitialise(&mut output, &mut ctx, epoch);
                        // The fresh grid owns what is due next.
                        break;
                    }
                }
            }
        }
        ctx.clock.sleep(ctx.source.poll_interval());
    }
    tracing::trace!(beats = index, "beat worker exiting");
    output
}

fn record<C>(ctx: &WorkerCtx<C>, timing: &BeatTiming) {
    if let Ok(mut s) = ctx.stats.lock() {
        s.record(timing);
    }
    if timing.delay_ms() > diagnostics::DELAYED_THRESHOLD_MS {
        tracing::debug!(index = timing.index, delay_ms = timing.delay_ms(), "late beat");
    }
    if let Some(cb) = &ctx.on_beat {
        cb(&BeatEvent {
            index: timing.index,
            bpm: ctx.bpm,
        });
    }
    if let Some(cb) = &ctx.on_timing {
        cb(timing);
    }
    if let Some(tx) = &ctx.capture {
        let _ = tx.send(*timing);
    }
}

/// Tear the output down and bring it back, then resume on a fresh grid at the same tempo.
fn reinitialise<O: ClickOutput, C: Clock>(
    output: &mut O,
    ctx: &mut WorkerCtx<C>,
    epoch: std::time::Instant,
) {
    tracing::error!(bpm = ctx.bpm, "repeated playback failures; re-initialising click output");
    match output.reset().and_then(|()| output.prepare(&ctx.sound)) {
        Ok(()) => {
            ctx.source.restart(ctx.clock.elapsed_ms(epoch));
            if let Ok(mut s) = ctx.stats.lock() {
                s.reinitialisations += 1;
            }
            tracing::info!(bpm = ctx.bpm, "click output re-initialised");
        }
        Err(e) => tracing::error!(error = %e, "click output re-initialisation failed"),
    }
}
