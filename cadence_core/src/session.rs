//! A wired sensing + cueing session over boxed devices.
//!
//! The builder uses type-state markers so `build()` is only available once an
//! accelerometer and a click output are set; `try_build()` works in any state
//! and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use cadence_traits::clock::{Clock, MonotonicClock};
use cadence_traits::{Accelerometer, ClickOutput, ClickSound, NativeBeatEngine};

use crate::buffer::Sample;
use crate::calibration::CalibrationCoefficients;
use crate::config::{SchedulerCfg, SensingCfg};
use crate::error::{BuildError, CadenceError, Result};
use crate::monitor::CadenceMonitor;
use crate::sampler::Sampler;
use crate::scheduler::BeatScheduler;
use crate::tracker::CycleReport;

pub type BoxedAccelerometer = Box<dyn Accelerometer + Send>;
pub type BoxedClickOutput = Box<dyn ClickOutput + Send>;
pub type SharedClock = Arc<dyn Clock + Send + Sync>;
pub type SessionScheduler = BeatScheduler<BoxedClickOutput, SharedClock>;

pub struct CadenceSession {
    monitor: CadenceMonitor,
    scheduler: SessionScheduler,
    accelerometer: Option<BoxedAccelerometer>,
    sampler: Option<Sampler<BoxedAccelerometer>>,
    clock: SharedClock,
}

impl CadenceSession {
    pub fn builder() -> SessionBuilder<Missing, Missing> {
        SessionBuilder::default()
    }

    pub fn monitor(&self) -> &CadenceMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut CadenceMonitor {
        &mut self.monitor
    }

    pub fn scheduler(&self) -> &SessionScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SessionScheduler {
        &mut self.scheduler
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn is_sensing(&self) -> bool {
        self.sampler.is_some()
    }

    /// Spawn the background sampler and start the processing cycle.
    pub fn start_sensing(&mut self) -> Result<()> {
        if self.sampler.is_some() {
            return Ok(());
        }
        let accel = self.accelerometer.take().ok_or_else(|| {
            CadenceError::State("accelerometer was lost when the sampler failed".into())
        })?;
        let cfg = self.monitor.tracker().config();
        let sampler = Sampler::spawn(
            accel,
            cfg.sample_rate_hz,
            Duration::from_millis(cfg.read_timeout_ms),
            self.clock.clone(),
        );
        self.sampler = Some(sampler);
        self.monitor.start();
        Ok(())
    }

    /// Stop the sampler and the tracker. Idempotent.
    pub fn stop_sensing(&mut self) {
        if let Some(mut sampler) = self.sampler.take() {
            if sampler.dropped() > 0 {
                tracing::warn!(dropped = sampler.dropped(), "samples dropped while sensing");
            }
            self.accelerometer = sampler.stop();
        }
        self.monitor.stop();
    }

    /// Move every delivered sample through the pipeline; returns completed cycles.
    pub fn poll(&mut self) -> Vec<CycleReport> {
        let samples: Vec<Sample> = match &self.sampler {
            Some(s) => s.drain(),
            None => return Vec::new(),
        };
        self.monitor.ingest_all(samples)
    }

    /// Stop both subsystems.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.stop_sensing();
    }
}

impl Drop for CadenceSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for `CadenceSession`.
pub struct SessionBuilder<A, O> {
    accelerometer: Option<BoxedAccelerometer>,
    output: Option<BoxedClickOutput>,
    native: Option<Box<dyn NativeBeatEngine + Send>>,
    sensing: Option<SensingCfg>,
    scheduler: Option<SchedulerCfg>,
    sound: Option<ClickSound>,
    coefficients: Option<CalibrationCoefficients>,
    clock: Option<SharedClock>,
    _a: PhantomData<A>,
    _o: PhantomData<O>,
}

impl Default for SessionBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            accelerometer: None,
            output: None,
            native: None,
            sensing: None,
            scheduler: None,
            sound: None,
            coefficients: None,
            clock: None,
            _a: PhantomData,
            _o: PhantomData,
        }
    }
}

impl<A, O> SessionBuilder<A, O> {
    pub fn with_accelerometer(
        self,
        accel: impl Accelerometer + Send + 'static,
    ) -> SessionBuilder<Set, O> {
        SessionBuilder {
            accelerometer: Some(Box::new(accel)),
            output: self.output,
            native: self.native,
            sensing: self.sensing,
            scheduler: self.scheduler,
            sound: self.sound,
            coefficients: self.coefficients,
            clock: self.clock,
            _a: PhantomData,
            _o: PhantomData,
        }
    }

    pub fn with_click_output(
        self,
        output: impl ClickOutput + Send + 'static,
    ) -> SessionBuilder<A, Set> {
        SessionBuilder {
            accelerometer: self.accelerometer,
            output: Some(Box::new(output)),
            native: self.native,
            sensing: self.sensing,
            scheduler: self.scheduler,
            sound: self.sound,
            coefficients: self.coefficients,
            clock: self.clock,
            _a: PhantomData,
            _o: PhantomData,
        }
    }

    pub fn with_native(mut self, engine: impl NativeBeatEngine + Send + 'static) -> Self {
        self.native = Some(Box::new(engine));
        self
    }

    pub fn with_sensing(mut self, cfg: SensingCfg) -> Self {
        self.sensing = Some(cfg);
        self
    }

    pub fn with_scheduler(mut self, cfg: SchedulerCfg) -> Self {
        self.scheduler = Some(cfg);
        self
    }

    pub fn with_click_sound(mut self, sound: ClickSound) -> Self {
        self.sound = Some(sound);
        self
    }

    /// Persisted correction to start from; identity when unset.
    pub fn with_coefficients(mut self, coefficients: CalibrationCoefficients) -> Self {
        self.coefficients = Some(coefficients);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<CadenceSession> {
        let accelerometer = self
            .accelerometer
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAccelerometer))?;
        let output = self
            .output
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOutput))?;
        let sensing = self.sensing.unwrap_or_default();
        let sched = self.scheduler.unwrap_or_default();

        if sensing.sample_rate_hz == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sample_rate_hz must be > 0",
            )));
        }
        if sensing.initial_samples > sensing.buffer_capacity {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "initial_samples must not exceed buffer_capacity",
            )));
        }
        if sensing.min_bpm <= 0.0 || sensing.min_bpm >= sensing.max_bpm {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "cadence band must satisfy 0 < min_bpm < max_bpm",
            )));
        }
        if sched.lookahead_ms == 0 || sched.refresh_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "lookahead_ms and refresh_ms must be >= 1",
            )));
        }

        let clock: SharedClock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let mut scheduler =
            BeatScheduler::new(output, clock.clone(), sched, self.sound.unwrap_or_default());
        if let Some(native) = self.native {
            scheduler = scheduler.with_native(native);
        }
        Ok(CadenceSession {
            monitor: CadenceMonitor::new(sensing, self.coefficients.unwrap_or_default()),
            scheduler,
            accelerometer: Some(accelerometer),
            sampler: None,
            clock,
        })
    }
}

impl SessionBuilder<Set, Set> {
    pub fn build(self) -> Result<CadenceSession> {
        self.try_build()
    }
}
