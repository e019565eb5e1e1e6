use std::sync::{Arc, Mutex};

use cadence_traits::{ClickSound, NativeBeatEngine};

use crate::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NativeSnapshot {
    pub running: bool,
    pub bpm: f64,
    pub volume: f32,
    pub lookahead_ms: u64,
    pub starts: u32,
    pub stops: u32,
}

/// Stand-in for a host low-latency beat facility.
#[derive(Debug, Clone)]
pub struct SimulatedNativeEngine {
    available: bool,
    fail_start: bool,
    state: Arc<Mutex<NativeSnapshot>>,
}

impl SimulatedNativeEngine {
    pub fn available() -> Self {
        Self {
            available: true,
            fail_start: false,
            state: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Reports available but refuses to start.
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::available()
        }
    }

    pub fn snapshot(&self) -> NativeSnapshot {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }
}

impl NativeBeatEngine for SimulatedNativeEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start(
        &mut self,
        bpm: f64,
        lookahead: std::time::Duration,
        _sound: &ClickSound,
        volume: f32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.available {
            return Err(Box::new(SimError::Unavailable));
        }
        if self.fail_start {
            return Err(Box::new(SimError::Start("audio session busy".into())));
        }
        if let Ok(mut s) = self.state.lock() {
            s.running = true;
            s.bpm = bpm;
            s.volume = volume;
            s.lookahead_ms = lookahead.as_millis() as u64;
            s.starts += 1;
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut s) = self.state.lock() {
            s.volume = volume;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut s) = self.state.lock() {
            s.running = false;
            s.stops += 1;
        }
        Ok(())
    }
}
