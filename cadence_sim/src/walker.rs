//! Synthetic 3-axis accelerometer for a person walking at a settable cadence.
//!
//! Vertical acceleration carries one peak per step plus a weaker second
//! harmonic; the lateral axis sways at half the step rate. Samples are
//! generated on a fixed `1 / sample_rate_hz` grid by index, independent of
//! how fast the caller reads, so the signal stays continuous under any clock.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use cadence_traits::{AccelReading, Accelerometer};

use crate::SimError;

pub const GRAVITY: f64 = 9.81;

/// Shared cadence knob; clones control the same walker.
#[derive(Debug, Clone, Default)]
pub struct CadenceHandle(Arc<AtomicU64>);

impl CadenceHandle {
    /// Steps per minute; 0 or less means standing still.
    pub fn set(&self, bpm: f64) {
        self.0.store(bpm.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Tiny xorshift PRNG; deterministic per seed.
#[derive(Debug, Clone)]
pub struct XorShift(u32);

impl XorShift {
    pub fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    /// Uniform in [-1, 1).
    pub fn next_signed(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0) * 2.0 - 1.0
    }
}

pub struct SimulatedWalker {
    cadence: CadenceHandle,
    sample_rate_hz: u32,
    amplitude: f64,
    noise: f64,
    rng: XorShift,
    index: u64,
    phase: f64,
    fail_reads: Arc<AtomicU32>,
}

impl SimulatedWalker {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            cadence: CadenceHandle::default(),
            sample_rate_hz: sample_rate_hz.max(1),
            amplitude: 1.5,
            noise: 0.05,
            rng: XorShift::new(0x5eed),
            index: 0,
            phase: 0.0,
            fail_reads: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_cadence(self, bpm: f64) -> Self {
        self.cadence.set(bpm);
        self
    }

    /// Peak vertical acceleration above gravity (m/s²).
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Peak of the uniform noise added to every axis (m/s²).
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.rng = XorShift::new(seed);
        self
    }

    pub fn cadence_handle(&self) -> CadenceHandle {
        self.cadence.clone()
    }

    /// Make the next `n` reads time out.
    pub fn fail_next_reads(&self, n: u32) {
        self.fail_reads.store(n, Ordering::Relaxed);
    }

    /// Next sample on the grid, without failure injection.
    pub fn next_reading(&mut self) -> AccelReading {
        let fs = f64::from(self.sample_rate_hz);
        let timestamp_ms = self.index * 1_000 / u64::from(self.sample_rate_hz);
        self.index += 1;

        let bpm = self.cadence.get();
        let (mut x, mut y, mut z) = (0.0, 0.0, GRAVITY);
        if bpm > 0.0 {
            self.phase = (self.phase + TAU * (bpm / 60.0) / fs) % TAU;
            let p = self.phase;
            z += self.amplitude * (p.sin() + 0.25 * (2.0 * p).sin());
            x += 0.3 * self.amplitude * (0.5 * p).sin();
            y += 0.1 * self.amplitude * p.cos();
        }
        x += self.noise * self.rng.next_signed();
        y += self.noise * self.rng.next_signed();
        z += self.noise * self.rng.next_signed();
        AccelReading {
            timestamp_ms,
            x,
            y,
            z,
        }
    }
}

impl Accelerometer for SimulatedWalker {
    fn read(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<AccelReading, Box<dyn std::error::Error + Send + Sync>> {
        let pending = self.fail_reads.load(Ordering::Relaxed);
        if pending > 0 {
            self.fail_reads.store(pending - 1, Ordering::Relaxed);
            return Err(Box::new(SimError::Timeout));
        }
        Ok(self.next_reading())
    }
}
