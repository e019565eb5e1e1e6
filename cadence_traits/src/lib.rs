pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// One raw 3-axis accelerometer reading in m/s², stamped in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelReading {
    pub timestamp_ms: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub trait Accelerometer {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<AccelReading, Box<dyn std::error::Error + Send + Sync>>;
}

/// Click waveform shape, passed through to the audio back-end untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// Timbre of the audible cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickSound {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    pub waveform: Waveform,
}

impl Default for ClickSound {
    fn default() -> Self {
        Self {
            frequency_hz: 1_000.0,
            duration_ms: 50,
            waveform: Waveform::Sine,
        }
    }
}

/// In-process audio back-end that emits one click per call.
pub trait ClickOutput {
    fn prepare(
        &mut self,
        sound: &ClickSound,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn play(&mut self, volume: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Tear down and re-open the back-end after repeated failures.
    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Host-provided low-latency beat generator.
///
/// Implementations own their own timing; the scheduler only starts and stops them.
pub trait NativeBeatEngine {
    fn is_available(&self) -> bool;
    fn start(
        &mut self,
        bpm: f64,
        lookahead: std::time::Duration,
        sound: &ClickSound,
        volume: f32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_volume(&mut self, volume: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Accelerometer + ?Sized> Accelerometer for Box<T> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<AccelReading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}

impl<T: ClickOutput + ?Sized> ClickOutput for Box<T> {
    fn prepare(
        &mut self,
        sound: &ClickSound,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).prepare(sound)
    }
    fn play(&mut self, volume: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).play(volume)
    }
    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).reset()
    }
}
