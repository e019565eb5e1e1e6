//! Recording click output and a PCM renderer for the click timbre.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use cadence_traits::{ClickOutput, ClickSound, Waveform};

use crate::SimError;

pub const RENDER_SAMPLE_RATE: u32 = 44_100;
/// Linear fade at each end of a click to avoid audible pops.
const FADE_MS: f32 = 5.0;

/// Render one click at `volume` as mono f32 PCM.
pub fn render_click(sound: &ClickSound, volume: f32, sample_rate: u32) -> Vec<f32> {
    let n = (u64::from(sample_rate) * u64::from(sound.duration_ms) / 1_000) as usize;
    let fade = ((FADE_MS / 1_000.0) * sample_rate as f32) as usize;
    let fade = fade.min(n / 2).max(1);
    let volume = volume.clamp(0.0, 1.0);
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let cycle = (t * sound.frequency_hz).fract();
            let v = match sound.waveform {
                Waveform::Sine => (std::f32::consts::TAU * cycle).sin(),
                Waveform::Square => {
                    if cycle < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Waveform::Triangle => 1.0 - 4.0 * (cycle - 0.5).abs(),
                Waveform::Sawtooth => 2.0 * cycle - 1.0,
            };
            let envelope = (i.min(n - 1 - i) as f32 / fade as f32).min(1.0);
            v * envelope * volume
        })
        .collect()
}

/// One recorded click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickRecord {
    pub at: Instant,
    pub volume: f32,
    /// Largest absolute sample of the rendered click.
    pub peak: f32,
}

#[derive(Debug, Default)]
struct Recording {
    clicks: Vec<ClickRecord>,
    prepared: Option<ClickSound>,
    fail_plays: u32,
    resets: u32,
    fail_forever: bool,
}

/// Click output that renders nothing audible and records every call.
///
/// Clones share the same recording so tests can inspect it while a
/// scheduler owns the output.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClickOutput {
    inner: Arc<Mutex<Recording>>,
}

impl SimulatedClickOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> Vec<ClickRecord> {
        self.inner.lock().map(|r| r.clicks.clone()).unwrap_or_default()
    }

    pub fn click_count(&self) -> usize {
        self.inner.lock().map(|r| r.clicks.len()).unwrap_or(0)
    }

    pub fn prepared(&self) -> Option<ClickSound> {
        self.inner.lock().ok().and_then(|r| r.prepared)
    }

    pub fn resets(&self) -> u32 {
        self.inner.lock().map(|r| r.resets).unwrap_or(0)
    }

    /// Fail the next `n` plays.
    pub fn fail_next_plays(&self, n: u32) {
        if let Ok(mut r) = self.inner.lock() {
            r.fail_plays = n;
        }
    }

    /// Fail every play until `reset` is called.
    pub fn fail_until_reset(&self) {
        if let Ok(mut r) = self.inner.lock() {
            r.fail_forever = true;
        }
    }
}

impl ClickOutput for SimulatedClickOutput {
    fn prepare(
        &mut self,
        sound: &ClickSound,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut r) = self.inner.lock() {
            r.prepared = Some(*sound);
        }
        Ok(())
    }

    fn play(&mut self, volume: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut r = self
            .inner
            .lock()
            .map_err(|_| SimError::Playback("recording lock poisoned".into()))?;
        if r.fail_forever {
            return Err(Box::new(SimError::Playback("output wedged".into())));
        }
        if r.fail_plays > 0 {
            r.fail_plays -= 1;
            return Err(Box::new(SimError::Playback("buffer underrun".into())));
        }
        let sound = r
            .prepared
            .ok_or_else(|| SimError::Playback("play before prepare".into()))?;
        let peak = render_click(&sound, volume, RENDER_SAMPLE_RATE)
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        r.clicks.push(ClickRecord {
            at: Instant::now(),
            volume,
            peak,
        });
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut r) = self.inner.lock() {
            r.resets += 1;
            r.fail_forever = false;
            r.fail_plays = 0;
            r.prepared = None;
        }
        tracing::debug!("simulated click output reset");
        Ok(())
    }
}
