//! Coarse periodic metronome: the next tick is one interval after the tick
//! actually fired, so lateness accumulates.

use std::time::Duration;

use super::BeatSource;

#[derive(Debug, Clone)]
pub struct BasicSource {
    interval_ms: f64,
    next_tick_ms: f64,
}

impl BasicSource {
    pub fn new(bpm: f64, start_ms: f64) -> Self {
        Self {
            interval_ms: crate::util::beat_interval_ms(bpm),
            next_tick_ms: start_ms,
        }
    }
}

impl BeatSource for BasicSource {
    fn poll(&mut self, now_ms: f64, due: &mut Vec<f64>) {
        if now_ms >= self.next_tick_ms {
            due.push(self.next_tick_ms);
            self.next_tick_ms = now_ms + self.interval_ms;
        }
    }

    fn poll_interval(&self) -> Duration {
        let ms = (self.interval_ms / 10.0).max(1.0);
        Duration::from_micros((ms * 1_000.0).round() as u64)
    }

    fn restart(&mut self, now_ms: f64) {
        self.next_tick_ms = now_ms;
    }
}
