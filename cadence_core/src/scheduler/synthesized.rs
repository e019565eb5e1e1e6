//! Drift-corrected 1 ms poll.
//!
//! After each fire the next deadline is `start + floor(elapsed / interval + 1) * interval`,
//! an absolute grid point, so lateness on one beat never shifts the next.

use std::time::Duration;

use super::BeatSource;

pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct SynthesizedSource {
    interval_ms: f64,
    start_ms: f64,
    next_tick_ms: f64,
}

impl SynthesizedSource {
    pub fn new(bpm: f64, start_ms: f64) -> Self {
        Self {
            interval_ms: crate::util::beat_interval_ms(bpm),
            start_ms,
            next_tick_ms: start_ms,
        }
    }

    pub fn next_tick_ms(&self) -> f64 {
        self.next_tick_ms
    }
}

impl BeatSource for SynthesizedSource {
    fn poll(&mut self, now_ms: f64, due: &mut Vec<f64>) {
        if now_ms < self.next_tick_ms {
            return;
        }
        due.push(self.next_tick_ms);
        let elapsed = now_ms - self.start_ms;
        self.next_tick_ms =
            self.start_ms + (elapsed / self.interval_ms + 1.0).floor() * self.interval_ms;
    }

    fn poll_interval(&self) -> Duration {
        POLL_INTERVAL
    }

    fn restart(&mut self, now_ms: f64) {
        self.start_ms = now_ms;
        self.next_tick_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlines_stay_on_the_grid() {
        let mut s = SynthesizedSource::new(120.0, 0.0);
        let mut due = Vec::new();
        s.poll(0.0, &mut due);
        // Fired 7 ms late; the next deadline is still 1000, not 1007.
        s.poll(507.0, &mut due);
        assert_eq!(s.next_tick_ms(), 1000.0);
        s.poll(999.0, &mut due);
        s.poll(1000.5, &mut due);
        assert_eq!(due, vec![0.0, 500.0, 1000.0]);
    }

    #[test]
    fn missed_beats_are_skipped_not_bunched() {
        let mut s = SynthesizedSource::new(120.0, 0.0);
        let mut due = Vec::new();
        s.poll(0.0, &mut due);
        s.poll(1720.0, &mut due);
        assert_eq!(due, vec![0.0, 500.0]);
        assert_eq!(s.next_tick_ms(), 2000.0);
    }
}
