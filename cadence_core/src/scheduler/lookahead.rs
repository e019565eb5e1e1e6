//! Look-ahead queue drained by a tempo-scaled fast poll.
//!
//! Beats on the absolute grid `anchor + n * interval` are queued once they fall
//! inside the look-ahead horizon; the queue is refilled every `refresh_ms`.
//! The poll loop then only compares the head of the queue against the clock.

use std::collections::BTreeSet;
use std::time::Duration;

use super::BeatSource;

/// Beats may fire this early to offset systematic wake-up lateness.
pub const EARLY_FIRE_TOLERANCE_MS: f64 = 1.0;

/// Poll interval scaled to tempo.
pub fn poll_interval_for(bpm: f64) -> Duration {
    if bpm > 120.0 {
        Duration::from_millis(1)
    } else if bpm > 60.0 {
        Duration::from_millis(2)
    } else {
        Duration::from_millis(5)
    }
}

#[derive(Debug, Clone)]
pub struct LookaheadSource {
    interval_ms: f64,
    lookahead_ms: f64,
    refresh_ms: f64,
    poll: Duration,
    /// Scheduled times in whole microseconds; ordered and deduplicated.
    queue: BTreeSet<u64>,
    anchor_ms: f64,
    next_index: u64,
    last_refresh_ms: Option<f64>,
    skipped: u64,
}

impl LookaheadSource {
    pub fn new(bpm: f64, start_ms: f64, lookahead: Duration, refresh: Duration) -> Self {
        Self {
            interval_ms: crate::util::beat_interval_ms(bpm),
            lookahead_ms: lookahead.as_secs_f64() * 1_000.0,
            refresh_ms: refresh.as_secs_f64() * 1_000.0,
            poll: poll_interval_for(bpm),
            queue: BTreeSet::new(),
            anchor_ms: start_ms,
            next_index: 0,
            last_refresh_ms: None,
            skipped: 0,
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Beats dropped because they were more than one interval overdue.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn refill(&mut self, now_ms: f64) {
        let horizon = now_ms + self.lookahead_ms;
        loop {
            let t = self.anchor_ms + self.next_index as f64 * self.interval_ms;
            if t > horizon {
                break;
            }
            self.queue.insert(to_us(t));
            self.next_index += 1;
        }
        self.last_refresh_ms = Some(now_ms);
    }
}

fn to_us(ms: f64) -> u64 {
    (ms.max(0.0) * 1_000.0).round() as u64
}

impl BeatSource for LookaheadSource {
    fn poll(&mut self, now_ms: f64, due: &mut Vec<f64>) {
        if self
            .last_refresh_ms
            .is_none_or(|t| now_ms - t >= self.refresh_ms)
        {
            self.refill(now_ms);
        }
        let cutoff = to_us(now_ms + EARLY_FIRE_TOLERANCE_MS);
        while let Some(&head) = self.queue.first()
            && head <= cutoff
        {
            self.queue.pop_first();
            let scheduled = head as f64 / 1_000.0;
            if now_ms - scheduled > self.interval_ms {
                self.skipped += 1;
                tracing::trace!(scheduled, now_ms, "stale beat skipped");
                continue;
            }
            due.push(scheduled);
        }
    }

    fn poll_interval(&self) -> Duration {
        self.poll
    }

    fn restart(&mut self, now_ms: f64) {
        self.queue.clear();
        self.anchor_ms = now_ms;
        self.next_index = 0;
        self.last_refresh_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn source(bpm: f64) -> LookaheadSource {
        LookaheadSource::new(
            bpm,
            0.0,
            Duration::from_millis(500),
            Duration::from_millis(100),
        )
    }

    #[rstest]
    #[case(180.0, 1)]
    #[case(121.0, 1)]
    #[case(120.0, 2)]
    #[case(61.0, 2)]
    #[case(60.0, 5)]
    #[case(30.0, 5)]
    fn poll_interval_scales_with_tempo(#[case] bpm: f64, #[case] ms: u64) {
        assert_eq!(poll_interval_for(bpm), Duration::from_millis(ms));
    }

    #[test]
    fn queue_covers_the_horizon() {
        let mut s = source(240.0);
        let mut due = Vec::new();
        s.poll(0.0, &mut due);
        assert_eq!(due, vec![0.0]);
        // 250, 500 remain queued.
        assert_eq!(s.queued(), 2);
    }

    #[test]
    fn fires_within_early_tolerance() {
        let mut s = source(120.0);
        let mut due = Vec::new();
        s.poll(0.0, &mut due);
        s.poll(498.0, &mut due);
        assert_eq!(due, vec![0.0]);
        s.poll(499.2, &mut due);
        assert_eq!(due, vec![0.0, 500.0]);
    }

    #[test]
    fn each_beat_fires_once() {
        let mut s = source(150.0);
        let mut due = Vec::new();
        let mut now = 0.0;
        while now <= 4_000.0 {
            s.poll(now, &mut due);
            now += 1.0;
        }
        let expected: Vec<f64> = (0..=10).map(|i| i as f64 * 400.0).collect();
        assert_eq!(due, expected);
    }

    #[test]
    fn restart_reanchors_and_clears() {
        let mut s = source(120.0);
        let mut due = Vec::new();
        s.poll(0.0, &mut due);
        s.restart(730.0);
        assert_eq!(s.queued(), 0);
        due.clear();
        s.poll(730.0, &mut due);
        assert_eq!(due, vec![730.0]);
    }
}
