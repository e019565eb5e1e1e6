//! Walking/stationary gate over a short magnitude window.
//!
//! Both conditions must hold: enough mean-crossings (a rhythm is present) and
//! enough spread (the device is actually moving). A single tap on the device
//! has high variance but few crossings and is rejected.

/// Minimum sign changes of `magnitude - mean` inside the window.
pub const MIN_MEAN_CROSSINGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityStats {
    pub mean: f64,
    pub std_dev: f64,
    pub crossings: usize,
}

#[derive(Debug, Clone)]
pub struct ActivityDetector {
    window: usize,
    threshold: f64,
}

impl ActivityDetector {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self {
            window: window.max(2),
            threshold,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Mean, population standard deviation and mean-crossings of the last `window` values.
    pub fn stats(&self, magnitudes: &[f64]) -> ActivityStats {
        let start = magnitudes.len().saturating_sub(self.window);
        let recent = &magnitudes[start..];
        let (mean, std_dev) = crate::util::mean_std(recent);
        let mut crossings = 0;
        let mut prev_above: Option<bool> = None;
        for &m in recent {
            let above = m - mean > 0.0;
            if let Some(p) = prev_above
                && p != above
            {
                crossings += 1;
            }
            prev_above = Some(above);
        }
        ActivityStats {
            mean,
            std_dev,
            crossings,
        }
    }

    pub fn is_active(&self, magnitudes: &[f64]) -> bool {
        if magnitudes.len() < 2 {
            return false;
        }
        let stats = self.stats(magnitudes);
        stats.crossings >= MIN_MEAN_CROSSINGS && stats.std_dev > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walking(n: usize, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 9.81 + amp * (2.0 * std::f64::consts::PI * 1.8 * i as f64 / 50.0).sin())
            .collect()
    }

    #[test]
    fn rhythmic_motion_is_active() {
        let det = ActivityDetector::new(50, 0.15);
        assert!(det.is_active(&walking(50, 1.5)));
    }

    #[test]
    fn still_device_is_inactive() {
        let det = ActivityDetector::new(50, 0.15);
        assert!(!det.is_active(&vec![9.81; 50]));
    }

    #[test]
    fn isolated_spike_is_rejected() {
        let det = ActivityDetector::new(50, 0.15);
        let mut tap = vec![9.81; 50];
        tap[25] = 30.0;
        let stats = det.stats(&tap);
        assert!(stats.std_dev > 0.15);
        assert!(stats.crossings < MIN_MEAN_CROSSINGS);
        assert!(!det.is_active(&tap));
    }

    #[test]
    fn only_recent_window_is_examined() {
        let det = ActivityDetector::new(50, 0.15);
        let mut series = walking(100, 1.5);
        series.extend(vec![9.81; 50]);
        assert!(!det.is_active(&series));
    }
}
