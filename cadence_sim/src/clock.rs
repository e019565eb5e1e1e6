use std::time::{Duration, Instant};

use cadence_traits::Clock;

/// Real clock running `factor` times faster: sleeps are shortened and elapsed
/// time is stretched by the same factor. Lets long sessions run in seconds
/// while keeping threads genuinely concurrent.
#[derive(Debug, Clone, Copy)]
pub struct AcceleratedClock {
    origin: Instant,
    factor: f64,
}

impl AcceleratedClock {
    pub fn new(factor: f64) -> Self {
        Self {
            origin: Instant::now(),
            factor: if factor.is_finite() && factor > 0.0 {
                factor
            } else {
                1.0
            },
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Clock for AcceleratedClock {
    fn now(&self) -> Instant {
        let real = self.origin.elapsed();
        self.origin + real.mul_f64(self.factor)
    }

    fn sleep(&self, d: Duration) {
        let real = d.div_f64(self.factor);
        if !real.is_zero() {
            std::thread::sleep(real);
        }
    }
}
