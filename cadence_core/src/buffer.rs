//! Fixed-capacity ring of recent accelerometer samples.

use std::collections::VecDeque;

use cadence_traits::AccelReading;

/// One accelerometer sample with its precomputed magnitude. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub magnitude: f64,
}

impl Sample {
    pub fn new(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
            magnitude: (x * x + y * y + z * z).sqrt(),
        }
    }
}

impl From<AccelReading> for Sample {
    fn from(r: AccelReading) -> Self {
        Sample::new(r.timestamp_ms, r.x, r.y, r.z)
    }
}

/// FIFO ring; the oldest sample is evicted once capacity is reached.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Magnitudes of every buffered sample, oldest first.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.magnitude).collect()
    }

    /// Magnitudes of the most recent `n` samples (fewer if the buffer is shorter).
    pub fn recent_magnitudes(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).map(|s| s.magnitude).collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
}
