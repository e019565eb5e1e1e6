//! Background accelerometer sampling.
//!
//! Spawns a thread that owns the `Accelerometer`, forwards readings over a
//! bounded channel and tracks the last-ok timestamp for stall detection.
//!
//! Each `Sampler` owns exactly one thread; `stop()` (or drop) signals it and
//! joins it, so no reading is delivered after a logical stop. The thread hands
//! the accelerometer back on exit so sensing can be restarted later.
use cadence_traits::Accelerometer;
use cadence_traits::clock::Clock;
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::buffer::Sample;
use crate::error::map_device_error;

/// Readings buffered between the sampler thread and the consumer (≈5 s at 50 Hz).
pub const CHANNEL_CAPACITY: usize = 256;

pub struct Sampler<A> {
    rx: xch::Receiver<Sample>,
    last_ok: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<A>>,
}

impl<A> Sampler<A>
where
    A: Accelerometer + Send + 'static,
{
    /// Paced sampler: one read per `1/hz`, each bounded by `timeout`.
    pub fn spawn<C>(mut accel: A, hz: u32, timeout: Duration, clock: C) -> Self
    where
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_clone = dropped.clone();
        let period = Duration::from_micros(crate::util::period_us(hz));
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            let mut consecutive_errors: u32 = 0;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                match accel.read(timeout) {
                    Ok(reading) => {
                        consecutive_errors = 0;
                        match tx.try_send(Sample::from(reading)) {
                            Ok(()) => {}
                            Err(xch::TrySendError::Full(_)) => {
                                dropped_clone.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(xch::TrySendError::Disconnected(_)) => {
                                tracing::debug!("sampler consumer disconnected, exiting thread");
                                break;
                            }
                        }
                        last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        // Log the first failure of a run only; callers watch `stalled_for`.
                        if consecutive_errors == 1 {
                            let err = map_device_error(&*e);
                            tracing::warn!(error = %err, "accelerometer read failed");
                        }
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("sampler thread exiting cleanly");
            accel
        });

        Self {
            rx,
            last_ok,
            dropped,
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl<A> Sampler<A> {
    /// Take every reading delivered so far, oldest first.
    pub fn drain(&self) -> Vec<Sample> {
        self.rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next reading.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Sample> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Milliseconds since the last successful read, relative to the sampler epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Readings discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.is_some()
    }

    /// Signal the thread and join it, returning the accelerometer.
    ///
    /// Safe to call more than once; later calls return `None`. Returns after
    /// the current `read` completes, so waits at most one read timeout.
    pub fn stop(&mut self) -> Option<A> {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.join_handle.take()?;
        let accel = match handle.join() {
            Ok(accel) => {
                tracing::trace!("sampler thread joined");
                Some(accel)
            }
            Err(e) => {
                tracing::warn!(?e, "sampler thread panicked during shutdown");
                None
            }
        };
        // Readings sent before the flag was seen are stale after a stop.
        let stale = self.rx.try_iter().count();
        if stale > 0 {
            tracing::trace!(stale, "discarded readings after stop");
        }
        accel
    }
}

impl<A> Drop for Sampler<A> {
    fn drop(&mut self) {
        self.stop();
    }
}
