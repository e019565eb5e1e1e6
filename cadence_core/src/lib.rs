#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Real-time gait cadence sensing and synchronised beat cueing (hardware-agnostic).
//!
//! All device interaction goes through `cadence_traits::Accelerometer`,
//! `cadence_traits::ClickOutput` and `cadence_traits::NativeBeatEngine`.
//!
//! ## Architecture
//!
//! - **Sensing**: `buffer` → `activity` gate → `filter` → `estimators` → `fusion`,
//!   driven by `tracker` once enough samples have arrived.
//! - **Calibration**: `calibration` fits a linear correction from reference
//!   tempos played through the `scheduler`; `runner::run_calibration` drives it.
//! - **Cueing**: `scheduler` emits clicks in one of three precision modes, or
//!   delegates to a native engine when the host has one.
//! - **Sharing**: `signal::SignalHub` publishes cadence, coefficients and the
//!   accuracy readout as whole-value swaps; every other buffer is owned by one
//!   subsystem.

pub mod activity;
pub mod buffer;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod estimators;
pub mod filter;
pub mod fusion;
pub mod monitor;
pub mod runner;
pub mod sampler;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod tracker;
pub mod util;

pub use buffer::{Sample, SampleBuffer};
pub use calibration::{
    CalibrationCoefficients, CalibrationEngine, CalibrationPoint, CalibrationResult,
    CalibrationState,
};
pub use config::{PrecisionMode, SchedulerCfg, SensingCfg, SensorPosition};
pub use error::{BuildError, CadenceError, Result};
pub use monitor::{CadenceMonitor, MonitorEvent};
pub use runner::{CalibrationPlan, run_calibration, run_tracking};
pub use scheduler::{BeatEngineState, BeatEvent, BeatScheduler, DiagnosticsReport, JitterRating};
pub use session::{CadenceSession, SessionBuilder};
pub use signal::{AccuracyReadout, CadenceSignal, SignalHub};
pub use tracker::{CadenceTracker, CycleReport};
