//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "cadence", version, about = "Gait cadence tracking and beat cueing")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/cadence_config.toml")]
    pub config: PathBuf,

    /// Emit JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Precision mode override on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Mode {
    Basic,
    HighPrecision,
    Synthesized,
}

impl From<Mode> for cadence_core::PrecisionMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Basic => Self::Basic,
            Mode::HighPrecision => Self::HighPrecision,
            Mode::Synthesized => Self::Synthesized,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure the cadence of a simulated walker
    Track {
        /// Walker cadence in steps per minute (0 stands still)
        #[arg(long, default_value_t = 100.0)]
        cadence: f64,
        /// Simulated seconds to track for
        #[arg(long, default_value_t = 30)]
        seconds: u64,
        /// Play a cue at this tempo while tracking
        #[arg(long, value_name = "BPM")]
        cue: Option<f64>,
        /// Time acceleration factor (1 = real time)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Fit correction coefficients from the configured reference tempos
    Calibrate {
        /// Factor by which the simulated walker misses each reference tempo
        #[arg(long, default_value_t = 1.0)]
        bias: f64,
        /// Override seconds captured per reference tempo
        #[arg(long, value_name = "SECONDS")]
        seconds_per_tempo: Option<u64>,
        /// Time acceleration factor (1 = real time)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Measure beat timing jitter of the in-process scheduler
    Diagnostics {
        /// Tempo to play
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,
        /// Seconds to play for
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        /// Precision mode (defaults to the configured one)
        #[arg(long, value_enum)]
        mode: Option<Mode>,
        /// Time acceleration factor (1 = real time)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
    /// Quick health check of config and simulated devices
    SelfCheck,
}
