use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CadenceError {
    #[error("device error: {0}")]
    Device(String),
    #[error("audio back-end error: {0}")]
    Audio(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing accelerometer")]
    MissingAccelerometer,
    #[error("missing click output")]
    MissingOutput,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a boxed device error to a typed `CadenceError`.
///
/// With the `sim-errors` feature the simulator's error type is matched exactly;
/// anything else falls back to inspecting the message.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> CadenceError {
    #[cfg(feature = "sim-errors")]
    {
        if let Some(sim) = e.downcast_ref::<cadence_sim::SimError>() {
            return match sim {
                cadence_sim::SimError::Timeout => CadenceError::Timeout,
                cadence_sim::SimError::Playback(msg) => CadenceError::Audio(msg.clone()),
                other => CadenceError::Device(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        CadenceError::Timeout
    } else {
        CadenceError::Device(s)
    }
}
