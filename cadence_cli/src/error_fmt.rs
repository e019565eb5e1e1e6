//! Human-readable error descriptions and structured JSON error formatting.

use cadence_core::error::{BuildError, CadenceError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAccelerometer => {
                "What happened: No accelerometer was provided to the cadence engine.\nLikely causes: The sensor failed to initialize or was not wired into the builder.\nHow to fix: Pass the sensor via with_accelerometer(...).".to_string()
            }
            BuildError::MissingOutput => {
                "What happened: No click output was provided to the cadence engine.\nLikely causes: The audio back-end failed to initialize or was not wired into the builder.\nHow to fix: Pass the output via with_click_output(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/cadence_config.toml for a sample."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CadenceError>() {
        return match ce {
            CadenceError::Timeout => "What happened: Accelerometer read timed out.\nLikely causes: Sensor disconnected, not streaming, or timeout too low.\nHow to fix: Check the sensor connection and consider increasing sensor.read_timeout_ms in the config.".to_string(),
            CadenceError::Audio(msg) => format!(
                "What happened: Click playback failed ({msg}).\nLikely causes: Audio device busy or unplugged.\nHow to fix: Check the output device, then rerun."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics over the whole context chain
    let msg = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Point --config at a readable TOML file. Original: {msg}"
        );
    }
    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Syntax error, unknown value, or missing [sensor] section.\nHow to fix: Compare against etc/cadence_config.toml. Original: {msg}"
        );
    }
    if lower.contains("must be") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    // Generic fallback
    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 6;
    }
    match err.downcast_ref::<CadenceError>() {
        Some(CadenceError::Timeout) => 3,
        Some(CadenceError::Device(_)) => 4,
        Some(CadenceError::Audio(_)) => 5,
        Some(CadenceError::Config(_)) => 6,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<CadenceError>() {
        Some(CadenceError::Timeout) => "Timeout",
        Some(CadenceError::Device(_)) => "Device",
        Some(CadenceError::Audio(_)) => "Audio",
        Some(CadenceError::Config(_)) => "Config",
        Some(CadenceError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "event": "error",
        "reason": reason_name(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn typed_errors_survive_context() {
        let err = Err::<(), _>(CadenceError::Timeout)
            .wrap_err("reading accelerometer")
            .unwrap_err();
        assert!(humanize(&err).contains("Accelerometer read timed out"));
        assert_eq!(exit_code_for_error(&err), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Timeout");
    }

    #[test]
    fn config_messages_are_recognised_through_the_chain() {
        let err = eyre::eyre!("sensor.sample_rate_hz must be > 0").wrap_err("loading config");
        assert!(humanize(&err).starts_with("What happened: Invalid configuration"));
        assert_eq!(exit_code_for_error(&err), 1);
    }
}
