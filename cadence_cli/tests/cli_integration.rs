use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML config for the simulated back-end
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sensor]
position = "waist"
sample_rate_hz = 50

[scheduler]
precision = "synthesized"
prefer_native = false

[calibration]
reference_bpms = [80.0, 100.0, 120.0]
seconds_per_tempo = 30
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["diagnostics", "--bpm"], 2, "required", "stderr")]
#[case(&["track", "--seconds", "15", "--speed", "50"], 0, "tracking complete", "stdout")]
#[case(&["track", "--cadence", "0", "--seconds", "15", "--speed", "50"], 0, "final cadence 0.0 BPM", "stdout")]
#[case(&["diagnostics", "--seconds", "2", "--speed", "5"], 0, "rating:", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("cadence").unwrap();
    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("error");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn accelerometer_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.env("CADENCE_TEST_SIM_FAIL_READS", "1");
    cmd.arg("--config").arg(&cfg).arg("self-check");
    cmd.assert().code(3).stderr(predicate::str::contains(
        "What happened: Accelerometer read timed out",
    ));
}

#[rstest]
#[case("[sensor]\nposition = \"waist\"\nsample_rate_hz = 0\n", "Invalid configuration")]
#[case("[sensor]\nposition = \"elbow\"\n", "not valid TOML")]
#[case("[processing]\nmin_bpm = 40.0\n", "not valid TOML")]
fn cli_reports_bad_config(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.arg("--config").arg(&cfg).arg("self-check");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn cli_reports_missing_config_file() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("could not be read"));
}

#[rstest]
fn calibrate_prints_a_persistable_section() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("calibrate")
        .args(["--bias", "1.1", "--speed", "50"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("reference 80 BPM"))
        .stdout(predicate::str::contains("[calibration]"))
        .stdout(predicate::str::contains("multiplier = "));
}
