//! CLI integration tests

use std::process::{Command, Output};

fn gfc(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "glucose-cli", "--"])
        .args(args)
        .env_remove("GFC_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = gfc(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Glucose Forecast"), "Should show app name");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("config"), "Should show config command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = gfc(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("gfc"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = gfc(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--user-id"), "Should show user-id option");
    assert!(stdout.contains("--input"), "Should show input option");
    assert!(stdout.contains("--seq"), "Should show seq option");
    assert!(stdout.contains("--static"), "Should show static option");
}

/// Test global options
#[test]
fn test_global_options() {
    let output = gfc(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("GFC_API_URL"), "Should show env var");
    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// A short sequence is refused before any request is sent
#[test]
fn test_predict_short_sequence_fails_locally() {
    let output = gfc(&[
        "--api-url",
        "http://127.0.0.1:9",
        "predict",
        "--user-id",
        "u1",
        "--seq",
        "120,121,122",
        "--static",
        "30,1,0,5.5,2",
    ]);

    assert!(!output.status.success(), "Short sequence should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("x_seq"), "Should name the offending field");
}

/// Test that --input and inline values cannot be combined
#[test]
fn test_predict_input_conflicts_with_inline_values() {
    let output = gfc(&[
        "predict",
        "--user-id",
        "u1",
        "--input",
        "payload.json",
        "--seq",
        "120",
    ]);

    assert!(!output.status.success(), "Conflicting inputs should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"), "Should explain the conflict");
}

/// Test missing required argument error handling
#[test]
fn test_missing_user_id() {
    let output = gfc(&["predict", "--seq", "120"]);

    assert!(!output.status.success(), "Missing argument should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = gfc(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// A corrupt config file must not block the command that rewrites it
#[test]
fn test_corrupt_config_is_replaced_by_set_api_url() {
    let home = tempfile::TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("gfc");
    std::fs::create_dir_all(&config_dir).unwrap();
    let config_file = config_dir.join("config.json");
    std::fs::write(&config_file, "{not json").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_gfc"))
        .args(["config", "set-api-url", "http://localhost:8000"])
        .env("HOME", home.path())
        .env_remove("GFC_API_URL")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "set-api-url should succeed");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Ignoring"), "Should warn about the bad file");

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config_file).unwrap()).unwrap();
    assert_eq!(saved["api_url"], "http://localhost:8000");
}

/// An explicit --api-url never reads the config file
#[test]
fn test_corrupt_config_ignored_with_explicit_url() {
    let home = tempfile::TempDir::new().unwrap();
    let config_dir = home.path().join(".config").join("gfc");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.json"), "{not json").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_gfc"))
        .args(["--api-url", "http://127.0.0.1:9", "health"])
        .env("HOME", home.path())
        .env_remove("GFC_API_URL")
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success(), "Nothing listens on the port");
    assert!(
        stderr.contains("Failed to send request"),
        "Should fail on the request, not the config"
    );
    assert!(!stderr.contains("Ignoring"), "Should not read the config file");
}
