use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn text2shader(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_text2shader"));
    command
        .env("TEXT2SHADER_CONFIG_DIR", config_dir)
        .env_remove("TEXT2SHADER_API");
    command
}

#[test]
fn help_lists_options() {
    let root = TempDir::new().unwrap();
    let output = text2shader(root.path())
        .arg("--help")
        .output()
        .expect("failed to run text2shader --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--source", "--endpoint", "--timeout", "--size", "--export", "--config"] {
        assert!(stdout.contains(flag), "missing {flag} in help output");
    }
    assert!(stdout.contains("TEXT2SHADER_API"));
}

#[test]
fn malformed_settings_file_fails_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.toml"), "timeout_secs = [").unwrap();

    let output = text2shader(root.path())
        .output()
        .expect("failed to run text2shader");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse settings file"));
}

#[test]
fn missing_source_file_is_reported() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("absent.frag");

    let output = text2shader(root.path())
        .arg("--source")
        .arg(&missing)
        .output()
        .expect("failed to run text2shader");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read shader source"));
}

#[test]
fn invalid_size_is_rejected_by_the_parser() {
    let root = TempDir::new().unwrap();
    let output = text2shader(root.path())
        .args(["--size", "wide"])
        .output()
        .expect("failed to run text2shader");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("WIDTHxHEIGHT"));
}
