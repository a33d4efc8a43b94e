//! Binary-level tests for the cp CLI

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `cp` command isolated from the user's home, config and keys
fn cp(temp: &TempDir) -> Command {
    let config = temp.path().join("careplan.yml");
    std::fs::write(
        &config,
        format!(
            "openai:\n  api-key-env: CAREPLAN_TEST_MISSING_OPENAI_KEY\ngemini:\n  api-key-env: CAREPLAN_TEST_MISSING_GEMINI_KEY\nstorage:\n  store-dir: {}\n",
            temp.path().join("store").display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("cp").unwrap();
    cmd.env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env_remove("CAREPLAN_TEST_MISSING_OPENAI_KEY")
        .env_remove("CAREPLAN_TEST_MISSING_GEMINI_KEY")
        .arg("--config")
        .arg(&config);
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("cp")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("structure"))
        .stdout(predicate::str::contains("describe"));
}

#[test]
fn test_describe_without_key_is_configuration_error() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("scan.png");
    std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();

    cp(&temp)
        .arg("describe")
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("CAREPLAN_TEST_MISSING_GEMINI_KEY"));
}

#[test]
fn test_describe_missing_file_fails() {
    let temp = TempDir::new().unwrap();

    cp(&temp)
        .arg("describe")
        .arg(temp.path().join("nope.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Encoding error"));
}

#[test]
fn test_describe_bad_data_url_fails_before_provider() {
    let temp = TempDir::new().unwrap();

    cp(&temp)
        .args(["describe", "data:image/png;base64,!!!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Encoding error"));
}

#[test]
fn test_user_and_record_lifecycle() {
    let temp = TempDir::new().unwrap();

    cp(&temp)
        .args(["user", "add", "ada@example.com", "Ada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ada@example.com"));

    cp(&temp)
        .args(["--user", "ada@example.com", "record", "new", "Knee"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created record"));

    cp(&temp)
        .args(["--user", "ada@example.com", "record", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Knee"))
        .stdout(predicate::str::contains("new"));
}

#[test]
fn test_record_new_without_user_fails() {
    let temp = TempDir::new().unwrap();

    cp(&temp)
        .args(["record", "new", "Knee"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No current user"));
}

#[test]
fn test_structure_unknown_record_fails() {
    let temp = TempDir::new().unwrap();

    cp(&temp)
        .args(["structure", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record not found"));
}
