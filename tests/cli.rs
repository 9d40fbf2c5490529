mod common;

use assert_cmd::Command;
use common::{sine, wav_bytes};
use predicates::prelude::*;
use tempfile::TempDir;

fn raagalyzer() -> Command {
    let mut cmd = Command::cargo_bin("raagalyzer").expect("binary builds");
    cmd.env_remove("RAAGALYZER_EMOTION_MODEL")
        .env_remove("RAAGALYZER_CREPE_MODEL")
        .env_remove("RAAGALYZER_PITCH_BACKEND");
    cmd
}

#[test]
fn help_lists_subcommands() {
    raagalyzer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("analyze"));
}

#[test]
fn analyze_fails_without_emotion_weights() {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("clip.wav");
    std::fs::write(&clip, wav_bytes(&sine(440.0, 16_000, 0.5), 16_000, 1)).unwrap();
    let missing = dir.path().join("missing-emotion.onnx");

    raagalyzer()
        .arg("analyze")
        .arg(&clip)
        .arg("--pitch-backend")
        .arg("pyin")
        .arg("--emotion-model")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load emotion model"))
        .stderr(predicate::str::contains("missing-emotion.onnx"));
}

#[test]
fn analyze_rejects_missing_input() {
    raagalyzer()
        .args(["analyze", "/nonexistent/clip.wav"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn serve_rejects_bad_bind_address() {
    raagalyzer()
        .args(["serve", "--bind", "not-an-address"])
        .assert()
        .failure();
}
