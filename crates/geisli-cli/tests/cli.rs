use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TINY_MODEL: &str = r#"{
    "name": "tiny",
    "vocab": ["<s>", "<pad>", "</s>", "the", "cat", "sat", "on", "mat", "dog"],
    "special_tokens": { "bos": 0, "eos": 2, "pad": 1 },
    "transitions": {
        "0": { "3": 3.0 },
        "3": { "4": 2.0, "8": 1.0 },
        "4": { "5": 2.0 },
        "8": { "5": 2.0 },
        "5": { "6": 2.0 },
        "6": { "7": 2.0 },
        "7": { "2": 3.0 }
    },
    "generation": { "num_beams": 2, "max_length": 12 }
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tiny.json"), TINY_MODEL).unwrap();
        std::fs::write(dir.path().join("empty.toml"), "").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("geisli").unwrap();
        cmd.current_dir(self.dir.path());
        cmd
    }

    fn decode(&self, config: &Path) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("decode")
            .arg("--model")
            .arg(self.path("tiny.json"))
            .arg("--config")
            .arg(config)
            .arg("--quiet");
        cmd
    }
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("geisli").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("geisli").unwrap();
    cmd.arg("--version").assert().success();
}

// Test argument parsing failure
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("geisli").unwrap();
    cmd.arg("not-a-command").assert().failure();
}

#[test]
fn test_decode_text() {
    let ws = Workspace::new();
    ws.decode(&ws.path("empty.toml"))
        .arg("--greedy")
        .assert()
        .success()
        .stdout(predicate::str::contains("the cat sat on mat"));
}

#[test]
fn test_decode_json_lists_ranked_hypotheses() {
    let ws = Workspace::new();
    let output = ws
        .decode(&ws.path("empty.toml"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["model"], "tiny");
    assert_eq!(report["stop_reason"], "early_stop");

    let hypotheses = report["hypotheses"].as_array().unwrap();
    assert_eq!(hypotheses.len(), 2);
    assert_eq!(hypotheses[0]["rank"], 1);
    assert_eq!(hypotheses[0]["text"], "the cat sat on mat");
    assert_eq!(hypotheses[1]["text"], "the dog sat on mat");
    assert!(hypotheses[0]["score"].as_f64().unwrap() >= hypotheses[1]["score"].as_f64().unwrap());
}

#[test]
fn test_bad_word_changes_the_best_hypothesis() {
    let ws = Workspace::new();
    ws.decode(&ws.path("empty.toml"))
        .args(["--bad-word", "cat", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("the dog sat on mat"))
        .stdout(predicate::str::contains("the cat").not());
}

#[test]
fn test_config_file_settings_apply() {
    let ws = Workspace::new();
    let config = ws.write(
        "geisli.toml",
        "[generation]\nnum_beams = 1\n\n[output]\nformat = \"json\"\n",
    );
    let output = ws.decode(&config).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["hypotheses"].as_array().unwrap().len(), 1);
}

#[test]
fn test_cli_flags_beat_config_file() {
    let ws = Workspace::new();
    let config = ws.write("geisli.toml", "[generation]\nnum_beams = 1\n");
    let output = ws
        .decode(&config)
        .args(["--num-beams", "2", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["hypotheses"].as_array().unwrap().len(), 2);
}

#[test]
fn test_max_length_cut() {
    let ws = Workspace::new();
    ws.decode(&ws.path("empty.toml"))
        .args(["--greedy", "--max-length", "4", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_length\""))
        .stdout(predicate::str::contains("\"the cat\""));
}

#[test]
fn test_missing_model_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["decode", "--config"])
        .arg(ws.path("empty.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No model given"));
}

#[test]
fn test_invalid_setting_fails() {
    let ws = Workspace::new();
    ws.decode(&ws.path("empty.toml"))
        .args(["--num-beams", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("num_beams"));
}

#[test]
fn test_top_k_below_candidate_count_fails() {
    let ws = Workspace::new();
    ws.decode(&ws.path("empty.toml"))
        .args(["--top-k", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("top_k 1"));
}

#[test]
fn test_unknown_bad_word_fails() {
    let ws = Workspace::new();
    ws.decode(&ws.path("empty.toml"))
        .args(["--bad-word", "bird"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bird"));
}

#[test]
fn test_config_show() {
    let ws = Workspace::new();
    let config = ws.write("custom.toml", "[generation]\nnum_beams = 3\n");
    ws.cmd()
        .args(["config", "show", "--config"])
        .arg(config)
        .assert()
        .success()
        .stdout(predicate::str::contains("num_beams = 3"));
}

#[test]
fn test_config_path_lists_local_file() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("geisli.toml"));
}
