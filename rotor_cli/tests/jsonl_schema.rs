use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
clock = 17
primary = 27
secondary = 22

[simulation]
cycle_ms = 20
full_speed_pps = 2000
"#;
    let path = dir.path().join("rotor.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn stdout_lines(out: &std::process::Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("every stdout line is JSON"))
        .collect()
}

/// Snapshot lines carry every field, decimals as strings at their display scale.
#[rstest]
fn jsonl_snapshot_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let out = Command::cargo_bin("rotor")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--ticks")
        .arg("3")
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines = stdout_lines(&out);
    let snapshots: Vec<_> = lines
        .iter()
        .filter(|v| v["event"] == "snapshot")
        .collect();
    assert!(snapshots.len() >= 3);
    let first = snapshots[0];
    assert_eq!(first["counter"], 1);
    assert_eq!(first["speed"], "0.000");
    assert_eq!(first["cycle_time"], "0.000");
    for key in ["position", "rotation", "lap_time"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }

    let last = lines.last().unwrap();
    assert_eq!(last["event"], "stopped");
    assert!(last["ticks"].as_u64().unwrap() >= 3);
    assert!(last["last"]["counter"].is_u64());
}

/// Errors under --json are one JSON object on stderr.
#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let out = Command::cargo_bin("rotor")
        .unwrap()
        .env("ROTOR_SIM_FAULT", "3")
        .arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "DriverFault");
    assert_eq!(v["details"]["code"], 3);
    assert_eq!(v["details"]["fault"], "fault, overcurrent");
    assert!(v["message"].as_str().unwrap().contains("What happened"));
}

#[rstest]
fn jsonl_set_point_table() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let out = Command::cargo_bin("rotor")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("set-points")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = v.as_array().unwrap();
    assert_eq!(rows.len(), 63);
    assert_eq!(rows[31]["display"], "0.00000");
    assert_eq!(rows[31]["register"], 0);
    assert_eq!(rows[0]["register"], -31);
}
