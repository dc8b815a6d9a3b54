#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tinsel() -> Command {
    Command::cargo_bin("tinsel").unwrap()
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = tinsel().args(args).arg("--json").output().unwrap();
    assert!(output.status.success(), "tinsel {args:?} failed");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// demos
// ---------------------------------------------------------------------------

#[test]
fn demos_lists_every_demo() {
    tinsel()
        .arg("demos")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("spawner")
                .and(predicate::str::contains("bounce"))
                .and(predicate::str::contains("chase"))
                .and(predicate::str::contains("3 demos")),
        );
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_prints_entity_table() {
    tinsel()
        .args(["run", "bounce", "--ticks", "50"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Ball")
                .and(predicate::str::contains("Paddle"))
                .and(predicate::str::contains("Court"))
                .and(predicate::str::contains("50 ticks")),
        );
}

#[test]
fn run_verbose_shows_event_log() {
    tinsel()
        .args(["run", "spawner", "--ticks", "7", "--tick-ms", "1000", "-v"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Event Log")
                .and(predicate::str::contains("Egg (#2): hatched"))
                .and(predicate::str::contains("scene \"meadow\" activated")),
        );
}

#[test]
fn run_json_reports_totals() {
    let summary = run_json(&["run", "spawner", "--ticks", "7", "--tick-ms", "1000"]);
    assert_eq!(summary["demo"], "spawner");
    assert_eq!(summary["ticks"], 7);
    assert_eq!(summary["time"], 7000);
    assert_eq!(summary["scene"], "meadow");
    assert_eq!(summary["totals"]["spawned"], 2);
    assert_eq!(summary["entities"].as_array().unwrap().len(), 4);
}

#[test]
fn run_is_deterministic_for_a_seed() {
    let args = ["run", "chase", "--ticks", "300", "--seed", "11"];
    assert_eq!(run_json(&args)["entities"], run_json(&args)["entities"]);
}

#[test]
fn run_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tinsel.json");
    fs::write(&path, r#"{ "tick_ms": 1000, "max_entities": 3 }"#).unwrap();

    // The limit leaves room for one chick only.
    let summary = run_json(&[
        "run",
        "spawner",
        "--ticks",
        "7",
        "--config",
        path.to_str().unwrap(),
    ]);
    assert_eq!(summary["time"], 7000);
    assert_eq!(summary["totals"]["spawned"], 1);
    assert_eq!(summary["totals"]["failed"], 1);
}

#[test]
fn run_flags_override_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tinsel.json");
    fs::write(&path, r#"{ "tick_ms": 1000 }"#).unwrap();

    let summary = run_json(&[
        "run",
        "spawner",
        "--ticks",
        "3",
        "--tick-ms",
        "10",
        "--config",
        path.to_str().unwrap(),
    ]);
    assert_eq!(summary["time"], 30);
}

#[test]
fn run_unknown_demo_fails() {
    tinsel()
        .args(["run", "pong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown demo 'pong'"));
}

#[test]
fn run_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ tick_ms: ").unwrap();

    tinsel()
        .args(["run", "spawner", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn run_rejects_zero_tick_ms() {
    tinsel()
        .args(["run", "spawner", "--tick-ms", "0"])
        .assert()
        .failure();
}
