//! CLI 端到端测试（dry-run，不访问硬件）

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
[robot]
name = "arm"

[robot.joints.shoulder]
type = "revolute"
limits = { lower = -0.7854, upper = 0.7854, velocity = 1.0, effort = 1.0 }

[robot.joints.wheel]
type = "continuous"

[servo]
joint = "shoulder"
pin = 17
"#;

fn config_dir(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("servo.toml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

fn cli() -> Command {
    Command::cargo_bin("rcservo-cli").unwrap()
}

#[test]
fn test_check_valid_config() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .args(["check", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initial_pulse\": 1500"));
}

#[test]
fn test_check_unsupported_joint() {
    let (_dir, path) = config_dir(&CONFIG.replace("joint = \"shoulder\"", "joint = \"wheel\""));
    cli()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported type 'continuous'"));
}

#[test]
fn test_move_dry_run_clamps() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .args(["move", "--dry-run", "5.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pulse_us\":2500"))
        .stdout(predicate::str::contains("\"target_position\":0.7854"));
}

#[test]
fn test_move_negative_angle() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .args(["move", "--dry-run", "--correlation-id", "9", "-0.7854"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pulse_us\":500"))
        .stdout(predicate::str::contains("\"correlation_id\":9"));
}

#[test]
fn test_sweep_dry_run() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .args(["sweep", "--dry-run", "--step", "0.5", "--interval-ms", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Sweep finished: 1 cycles"));
}

#[test]
fn test_info_marks_selected_joint() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("* shoulder"))
        .stdout(predicate::str::contains("wheel"));
}

#[test]
fn test_missing_config() {
    cli()
        .args(["--config", "/nonexistent/servo.toml", "check"])
        .assert()
        .failure();
}

#[test]
fn test_sweep_rejects_zero_step() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .args(["sweep", "--dry-run", "--step", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("步长必须为正数"));
}

#[test]
fn test_sweep_rejects_tiny_step() {
    let (_dir, path) = config_dir(CONFIG);
    cli()
        .arg("--config")
        .arg(&path)
        .args(["sweep", "--dry-run", "--cycles", "0", "--step", "1e-12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("过小"));
}
