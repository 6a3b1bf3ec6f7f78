use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

fn autopilot() -> Command {
    let mut cmd = Command::cargo_bin("autopilot").expect("binary is built");
    cmd.env("AUTOPILOT__CURSOR__RENDER", "false")
        .env("AUTOPILOT__AUTOMATION__STEP_DELAY", "0ms")
        .env("AUTOPILOT__AUTOMATION__TYPING_DELAY", "0ms")
        .env_remove("RUST_LOG");
    cmd
}

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn scenario_file(scenario: Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{scenario}").unwrap();
    file
}

#[test]
fn lists_automation_commands_as_json() {
    let assert = autopilot()
        .args(["--output", "json", "commands", "--automation-only"])
        .assert()
        .success();

    let entries: Vec<Value> = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(entries.len(), 15);
    assert!(entries.iter().all(|entry| entry["automation"] == true));
    assert!(entries
        .iter()
        .any(|entry| entry["name"] == "selectTextAreaContent"
            && entry["wireId"] == "select-text-area-content"));
}

#[test]
fn human_listing_includes_non_automation_commands() {
    let assert = autopilot().arg("commands").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("navigate-to"));
    assert!(stdout.contains("set-files-to-upload"));
}

#[test]
fn demo_scenario_runs_to_completion() {
    let assert = autopilot()
        .args(["--output", "json", "run", "--scenario"])
        .arg(demo("login_form.json"))
        .assert()
        .success();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let commands = report["commands"].as_array().unwrap();
    assert_eq!(commands.len(), 6);
    assert!(commands.iter().all(|command| command.get("error").is_none()));
    assert!(commands
        .iter()
        .all(|command| command["events"][0]["event"] == "TARGET_ELEMENT_FOUND"));

    assert_eq!(report["values"]["email"], "user@example.com");
    assert_eq!(report["values"]["password"], "hunter2");
    assert_eq!(commands[2]["outcome"]["kind"], "selection");
    assert_eq!(commands[2]["outcome"]["value"]["anchorOffset"], 11);
    assert_eq!(commands[2]["outcome"]["value"]["focusOffset"], 17);
    assert_eq!(commands[5]["outcome"]["value"], json!({ "x": 0.0, "y": 400.0 }));
    assert_eq!(report["cursor"], json!({ "x": 145.0, "y": 305.0 }));
}

#[test]
fn rejected_commands_fail_the_run_but_still_report() {
    let scenario = scenario_file(json!({
        "elements": [
            { "id": "go", "tag": "button",
              "bounds": { "x": 10, "y": 10, "width": 50, "height": 20 } }
        ],
        "commands": [
            { "type": "foo-bar" },
            { "type": "click", "target": { "by": "selector", "value": "#go" } }
        ]
    }));

    let assert = autopilot()
        .args(["--output", "json", "run", "--scenario"])
        .arg(scenario.path())
        .assert()
        .failure();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["commands"][0]["error"]["kind"], "UnknownCommandError");
    assert!(report["commands"][0].get("state").is_none());
    assert_eq!(report["commands"][1]["state"], "resolved");
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("1 of 2 commands were rejected"));
}

#[test]
fn config_file_controls_the_selector_timeout() {
    let mut config = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(config, "[automation]\nselector_timeout = \"100ms\"\npoll_interval = \"10ms\"").unwrap();
    let scenario = scenario_file(json!({
        "commands": [
            { "type": "hover", "target": { "by": "selector", "value": "#missing" } }
        ]
    }));

    let assert = autopilot()
        .arg("--config")
        .arg(config.path())
        .args(["--output", "json", "run", "--lenient", "--scenario"])
        .arg(scenario.path())
        .assert()
        .failure();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["commands"][0]["error"]["kind"], "ElementResolutionError");
    assert!(report["commands"][0]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("100 ms"));
}

#[test]
fn missing_scenario_file_is_reported() {
    let assert = autopilot()
        .args(["run", "--scenario", "does/not/exist.json"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("reading scenario"));
}
