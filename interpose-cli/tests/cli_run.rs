use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const SCENARIO: &str = r#"
object:
  user:
    name: Ada
    age: 36
    greet: null
methods:
  - path: user.greet
    returns: hello
rules:
  - when: name
    of: user
    on: accessed
    result: Grace
  - when: age
    of: user
    on: set
    value: 99
    result: 100
  - when: greet
    of: user
    on: returns
    result: hi there
steps:
  - op: get
    path: user.name
  - op: set
    path: user.age
    value: 99
  - op: set
    path: user.age
    value: 40
  - op: call
    path: user.greet
    args: [1]
"#;

fn write_scenario(dir: &Path, contents: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join("scenario.yml");
    fs::write(&path, contents)?;
    Ok(path)
}

#[test]
fn run_json_reports_steps_and_events() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let scenario = write_scenario(dir.path(), SCENARIO)?;

    #[allow(deprecated)]
    let assert = Command::cargo_bin("interpose")?
        .arg("run")
        .arg(&scenario)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;

    let steps = value["steps"].as_array().expect("steps array");
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0]["result"], "Grace");
    assert_eq!(steps[1]["result"], 100);
    assert_eq!(steps[2]["result"], 40);
    assert_eq!(steps[3]["result"], "hi there");

    let events = value["events"].as_array().expect("events array");
    let kinds: Vec<&str> = events
        .iter()
        .filter_map(|event| event["type"].as_str())
        .collect();
    assert!(kinds.contains(&"invoke"));
    assert!(kinds.contains(&"return"));
    let invoke = events
        .iter()
        .find(|event| event["type"] == "invoke")
        .expect("invoke event");
    assert_eq!(invoke["member"], "greet");
    assert_eq!(invoke["args"], serde_json::json!([1]));
    Ok(())
}

#[test]
fn run_text_lists_steps() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let scenario = write_scenario(dir.path(), SCENARIO)?;

    #[allow(deprecated)]
    Command::cargo_bin("interpose")?
        .arg("run")
        .arg(&scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"1. get user.name -> "Grace""#))
        .stdout(predicate::str::contains("Events ("));
    Ok(())
}

#[test]
fn run_fails_on_unknown_member() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let scenario = write_scenario(
        dir.path(),
        r#"
object:
  name: Ada
steps:
  - op: set
    path: nickname
    value: A
"#,
    )?;

    #[allow(deprecated)]
    Command::cargo_bin("interpose")?
        .arg("run")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nickname"));
    Ok(())
}

#[test]
fn check_accepts_valid_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let scenario = write_scenario(dir.path(), SCENARIO)?;

    #[allow(deprecated)]
    let assert = Command::cargo_bin("interpose")?
        .args(["check", "--json"])
        .arg(&scenario)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;
    assert_eq!(value["rules"], 3);
    assert_eq!(value["steps"], 4);
    assert_eq!(value["members"], serde_json::json!(["user"]));
    Ok(())
}

#[test]
fn check_rejects_mismatched_rule() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let scenario = write_scenario(
        dir.path(),
        r#"
object:
  name: Ada
rules:
  - when: name
    on: returns
"#,
    )?;

    #[allow(deprecated)]
    Command::cargo_bin("interpose")?
        .arg("check")
        .arg(&scenario)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Scenario is invalid"));
    Ok(())
}

#[test]
fn check_rejects_unknown_fields() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let scenario = write_scenario(dir.path(), "object: {}\nbogus: true\n")?;

    #[allow(deprecated)]
    Command::cargo_bin("interpose")?
        .arg("check")
        .arg(&scenario)
        .assert()
        .failure();
    Ok(())
}
