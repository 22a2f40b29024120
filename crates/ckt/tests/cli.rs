#![cfg(not(target_os = "windows"))]

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;

const DIVIDER: &str = r#"[
  ["general", "v", [0, 0, 0], {"name": "Vs0", "value": "dc(5)"}, [null, null]],
  ["general", "g", [0, 48, 0], {}, [null]],
  ["general", "r", [48, 0, 0], {"name": "r0", "r": "1k"}, [null, null]],
  ["general", "g", [48, 48, 0], {}, [null]],
  ["w", [0, 0, 48, 0]],
  ["view", 0, 0, 2, null, null, null, null, null, null, null]
]"#;

const SPLIT_WIRE: &str = r#"[
  ["w", [0, 0, 16, 0]],
  ["w", [16, 0, 32, 0]],
  ["general", "g", [32, 0, 0], {}, [null]]
]"#;

fn ckt() -> Command {
    let mut cmd = Command::cargo_bin("ckt").unwrap();
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().clone();
    String::from_utf8(output.stdout).unwrap()
}

fn stderr_of_failure(cmd: &mut Command) -> String {
    let output = cmd.assert().failure().get_output().clone();
    String::from_utf8(output.stderr).unwrap()
}

#[test]
fn test_netlist_to_stdout() {
    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();

    let stdout = stdout_of(ckt().current_dir(temp.path()).args(["netlist", "divider.json"]));
    insta::assert_snapshot!(stdout, @r"
    VOLTAGE_SOURCE Vs0 1 0 dc(5)
    GROUND 0
    RESISTOR r0 1 0 1k
    GROUND 0
    ");
}

#[test]
fn test_netlist_to_file() {
    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();

    ckt()
        .current_dir(temp.path())
        .args(["netlist", "divider.json", "-o", "divider.txt"])
        .assert()
        .success();
    let written = std::fs::read_to_string(temp.child("divider.txt").path()).unwrap();
    assert_eq!(written.lines().count(), 4);
    assert!(written.starts_with("VOLTAGE_SOURCE Vs0 1 0 dc(5)\n"));
}

#[test]
fn test_check_reports_counts() {
    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();

    let stdout = stdout_of(ckt().current_dir(temp.path()).args(["check", "divider.json"]));
    assert!(stdout.contains("Ground"), "{stdout}");
    assert!(stdout.contains("1 nodes labeled"), "{stdout}");
    assert!(stdout.contains("divider.json"), "{stdout}");
}

#[test]
fn test_malformed_diagram_fails() {
    let temp = TempDir::new().unwrap();
    temp.child("bad.json").write_str(r#"[["general", "zz", [0, 0, 0]]]"#).unwrap();

    let stderr = stderr_of_failure(ckt().current_dir(temp.path()).args(["check", "bad.json"]));
    assert!(stderr.contains("Error:"), "{stderr}");
    assert!(stderr.contains("Failed to load diagram"), "{stderr}");
}

#[test]
fn test_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let stderr = stderr_of_failure(ckt().current_dir(temp.path()).args(["netlist", "nope.json"]));
    assert!(stderr.contains("Failed to read nope.json"), "{stderr}");
}

#[test]
fn test_clean_prints_merged_diagram() {
    let temp = TempDir::new().unwrap();
    temp.child("split.json").write_str(SPLIT_WIRE).unwrap();

    let stdout = stdout_of(ckt().current_dir(temp.path()).args(["clean", "split.json"]));
    let cleaned: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let wires: Vec<_> = cleaned
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e[0] == "w")
        .collect();
    assert_eq!(wires, vec![&serde_json::json!(["w", [0, 0, 32, 0]])]);

    // Without --write the file is untouched.
    temp.child("split.json").assert(SPLIT_WIRE);
}

#[test]
fn test_clean_write_rewrites_in_place() {
    let temp = TempDir::new().unwrap();
    temp.child("split.json").write_str(SPLIT_WIRE).unwrap();

    ckt()
        .current_dir(temp.path())
        .args(["clean", "split.json", "--write"])
        .assert()
        .success();
    let text = std::fs::read_to_string(temp.child("split.json").path()).unwrap();
    let cleaned: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entries = cleaned.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0][0], "general");
    assert_eq!(entries[1], serde_json::json!(["w", [0, 0, 32, 0]]));
    assert_eq!(entries[2][0], "view");
}

#[test]
fn test_parts_json() {
    let stdout = stdout_of(ckt().args(["parts", "--format", "json"]));
    let parts: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let parts = parts.as_array().unwrap();
    assert_eq!(parts.len(), 13);
    assert!(!parts.iter().any(|p| p["tag"] == "w"));
    let resistor = parts.iter().find(|p| p["tag"] == "r").unwrap();
    assert_eq!(resistor["keyword"], "RESISTOR");
    assert_eq!(resistor["defaults"]["r"], "1");
}

#[test]
fn test_sim_netlist_only() {
    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();

    let stdout = stdout_of(
        ckt()
            .current_dir(temp.path())
            .args(["sim", "divider.json", "--netlist"]),
    );
    assert!(stdout.starts_with("VOLTAGE_SOURCE Vs0 1 0 dc(5)"));
}

#[test]
fn test_sim_requires_signal() {
    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();
    ckt()
        .current_dir(temp.path())
        .args(["sim", "divider.json"])
        .assert()
        .failure();
}

#[test]
fn test_sim_runs_simulator() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();
    temp.child("signal.txt").write_str("dc\n").unwrap();
    let script = temp.child("fake-sim");
    script
        .write_str(
            r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2;;
    *) shift;;
  esac
done
printf '0 0\n1 5\nI(Vs0) -0.005\n' > "$out"
"#,
        )
        .unwrap();
    std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

    let stdout = stdout_of(ckt().current_dir(temp.path()).args([
        "sim",
        "divider.json",
        "--signal",
        "signal.txt",
        "--simulator",
        "./fake-sim",
    ]));
    assert!(stdout.contains("5.00V"), "{stdout}");
    assert!(stdout.contains("0.00V"), "{stdout}");
    assert!(stdout.contains("-5mA"), "{stdout}");
    assert!(stdout.contains("I(Vs0)"), "{stdout}");
}

#[test]
fn test_sim_failure_is_reported() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    temp.child("divider.json").write_str(DIVIDER).unwrap();
    let script = temp.child("broken-sim");
    script.write_str("#!/bin/sh\necho cannot parse >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

    let stderr = stderr_of_failure(ckt().current_dir(temp.path()).args([
        "sim",
        "divider.json",
        "--signal",
        "signal.txt",
        "--simulator",
        "./broken-sim",
    ]));
    assert!(stderr.contains("cannot parse"), "{stderr}");
    assert!(stderr.contains("Simulation failed for divider.json"), "{stderr}");
}
