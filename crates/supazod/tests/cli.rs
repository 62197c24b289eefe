//! End-to-end tests for the `supazod` binary.

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

const FIXTURE: &str = include_str!("fixtures/types.ts");

fn supazod(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("supazod").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("types.ts"), FIXTURE).unwrap();
    dir
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = supazod(&dir).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--input"));
    assert!(stdout.contains("--format-command"));
}

#[test]
fn test_generate_with_flags() {
    let dir = workspace();
    let output = supazod(&dir)
        .args(["-i", "types.ts", "-o", "schemas.ts"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Generated "));
    assert!(output.stderr.is_empty(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = fs::read_to_string(dir.path().join("schemas.ts")).unwrap();
    assert!(text.contains("import type { Json } from \"./types\";"));
    assert!(text.contains("export const UsersSchema = {"));
}

#[test]
fn test_generate_from_config_file() {
    let dir = workspace();
    fs::write(
        dir.path().join("supazod.toml"),
        "input = \"types.ts\"\noutput = \"out/schemas.ts\"\n\n[filter]\nexclude = [\"^Shops\"]\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("out")).unwrap();

    let output = supazod(&dir).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = fs::read_to_string(dir.path().join("out/schemas.ts")).unwrap();
    assert!(text.contains("import type { Json } from \"../types\";"));
    assert!(!text.contains("Shops"));
    assert!(text.contains("export const ChannelsSchema = {"));
}

#[test]
fn test_flags_override_config() {
    let dir = workspace();
    fs::write(
        dir.path().join("supazod.toml"),
        "input = \"types.ts\"\noutput = \"schemas.ts\"\nschema = \"storage\"\n",
    )
    .unwrap();

    let output = supazod(&dir).args(["--schema", "public"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("schemas.ts").exists());
}

#[test]
fn test_json_report() {
    let dir = workspace();
    let output = supazod(&dir)
        .args(["-i", "types.ts", "-o", "schemas.ts", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["declarations"], 20);
    assert_eq!(report["entities"], 5);
    assert_eq!(report["diagnostics"], serde_json::json!([]));
    assert!(report["output"].as_str().unwrap().ends_with("schemas.ts"));
}

#[test]
fn test_missing_input() {
    let dir = TempDir::new().unwrap();
    let output = supazod(&dir)
        .args(["-i", "nope.ts", "-o", "schemas.ts"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("supazod: "), "{}", stderr);
    assert!(stderr.contains("nope.ts"), "{}", stderr);
    assert!(!dir.path().join("schemas.ts").exists());
}

#[test]
fn test_unknown_schema() {
    let dir = workspace();
    let output = supazod(&dir)
        .args(["-i", "types.ts", "-o", "schemas.ts", "-s", "storage"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("schema `storage` not found"), "{}", stderr);
}

#[test]
fn test_missing_output_setting() {
    let dir = workspace();
    let output = supazod(&dir).args(["-i", "types.ts"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no output file"));
}

#[cfg(unix)]
#[test]
fn test_external_formatter() {
    let dir = workspace();
    let output = supazod(&dir)
        .args(["-i", "types.ts", "-o", "schemas.ts", "--format-command", "cat"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(fs::read_to_string(dir.path().join("schemas.ts"))
        .unwrap()
        .contains("export const ChannelsSchema = {"));

    let output = supazod(&dir)
        .args(["-i", "types.ts", "-o", "failed.ts", "--format-command", "false"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("failed.ts").exists());
}
