//! Integration tests for Trellis
//!
//! These drive the built binary against canvases in a temporary vault.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const FAMILY: &str = r#"{
	"nodes": [
		{"id": "p", "type": "text", "text": "Parent", "x": 0, "y": 0, "width": 250, "height": 60},
		{"id": "c1", "type": "text", "text": "First", "x": 350, "y": 0, "width": 250, "height": 60},
		{"id": "doc", "type": "file", "file": "notes/Plan.md", "x": 350, "y": 400, "width": 250, "height": 60}
	],
	"edges": [
		{"id": "edge-p-c1", "fromNode": "p", "fromSide": "right", "toNode": "c1", "toSide": "left"}
	]
}"#;

fn trellis(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("TRELLIS_LOG")
        .output()
        .expect("Failed to execute trellis")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn vault() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("board.canvas"), FAMILY).unwrap();
    dir
}

fn read_canvas(root: &Path) -> Value {
    let text = std::fs::read_to_string(root.join("board.canvas")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn node<'a>(canvas: &'a Value, id: &str) -> &'a Value {
    canvas["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == id)
        .unwrap_or_else(|| panic!("node {id} missing"))
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = stdout(&output);
    assert!(output.status.success());
    assert!(stdout.contains("Hierarchy-aware editing"));
    assert!(stdout.contains("add-child"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = trellis(dir.path(), &["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(&format!("Trellis v{}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_tree_prints_hierarchy() {
    let dir = vault();
    let output = trellis(dir.path(), &["tree", "board.canvas"]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("p \"Parent\""));
    assert!(out.contains("  c1 \"First\""));
    assert!(out.contains("doc [notes/Plan.md]"));
    assert!(!out.contains("warning"));
}

#[test]
fn test_tree_reports_cycles() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("loop.canvas"),
        r#"{"nodes": [
            {"id": "a", "type": "text", "text": "A", "x": 0, "y": 0, "width": 10, "height": 10},
            {"id": "b", "type": "text", "text": "B", "x": 0, "y": 0, "width": 10, "height": 10}
        ], "edges": [
            {"id": "e1", "fromNode": "a", "fromSide": "right", "toNode": "b", "toSide": "left"},
            {"id": "e2", "fromNode": "b", "fromSide": "right", "toNode": "a", "toSide": "left"}
        ]}"#,
    )
    .unwrap();

    let output = trellis(dir.path(), &["tree", "loop.canvas"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("warning: cycle between a, b"));
    assert!(out.contains("warning: not reachable from any root: a, b"));
}

#[test]
fn test_add_child_recenters_column() {
    let dir = vault();
    let output = trellis(dir.path(), &["add-child", "board.canvas", "--parent", "p"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("moved c1"));

    let canvas = read_canvas(dir.path());
    assert_eq!(node(&canvas, "c1")["y"], -40.0);

    let added = canvas["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["text"] == "New child node")
        .expect("new child written");
    assert_eq!(added["x"], 350.0);
    assert_eq!(added["y"], 40.0);

    let id = added["id"].as_str().unwrap();
    let edge_id = format!("edge-p-{id}");
    assert!(canvas["edges"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["id"] == edge_id.as_str() && e["fromNode"] == "p" && e["toNode"] == id));
}

#[test]
fn test_add_child_unknown_parent_fails() {
    let dir = vault();
    let before = std::fs::read_to_string(dir.path().join("board.canvas")).unwrap();
    let output = trellis(dir.path(), &["add-child", "board.canvas", "--parent", "ghost"]);
    assert!(!output.status.success());
    let after = std::fs::read_to_string(dir.path().join("board.canvas")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_add_sibling_of_root_goes_below() {
    let dir = vault();
    let output = trellis(dir.path(), &["add-sibling", "board.canvas", "--node", "p"]);
    assert!(output.status.success());

    let canvas = read_canvas(dir.path());
    let added = canvas["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["text"] == "New independent node")
        .expect("sibling written");
    assert_eq!(added["x"], 0.0);
    assert_eq!(added["y"], 130.0);
    assert_eq!(canvas["edges"].as_array().unwrap().len(), 1);
}

#[test]
fn test_add_node_at_negative_position() {
    let dir = vault();
    let output = trellis(dir.path(), &["add-node", "board.canvas", "--at", "-20,35"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let canvas = read_canvas(dir.path());
    assert_eq!(canvas["nodes"].as_array().unwrap().len(), 4);
    assert!(canvas["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["x"] == -20.0 && n["y"] == 35.0));
}

#[test]
fn test_move_with_unknown_node_exits_non_zero() {
    let dir = vault();
    let output = trellis(dir.path(), &["move", "board.canvas", "c1=500,90", "ghost=1,1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ghost"));

    let canvas = read_canvas(dir.path());
    assert_eq!(node(&canvas, "c1")["x"], 500.0);
    assert_eq!(node(&canvas, "c1")["y"], 90.0);
}

#[test]
fn test_preview_does_not_write() {
    let dir = vault();
    let before = std::fs::read_to_string(dir.path().join("board.canvas")).unwrap();
    let output = trellis(dir.path(), &["preview", "board.canvas", "--parent", "p"]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("0: x=350 y=-40 symmetric"));
    assert!(out.contains("1: x=350 y=40 symmetric"));
    assert!(out.contains("height=140"));
    assert_eq!(before, std::fs::read_to_string(dir.path().join("board.canvas")).unwrap());
}

#[test]
fn test_config_file_changes_spacing() {
    let dir = vault();
    std::fs::write(dir.path().join("trellis.toml"), "[layout]\nvertical_spacing = 100.0\n").unwrap();
    let output = trellis(dir.path(), &["preview", "board.canvas", "--parent", "p"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("0: x=350 y=-50 symmetric"));
}

#[test]
fn test_invalid_config_leaves_canvas_untouched() {
    let dir = vault();
    std::fs::write(dir.path().join("trellis.toml"), "[layout]\ndefault_node_height = 0.0\n").unwrap();
    let before = std::fs::read_to_string(dir.path().join("board.canvas")).unwrap();

    let output = trellis(dir.path(), &["add-child", "board.canvas", "--parent", "p"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("default_node_height"));
    assert_eq!(before, std::fs::read_to_string(dir.path().join("board.canvas")).unwrap());
}

#[test]
fn test_cards_filter_by_tag() {
    let dir = vault();
    std::fs::write(dir.path().join("alpha.md"), "Alpha note #project\n").unwrap();
    std::fs::write(dir.path().join("beta.md"), "---\ntags: [reading]\n---\nBeta\n").unwrap();

    let output = trellis(dir.path(), &["cards", "--tag", "project", "--sort", "title"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("file\talpha\t#project"));
    assert!(!out.contains("beta"));
    assert!(out.contains("1 of 1 cards"));
}

#[test]
fn test_cards_from_canvas_as_json() {
    let dir = vault();
    let output = trellis(dir.path(), &["cards", "--canvas", "board.canvas", "--sort", "title", "--json"]);
    assert!(output.status.success());

    let view: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let titles: Vec<&str> = view["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["First", "Parent", "Plan"]);
    assert_eq!(view["stats"]["file_cards"], 1);
    assert_eq!(view["truncated"], false);
}
