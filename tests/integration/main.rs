//! Integration tests for Atlas
//!
//! These drive the built binary and the library crates together.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use atlas_ai::providers::local::LocalProvider;
use atlas_core::test_utils::create_test_repo;
use atlas_core::{Label, RelationshipType, Settings};
use atlas_pipeline::Analyzer;
use atlas_store::MemoryStore;
use serde_json::Value;
use tempfile::TempDir;

fn atlas() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_atlas"));
    command.env_remove("RUST_LOG");
    command
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = atlas().arg("--help").output().expect("Failed to execute atlas");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Analyze a source archive into a project graph"));
    assert!(stdout.contains("scan"));
}

#[test]
fn test_version_command() {
    let output = atlas().arg("version").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Atlas v"));
}

#[test]
fn test_classify_command() {
    let output = atlas().args(["classify", "web/ui/App.tsx"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert_eq!(stdout.trim(), "web/ui/App.tsx\treact\tui");

    let output = atlas().args(["classify", "tests/test_models.py"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "tests/test_models.py\tpython\ttests");
}

/// Scan is offline: in-memory store, local provider, JSON on stdout.
#[test]
fn test_scan_command_prints_summary() {
    let repo = create_test_repo();
    let work = TempDir::new().unwrap();

    let output = atlas()
        .current_dir(work.path())
        .env("ATLAS_TEMP_DIR", work.path())
        .args(["scan", &repo.path().to_string_lossy(), "--project", "demo"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "scan failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["project_id"], "demo");
    assert_eq!(summary["files"], 6);
    assert_eq!(summary["folders"], 7);
    assert_eq!(summary["components"], 6);
    assert_eq!(summary["failed_batches"], 0);
}

#[test]
fn test_scan_missing_directory_fails() {
    let work = TempDir::new().unwrap();
    let output = atlas()
        .current_dir(work.path())
        .args(["scan", &work.path().join("nope").to_string_lossy()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("directory not found"));
}

/// End-to-end through the library: archive in, merged graph out.
#[tokio::test]
async fn test_end_to_end_archive_analysis() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("shop.zip");
    write_zip(
        &archive,
        &[
            ("shop/__init__.py", ""),
            (
                "shop/models.py",
                "from enum import Enum\n\n\nclass Status(Enum):\n    OPEN = 1\n    CLOSED = 2\n\n\nclass Order:\n    total: float\n\n    def pay(self) -> bool:\n        return True\n",
            ),
            (
                "shop/api/views.py",
                "from .models import Order\nimport requests\n\n\n@route('/orders')\nasync def list_orders(limit: int = 10) -> list:\n    return [Order()]\n",
            ),
            ("web/app.js", "import { api } from './api.js';\n"),
            ("web/api.js", "export const api = {};\n"),
            ("README.md", "# Shop\n"),
        ],
    );

    let mut settings = Settings::default();
    settings.storage.temp_dir = temp.path().join("work");

    let store = MemoryStore::new();
    let analyzer = Analyzer::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(LocalProvider::new()),
        settings,
    );
    let summary = analyzer.analyze_archive(&archive, "shop").await.unwrap();

    assert_eq!(summary.files, 6);
    assert_eq!(summary.enums, 1);
    assert_eq!(summary.failed_files, 0);

    let graph = store.read().await;
    let file = |path: &str| {
        graph
            .find_by_property(Label::File, "relative_path", path)
            .unwrap_or_else(|| panic!("missing file {path}"))
    };

    // `from .models` in shop/api/views.py lands on shop/models.py;
    // `import requests` is third-party and dropped.
    let views = file("shop/api/views.py");
    let imported: Vec<_> = graph
        .edges_from(views)
        .filter(|e| e.kind == RelationshipType::Imports)
        .map(|e| e.target)
        .collect();
    assert_eq!(imported, vec![file("shop/models.py")]);

    // Non-Python imports come from the assisted path.
    assert!(graph.has_edge_between(file("web/app.js"), file("web/api.js"), RelationshipType::Imports));

    let decorated = graph
        .nodes_with_label(Label::Function)
        .find(|(_, n)| n.get_str("name") == Some("list_orders"))
        .map(|(_, n)| n.properties.clone())
        .unwrap();
    assert_eq!(decorated["is_async"], true);
    assert_eq!(decorated["decorators"], serde_json::json!(["@route"]));

    let status = graph
        .nodes_with_label(Label::Enum)
        .find(|(_, n)| n.get_str("name") == Some("Status"))
        .map(|(_, n)| n.properties.clone())
        .unwrap();
    assert_eq!(status["values"], serde_json::json!(["OPEN", "CLOSED"]));
}
