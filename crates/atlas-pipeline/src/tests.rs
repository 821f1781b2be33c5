//! Unit tests for atlas-pipeline module

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use atlas_ai::providers::local::LocalProvider;
use atlas_ai::{AnalysisProvider, FileAnalysis};
use atlas_core::test_utils::{create_import_pair, create_test_repo};
use atlas_core::{
    AnalysisError, ArchiveError, Label, PropertyMap, RelationshipRecord, RelationshipShape,
    RelationshipType, Settings,
};
use atlas_store::{GraphStore, MemoryStore, StoreError};
use serde_json::json;
use tempfile::TempDir;

use crate::pipeline::Analyzer;

fn settings(temp_root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.llm.provider = "local".to_string();
    settings.storage.temp_dir = temp_root.to_path_buf();
    settings.batch_size = 2;
    settings
}

fn analyzer(store: &MemoryStore, temp_root: &Path) -> Analyzer {
    Analyzer::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(LocalProvider::new()),
        settings(temp_root),
    )
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

/// Provider that answers every file with the same reply.
struct Canned(&'static str);

#[async_trait::async_trait]
impl AnalysisProvider for Canned {
    async fn analyze_file(&self, _content: &str, _file_type: &str) -> anyhow::Result<FileAnalysis> {
        Ok(FileAnalysis::parse_lenient(self.0))
    }

    fn name(&self) -> &str {
        "Canned"
    }
}

/// Memory store that rejects every Function batch.
struct NoFunctions(MemoryStore);

#[async_trait::async_trait]
impl GraphStore for NoFunctions {
    async fn create_nodes(&self, label: Label, rows: &[PropertyMap]) -> Result<usize, StoreError> {
        if label == Label::Function {
            return Err(StoreError::Unavailable("function writes disabled".to_string()));
        }
        self.0.create_nodes(label, rows).await
    }

    async fn create_relationships(
        &self,
        shape: RelationshipShape,
        rows: &[RelationshipRecord],
    ) -> Result<usize, StoreError> {
        self.0.create_relationships(shape, rows).await
    }
}

#[tokio::test]
async fn test_archive_with_import_pair() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("upload.zip");
    write_zip(
        &archive,
        &[
            ("src/a.py", "def foo(x: int) -> str:\n    return str(x)\n"),
            ("src/b.py", "from src.a import foo\n\n\ndef bar():\n    return foo(1)\n"),
        ],
    );

    let store = MemoryStore::new();
    let summary = analyzer(&store, &temp.path().join("work"))
        .analyze_archive(&archive, "p1")
        .await
        .unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.folders, 2);
    assert_eq!(summary.imports, 1);
    assert_eq!(summary.failed_batches, 0);

    let graph = store.read().await;
    assert_eq!(graph.nodes_with_label(Label::File).count(), 2);

    let a = graph.find_by_property(Label::File, "relative_path", "src/a.py").unwrap();
    let b = graph.find_by_property(Label::File, "relative_path", "src/b.py").unwrap();

    let owned: Vec<&str> = graph
        .edges_from(a)
        .filter(|e| e.kind == RelationshipType::HasFunction)
        .filter_map(|e| graph.node(e.target).and_then(|n| n.get_str("name")))
        .collect();
    assert_eq!(owned, vec!["foo"]);

    let function = graph
        .nodes_with_label(Label::Function)
        .find(|(_, n)| n.get_str("name") == Some("foo"))
        .map(|(_, n)| n.properties.clone())
        .unwrap();
    assert_eq!(function["return_type"], json!("str"));
    assert_eq!(function["arguments"], json!([{"name": "x", "type": "int"}]));

    let imports: Vec<_> = graph.edges_of_kind(RelationshipType::Imports).collect();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].source, b);
    assert_eq!(imports[0].target, a);
    drop(graph);

    let (status, progress, _) = store.project_status("p1").await.unwrap();
    assert_eq!(status, "analyzed");
    assert_eq!(progress, 30.0);

    let steps: Vec<f64> = store.status_history().await.iter().map(|s| s.progress).collect();
    assert_eq!(steps, vec![15.0, 20.0, 20.0, 25.0, 30.0]);

    let report_types: Vec<String> = store
        .reports("p1")
        .await
        .iter()
        .filter_map(|r| r["type"].as_str().map(str::to_string))
        .collect();
    assert_eq!(report_types, vec!["structure_analysis", "content_analysis", "analysis"]);
}

#[tokio::test]
async fn test_components_and_containment() {
    let repo = create_test_repo();
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let summary = analyzer(&store, temp.path())
        .analyze_directory(repo.path(), "p1")
        .await
        .unwrap();
    assert_eq!(summary.components, summary.files);

    let graph = store.read().await;
    assert_eq!(graph.edges_of_kind(RelationshipType::ClassifiesAs).count(), summary.files);

    let kind_of = |relative_path: &str| {
        let file = graph.find_by_property(Label::File, "relative_path", relative_path)?;
        graph
            .edges_from(file)
            .find(|e| e.kind == RelationshipType::ClassifiesAs)
            .and_then(|e| graph.node(e.target))
            .and_then(|n| n.get_str("type"))
            .map(str::to_string)
    };
    assert_eq!(kind_of("templates/index.html").as_deref(), Some("ui"));
    assert_eq!(kind_of("config/settings.yaml").as_deref(), Some("config"));
    assert_eq!(kind_of("docs/README.md").as_deref(), Some("documentation"));
    assert_eq!(kind_of("app/api/handler.py").as_deref(), Some("logic"));

    // Every non-root folder hangs off exactly one parent.
    let root = graph.find_by_property(Label::Folder, "relative_path", ".").unwrap();
    for (id, _) in graph.nodes_with_label(Label::Folder) {
        let parents = graph
            .edges_to(id)
            .filter(|e| e.kind == RelationshipType::HasFolder)
            .count();
        assert_eq!(parents, if id == root { 0 } else { 1 });
    }
    assert!(graph.find_by_property(Label::File, "relative_path", ".env").is_none());
}

#[tokio::test]
async fn test_rerun_does_not_duplicate() {
    let repo = create_import_pair();
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let analyzer = analyzer(&store, temp.path());

    analyzer.analyze_directory(repo.path(), "p1").await.unwrap();
    let (nodes, edges) = {
        let graph = store.read().await;
        (graph.node_count(), graph.edge_count())
    };
    // Reports are new on each run; everything else is merged.
    analyzer.analyze_directory(repo.path(), "p1").await.unwrap();

    let graph = store.read().await;
    assert_eq!(graph.nodes_with_label(Label::File).count(), 2);
    assert_eq!(graph.nodes_with_label(Label::Function).count(), 2);
    assert_eq!(graph.edges_of_kind(RelationshipType::Imports).count(), 1);
    assert_eq!(graph.node_count(), nodes + 3);
    assert_eq!(graph.edge_count(), edges + 3);
}

#[tokio::test]
async fn test_missing_directory_attaches_error_report() {
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let result = analyzer(&store, temp.path())
        .analyze_directory(&temp.path().join("missing"), "p1")
        .await;
    assert!(matches!(result, Err(AnalysisError::DirectoryNotFound(_))));

    let (status, _, _) = store.project_status("p1").await.unwrap();
    assert_eq!(status, "analyzing_structure");

    let reports = store.reports("p1").await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["type"], json!("error"));
    assert_eq!(reports[0]["details"]["stage"], json!("structure"));
    assert_eq!(store.read().await.nodes_with_label(Label::File).count(), 0);
}

#[tokio::test]
async fn test_rejected_archive_writes_nothing_but_the_report() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("evil.zip");
    write_zip(&archive, &[("../escape.py", "print('x')\n")]);

    let store = MemoryStore::new();
    let result = analyzer(&store, &temp.path().join("work"))
        .analyze_archive(&archive, "p1")
        .await;
    assert!(matches!(
        result,
        Err(AnalysisError::Archive(ArchiveError::PathTraversal { .. }))
    ));

    assert!(store.project_status("p1").await.is_none());
    assert!(store.status_history().await.is_empty());
    assert_eq!(store.reports("p1").await.len(), 1);
    assert!(!temp.path().join("work").join("escape.py").exists());
}

#[tokio::test]
async fn test_failed_batches_do_not_abort_the_run() {
    let repo = create_import_pair();
    let temp = TempDir::new().unwrap();
    let memory = MemoryStore::new();

    let analyzer = Analyzer::new(
        Arc::new(NoFunctions(memory.clone())),
        Arc::new(memory.clone()),
        Arc::new(LocalProvider::new()),
        settings(temp.path()),
    );
    let summary = analyzer.analyze_directory(repo.path(), "p1").await.unwrap();

    // Two functions at batch size 2: one failed batch.
    assert_eq!(summary.functions, 2);
    assert_eq!(summary.failed_batches, 1);

    let graph = memory.read().await;
    assert_eq!(graph.nodes_with_label(Label::Function).count(), 0);
    assert_eq!(graph.edges_of_kind(RelationshipType::HasFunction).count(), 0);
    assert_eq!(graph.edges_of_kind(RelationshipType::Imports).count(), 1);
    drop(graph);

    let (status, _, _) = memory.project_status("p1").await.unwrap();
    assert_eq!(status, "analyzed");
}

#[tokio::test]
async fn test_repeated_symbol_names_keep_separate_nodes() {
    let repo = TempDir::new().unwrap();
    fs::write(
        repo.path().join("Calc.java"),
        "class Calc {\n  int add(int a) { return a; }\n  int add(int a, int b) { return a + b; }\n}\n",
    )
    .unwrap();
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let analyzer = Analyzer::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(Canned(
            r#"{"functions": [{"name": "add"}, {"name": "add"}, {"name": "sub"}],
                "enums": [{"name": "Op", "values": ["ADD"]}, {"name": "Op", "values": ["SUB"]}]}"#,
        )),
        settings(temp.path()),
    );

    let summary = analyzer.analyze_directory(repo.path(), "p1").await.unwrap();
    assert_eq!(summary.functions, 3);
    assert_eq!(summary.enums, 2);

    let counts = |graph: &atlas_core::PropertyGraph| {
        (
            graph.nodes_with_label(Label::Function).count(),
            graph.nodes_with_label(Label::Enum).count(),
            graph.edges_of_kind(RelationshipType::HasFunction).count(),
            graph.edges_of_kind(RelationshipType::HasEnum).count(),
        )
    };
    assert_eq!(counts(&*store.read().await), (3, 2, 3, 2));

    analyzer.analyze_directory(repo.path(), "p1").await.unwrap();
    assert_eq!(counts(&*store.read().await), (3, 2, 3, 2));
}

#[tokio::test]
async fn test_script_imports_resolve_across_extensions() {
    let repo = TempDir::new().unwrap();
    fs::create_dir_all(repo.path().join("src")).unwrap();
    fs::write(repo.path().join("src/App.tsx"), "import { fmt } from './utils';\n").unwrap();
    fs::write(repo.path().join("src/utils.ts"), "export const fmt = (x) => `${x}`;\n").unwrap();
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let summary = analyzer(&store, temp.path())
        .analyze_directory(repo.path(), "p1")
        .await
        .unwrap();
    assert_eq!(summary.imports, 1);
    assert_eq!(summary.unresolved_links, 0);

    let graph = store.read().await;
    let app = graph.find_by_property(Label::File, "relative_path", "src/App.tsx").unwrap();
    let utils = graph.find_by_property(Label::File, "relative_path", "src/utils.ts").unwrap();
    let imports: Vec<_> = graph.edges_of_kind(RelationshipType::Imports).collect();
    assert_eq!(imports.len(), 1);
    assert_eq!((imports[0].source, imports[0].target), (app, utils));
}

#[tokio::test]
async fn test_written_nodes_carry_creation_time() {
    let repo = create_test_repo();
    let temp = TempDir::new().unwrap();
    let store = MemoryStore::new();
    analyzer(&store, temp.path())
        .analyze_directory(repo.path(), "p1")
        .await
        .unwrap();

    let graph = store.read().await;
    for label in [Label::Folder, Label::File, Label::Function, Label::Class, Label::Component] {
        let mut nodes = graph.nodes_with_label(label).peekable();
        assert!(nodes.peek().is_some(), "no {label} nodes");
        for (_, node) in nodes {
            let created_at = node.get_str("created_at").unwrap();
            assert!(created_at.contains('T'), "{label} created_at {created_at:?}");
        }
    }
}
