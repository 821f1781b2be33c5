//! Unit tests for atlas-store module

use std::sync::Arc;
use std::sync::Mutex;

use atlas_core::{
    ComponentKind, ComponentNode, FileNode, GraphEntity, Label, NodeRef, ProjectStatus,
    PropertyMap, RelationshipRecord, RelationshipShape, RelationshipType, ReportNode,
};
use serde_json::{Value, json};

use crate::memory::MemoryStore;
use crate::statements::{self, flatten_properties, node_upsert, relationship_merge};
use crate::store::{GraphStore, StatusSink, StoreError};
use crate::writer::GraphWriter;

fn row(pairs: &[(&str, Value)]) -> PropertyMap {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn file(project_id: &str, relative_path: &str) -> FileNode {
    FileNode {
        file_id: atlas_core::ids::file_id(project_id, relative_path),
        project_id: project_id.to_string(),
        file_path: format!("/tmp/{relative_path}"),
        relative_path: relative_path.to_string(),
        name: relative_path.rsplit('/').next().unwrap_or(relative_path).to_string(),
        file_type: "python".to_string(),
        size: 10,
        created_at: atlas_core::model::timestamp(),
    }
}

/// Records the size of every batch and fails the ones listed.
struct FlakyStore {
    fail_calls: Vec<usize>,
    batches: Mutex<Vec<usize>>,
}

impl FlakyStore {
    fn failing_on(fail_calls: Vec<usize>) -> Self {
        Self {
            fail_calls,
            batches: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, len: usize) -> Result<usize, StoreError> {
        let mut batches = self.batches.lock().unwrap();
        batches.push(len);
        if self.fail_calls.contains(&batches.len()) {
            return Err(StoreError::Query {
                code: "Neo.TransientError.General".to_string(),
                message: "deadlock".to_string(),
            });
        }
        Ok(len)
    }
}

#[async_trait::async_trait]
impl GraphStore for FlakyStore {
    async fn create_nodes(&self, _label: Label, rows: &[PropertyMap]) -> Result<usize, StoreError> {
        self.record(rows.len())
    }

    async fn create_relationships(
        &self,
        _shape: RelationshipShape,
        rows: &[RelationshipRecord],
    ) -> Result<usize, StoreError> {
        self.record(rows.len())
    }
}

// ── Statements ──────────────────────────────────────────────

#[test]
fn test_node_upsert_merges_on_label_keys() {
    let statement = node_upsert(Label::Function);
    assert!(statement.starts_with("UNWIND $rows AS row"));
    assert!(statement.contains("MERGE (n:Function {file_id: row.file_id, name: row.name, lineno: row.lineno, ordinal: row.ordinal})"));
    assert!(statement.contains("ON CREATE SET n += row"));

    let statement = node_upsert(Label::File);
    assert!(statement.contains("MERGE (n:File {project_id: row.project_id, relative_path: row.relative_path})"));
}

#[test]
fn test_relationship_merge_matches_endpoints_by_key() {
    let shape = RelationshipShape {
        kind: RelationshipType::HasFile,
        from: Label::Folder,
        to: Label::File,
    };
    let statement = relationship_merge(shape);
    assert!(statement.contains("MATCH (a:Folder {folder_id: row.from})"));
    assert!(statement.contains("MATCH (b:File {file_id: row.to})"));
    assert!(statement.contains("MERGE (a)-[r:HAS_FILE]->(b)"));
    assert!(statement.contains("ON CREATE SET r += row.properties"));
}

#[test]
fn test_flatten_properties() {
    let props = row(&[
        ("name", json!("User")),
        ("superclasses", json!(["Base", "Mixin"])),
        ("methods", json!([{"name": "save"}])),
        ("details", json!({"files": 3})),
        ("docstring", Value::Null),
    ]);
    let flat = flatten_properties(&props);

    assert_eq!(flat["name"], json!("User"));
    assert_eq!(flat["superclasses"], json!(["Base", "Mixin"]));
    assert_eq!(flat["methods"], json!(r#"[{"name":"save"}]"#));
    assert_eq!(flat["details"], json!(r#"{"files":3}"#));
    assert!(!flat.contains_key("docstring"));
}

#[test]
fn test_relationship_rows_carry_endpoint_keys() {
    let record = RelationshipRecord::new(
        RelationshipType::Imports,
        NodeRef::new(Label::File, "file_a"),
        NodeRef::new(Label::File, "file_b"),
    )
    .with_property("name", "foo");
    let rows = statements::relationship_rows(&[record]);
    assert_eq!(rows, json!([{"from": "file_a", "to": "file_b", "properties": {"name": "foo"}}]));
}

// ── Memory store ────────────────────────────────────────────

#[tokio::test]
async fn test_memory_store_upserts_nodes() {
    let store = MemoryStore::new();
    let a = file("p1", "src/a.py");

    store.create_nodes(Label::File, &[a.properties()]).await.unwrap();

    let mut renamed = a.clone();
    renamed.file_id = "file_other".into();
    renamed.size = 999;
    store.create_nodes(Label::File, &[renamed.properties()]).await.unwrap();

    let graph = store.read().await;
    assert_eq!(graph.nodes_with_label(Label::File).count(), 1);
    let id = graph.find(Label::File, &a.file_id).unwrap();
    assert_eq!(graph.node(id).unwrap().properties["size"], json!(10));
}

#[tokio::test]
async fn test_memory_store_skips_missing_endpoints() {
    let store = MemoryStore::new();
    let a = file("p1", "src/a.py");
    let b = file("p1", "src/b.py");
    store
        .create_nodes(Label::File, &[a.properties(), b.properties()])
        .await
        .unwrap();

    let shape = RelationshipShape {
        kind: RelationshipType::Imports,
        from: Label::File,
        to: Label::File,
    };
    let rows = vec![
        RelationshipRecord::new(RelationshipType::Imports, b.node_ref(), a.node_ref()),
        RelationshipRecord::new(RelationshipType::Imports, b.node_ref(), a.node_ref()),
        RelationshipRecord::new(
            RelationshipType::Imports,
            b.node_ref(),
            NodeRef::new(Label::File, "file_missing"),
        ),
    ];
    let written = store.create_relationships(shape, &rows).await.unwrap();
    assert_eq!(written, 2);

    let graph = store.read().await;
    assert_eq!(graph.edges_of_kind(RelationshipType::Imports).count(), 1);
}

#[tokio::test]
async fn test_memory_store_status_and_reports() {
    let store = MemoryStore::new();
    assert!(store.project_status("p1").await.is_none());

    store
        .set_status("p1", ProjectStatus::AnalyzingStructure, 15.0, "Analyzing project structure")
        .await
        .unwrap();
    store
        .set_status("p1", ProjectStatus::StructureAnalyzed, 20.0, "Structure analyzed")
        .await
        .unwrap();

    let (status, progress, step) = store.project_status("p1").await.unwrap();
    assert_eq!(status, "structure_analyzed");
    assert_eq!(progress, 20.0);
    assert_eq!(step, "Structure analyzed");
    assert_eq!(store.status_history().await.len(), 2);

    let report = ReportNode::new("p1", "structure_analysis", "3 files").with_detail("files", 3);
    store.add_report(&report).await.unwrap();

    let reports = store.reports("p1").await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["type"], json!("structure_analysis"));
    assert_eq!(store.read().await.nodes_with_label(Label::Project).count(), 1);
}

// ── Writer ──────────────────────────────────────────────────

#[tokio::test]
async fn test_writer_continues_after_failed_batch() {
    let store = Arc::new(FlakyStore::failing_on(vec![2]));
    let writer = GraphWriter::new(store.clone(), 100);

    let rows: Vec<PropertyMap> = (0..250)
        .map(|i| row(&[("file_id", json!(format!("file_{i}")))]))
        .collect();
    let report = writer.write_nodes(Label::File, &rows).await;

    assert_eq!(*store.batches.lock().unwrap(), vec![100, 100, 50]);
    assert_eq!(report.attempted, 250);
    assert_eq!(report.written, 150);
    assert_eq!(report.batches, 3);
    assert_eq!(report.failed_batches, 1);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_writer_groups_relationships_by_shape() {
    let store = Arc::new(FlakyStore::failing_on(Vec::new()));
    let writer = GraphWriter::new(store.clone(), 2);

    let a = file("p1", "a.py");
    let b = file("p1", "b.py");
    let component = ComponentNode::for_file(&a, ComponentKind::Logic);
    let records = vec![
        RelationshipRecord::new(RelationshipType::Imports, a.node_ref(), b.node_ref()),
        RelationshipRecord::new(RelationshipType::ClassifiesAs, a.node_ref(), component.node_ref()),
        RelationshipRecord::new(RelationshipType::Imports, b.node_ref(), a.node_ref()),
        RelationshipRecord::new(RelationshipType::Imports, b.node_ref(), b.node_ref()),
    ];
    let report = writer.write_relationships(&records).await;

    // Imports: 2 + 1, ClassifiesAs: 1.
    let mut batches = store.batches.lock().unwrap().clone();
    batches.sort_unstable();
    assert_eq!(batches, vec![1, 1, 2]);
    assert_eq!(report.written, 4);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_writer_entities_land_in_memory_store() {
    let store = Arc::new(MemoryStore::new());
    let writer = GraphWriter::new(store.clone(), 0);
    assert_eq!(writer.batch_size(), 1);

    let files = vec![file("p1", "a.py"), file("p1", "b.py")];
    let report = writer.write_entities(&files).await;
    assert_eq!(report.written, 2);
    assert_eq!(report.batches, 2);
    assert_eq!(store.read().await.nodes_with_label(Label::File).count(), 2);
}
