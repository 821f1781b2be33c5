//! In-memory store backed by the core property graph
//!
//! Same merge semantics as the Cypher endpoint, without a server. Used by
//! `atlas scan` and by tests.

use std::sync::Arc;

use atlas_core::{
    GraphEntity, Label, NodeId, ProjectStatus, PropertyGraph, PropertyMap, RelationshipRecord,
    RelationshipShape, RelationshipType, ReportNode,
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::store::{GraphStore, StatusSink, StoreError};

/// One recorded status transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub project_id: String,
    pub status: ProjectStatus,
    pub progress: f64,
    pub step: String,
}

#[derive(Debug, Default)]
struct Inner {
    graph: PropertyGraph,
    history: Vec<StatusUpdate>,
}

/// Shared handle; clones see the same graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

/// Read access to the stored graph.
pub struct GraphView<'a> {
    guard: RwLockReadGuard<'a, Inner>,
}

impl std::ops::Deref for GraphView<'_> {
    type Target = PropertyGraph;

    fn deref(&self) -> &PropertyGraph {
        &self.guard.graph
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> GraphView<'_> {
        GraphView {
            guard: self.inner.read().await,
        }
    }

    /// Current `(status, progress, step)` of a project.
    pub async fn project_status(&self, project_id: &str) -> Option<(String, f64, String)> {
        let inner = self.inner.read().await;
        let id = inner.graph.find(Label::Project, project_id)?;
        let node = inner.graph.node(id)?;
        Some((
            node.get_str("status")?.to_string(),
            node.properties.get("progress").and_then(Value::as_f64).unwrap_or(0.0),
            node.get_str("step").unwrap_or_default().to_string(),
        ))
    }

    /// Reports attached to a project, in creation order.
    pub async fn reports(&self, project_id: &str) -> Vec<PropertyMap> {
        let inner = self.inner.read().await;
        let Some(project) = inner.graph.find(Label::Project, project_id) else {
            return Vec::new();
        };
        let mut targets: Vec<NodeId> = inner
            .graph
            .edges_from(project)
            .filter(|e| e.kind == RelationshipType::HasReport)
            .map(|e| e.target)
            .collect();
        // Node ids grow with insertion.
        targets.sort_by_key(|id| id.0);
        targets
            .into_iter()
            .filter_map(|id| inner.graph.node(id))
            .map(|n| n.properties.clone())
            .collect()
    }

    pub async fn status_history(&self) -> Vec<StatusUpdate> {
        self.inner.read().await.history.clone()
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn create_nodes(&self, label: Label, rows: &[PropertyMap]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner.graph.upsert_node(label, row.clone());
        }
        Ok(rows.len())
    }

    async fn create_relationships(
        &self,
        shape: RelationshipShape,
        rows: &[RelationshipRecord],
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let mut written = 0;
        for row in rows {
            let source = inner.graph.find(shape.from, &row.from.value);
            let target = inner.graph.find(shape.to, &row.to.value);
            let (Some(source), Some(target)) = (source, target) else {
                tracing::debug!("Skipping {} with missing endpoint: {} -> {}", shape, row.from.value, row.to.value);
                continue;
            };
            inner.graph.merge_edge(source, target, shape.kind, row.properties.clone());
            written += 1;
        }
        Ok(written)
    }
}

#[async_trait::async_trait]
impl StatusSink for MemoryStore {
    async fn set_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        progress: f64,
        step: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now().to_rfc3339();

        let mut seed = PropertyMap::new();
        seed.insert("project_id".into(), project_id.into());
        seed.insert("created_at".into(), now.clone().into());
        let id = inner.graph.upsert_node(Label::Project, seed).id();

        if let Some(node) = inner.graph.node_mut(id) {
            node.properties.insert("status".into(), status.as_str().into());
            node.properties.insert("progress".into(), progress.into());
            node.properties.insert("step".into(), step.into());
            node.properties.insert("updated_at".into(), now.into());
        }
        inner.history.push(StatusUpdate {
            project_id: project_id.to_string(),
            status,
            progress,
            step: step.to_string(),
        });
        Ok(())
    }

    async fn add_report(&self, report: &ReportNode) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        let mut seed = PropertyMap::new();
        seed.insert("project_id".into(), report.project_id.clone().into());
        seed.insert("created_at".into(), report.created_at.clone().into());
        let project = inner.graph.upsert_node(Label::Project, seed).id();
        let node = inner.graph.upsert_node(Label::Report, report.properties()).id();

        let mut properties = PropertyMap::new();
        properties.insert("created_at".into(), report.created_at.clone().into());
        inner
            .graph
            .merge_edge(project, node, RelationshipType::HasReport, properties);
        Ok(())
    }
}
