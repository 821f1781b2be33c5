//! Persistence seams: the graph store and the project status sink

use atlas_core::{Label, ProjectStatus, PropertyMap, RelationshipRecord, RelationshipShape, ReportNode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{code}: {message}")]
    Query { code: String, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Batched writes of nodes and relationships.
///
/// Each call is one transaction. Node rows are upserted on their label's
/// merge keys; relationship rows are merged between existing endpoints.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Upsert a batch of nodes carrying `label`. Returns rows written.
    async fn create_nodes(&self, label: Label, rows: &[PropertyMap]) -> Result<usize, StoreError>;

    /// Merge a batch of relationships that all share `shape`. Returns rows
    /// whose endpoints both exist.
    async fn create_relationships(
        &self,
        shape: RelationshipShape,
        rows: &[RelationshipRecord],
    ) -> Result<usize, StoreError>;
}

/// Where pipeline progress and reports are recorded.
#[async_trait::async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        progress: f64,
        step: &str,
    ) -> Result<(), StoreError>;

    /// Attach a report to its project.
    async fn add_report(&self, report: &ReportNode) -> Result<(), StoreError>;
}
