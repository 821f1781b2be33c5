//! Atlas Core: project graph data model, identifiers, path index and settings

pub mod config;
pub mod error;
pub mod graph;
pub mod ids;
pub mod model;
pub mod paths;


#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Settings;
pub use error::{AnalysisError, ArchiveError, ConfigError};
pub use graph::{EdgeId, NodeId, PropertyGraph, StoredEdge, StoredNode, Upsert};
pub use model::{
    Argument, Attribute, ClassKind, ClassNode, ComponentKind, ComponentNode, EnumNode, FileNode,
    FolderNode, FunctionNode, GraphEntity, Label, MethodSummary, NodeRef, ProjectStatus,
    PropertyMap, RelationshipRecord, RelationshipShape, RelationshipType, ReportNode, Visibility,
};
pub use paths::PathIndex;
