//! Identifier generation
//!
//! Folder and file ids are derived from `(project_id, relative_path)` so that
//! re-analysing an unchanged tree addresses the same nodes. Symbol ids are
//! fresh on every run.

use uuid::Uuid;

fn derived(project_id: &str, kind: &str, relative_path: &str) -> Uuid {
    let name = format!("{project_id}/{kind}/{relative_path}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Stable id for a folder.
pub fn folder_id(project_id: &str, relative_path: &str) -> String {
    format!("folder_{}", derived(project_id, "folder", relative_path).simple())
}

/// Stable id for a file.
pub fn file_id(project_id: &str, relative_path: &str) -> String {
    format!("file_{}", derived(project_id, "file", relative_path).simple())
}

/// Fresh random id for symbols and reports.
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}
