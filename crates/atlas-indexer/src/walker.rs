//! Project tree walk: folders, files and containment
//!
//! Hidden entries (any segment starting with `.`) are skipped together with
//! everything beneath them. Symlinks are not followed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use atlas_core::paths::relative_to;
use atlas_core::{
    AnalysisError, FileNode, FolderNode, GraphEntity, Label, NodeRef, PathIndex,
    RelationshipRecord, RelationshipType, ids, model,
};
use ignore::WalkBuilder;

use crate::classify::classify_path;

/// Everything the structure stage discovered.
#[derive(Debug)]
pub struct ProjectStructure {
    pub project_id: String,
    pub root: PathBuf,
    pub root_folder_id: String,
    pub folders: Vec<FolderNode>,
    pub files: Vec<FileNode>,
    /// Project→Folder, Project→File, Folder→Folder and Folder→File edges.
    pub containment: Vec<RelationshipRecord>,
    /// `relative_path -> file_id` for import resolution.
    pub index: PathIndex,
    /// Entries that could not be read or attached.
    pub skipped: usize,
}

impl ProjectStructure {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }
}

/// Walks a project root into folder and file records.
pub struct StructureWalker {
    project_id: String,
}

impl StructureWalker {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    fn project_ref(&self) -> NodeRef {
        NodeRef::new(Label::Project, self.project_id.clone())
    }

    fn folder(&self, path: &Path, relative_path: String, is_root: bool) -> FolderNode {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        FolderNode {
            folder_id: ids::folder_id(&self.project_id, &relative_path),
            project_id: self.project_id.clone(),
            folder_path: path.to_string_lossy().into_owned(),
            relative_path,
            name,
            is_root,
            created_at: model::timestamp(),
        }
    }

    /// Walk `root`. Folders are emitted before their children, in file-name
    /// order, so every folder's parent is known when it is created.
    pub fn walk(&self, root: &Path) -> Result<ProjectStructure, AnalysisError> {
        let root = root
            .canonicalize()
            .map_err(|_| AnalysisError::DirectoryNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(AnalysisError::DirectoryNotFound(root));
        }

        let root_folder = self.folder(&root, ".".to_string(), true);
        let root_folder_id = root_folder.folder_id.clone();

        let mut folder_ids: HashMap<PathBuf, String> = HashMap::new();
        folder_ids.insert(root.clone(), root_folder_id.clone());

        let mut containment = vec![
            RelationshipRecord::new(
                RelationshipType::Contains,
                self.project_ref(),
                root_folder.node_ref(),
            )
            .stamped(),
        ];
        let mut folders = vec![root_folder];
        let mut files = Vec::new();
        let index = PathIndex::new();
        let mut orphaned: Vec<PathBuf> = Vec::new();
        let mut skipped = 0;

        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path();
            if orphaned.iter().any(|o| path.starts_with(o)) {
                continue;
            }
            let Some(relative_path) = relative_to(&root, path) else {
                skipped += 1;
                continue;
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if folder_ids.contains_key(path) {
                    continue;
                }
                // Nearest ancestor already on record.
                let parent_id = path
                    .ancestors()
                    .skip(1)
                    .take_while(|a| a.starts_with(&root))
                    .find_map(|a| folder_ids.get(a).cloned());
                let Some(parent_id) = parent_id else {
                    tracing::error!("No parent folder on record for {}", relative_path);
                    orphaned.push(path.to_path_buf());
                    skipped += 1;
                    continue;
                };

                let folder = self.folder(path, relative_path, false);
                containment.push(
                    RelationshipRecord::new(
                        RelationshipType::HasFolder,
                        NodeRef::new(Label::Folder, parent_id),
                        folder.node_ref(),
                    )
                    .stamped(),
                );
                folder_ids.insert(path.to_path_buf(), folder.folder_id.clone());
                folders.push(folder);
            } else if file_type.is_file() {
                let Some(parent_id) = path.parent().and_then(|p| folder_ids.get(p)).cloned() else {
                    tracing::error!("No parent folder on record for {}", relative_path);
                    skipped += 1;
                    continue;
                };
                let size = match entry.metadata() {
                    Ok(meta) => meta.len(),
                    Err(e) => {
                        tracing::warn!("Cannot stat {}: {}", relative_path, e);
                        skipped += 1;
                        continue;
                    }
                };

                let file = FileNode {
                    file_id: ids::file_id(&self.project_id, &relative_path),
                    project_id: self.project_id.clone(),
                    file_path: path.to_string_lossy().into_owned(),
                    name: entry.file_name().to_string_lossy().into_owned(),
                    file_type: classify_path(path),
                    size,
                    relative_path,
                    created_at: model::timestamp(),
                };
                containment.push(
                    RelationshipRecord::new(
                        RelationshipType::HasFile,
                        NodeRef::new(Label::Folder, parent_id),
                        file.node_ref(),
                    )
                    .stamped(),
                );
                containment.push(
                    RelationshipRecord::new(
                        RelationshipType::Contains,
                        self.project_ref(),
                        file.node_ref(),
                    )
                    .stamped(),
                );
                index.insert(file.relative_path.clone(), file.file_id.clone());
                files.push(file);
            } else {
                tracing::debug!("Skipping non-regular entry {}", relative_path);
            }
        }

        tracing::info!(
            "Walked {}: {} folders, {} files, {} skipped",
            root.display(),
            folders.len(),
            files.len(),
            skipped
        );

        Ok(ProjectStructure {
            project_id: self.project_id.clone(),
            root,
            root_folder_id,
            folders,
            files,
            containment,
            index,
            skipped,
        })
    }
}
