//! Symbol extractor trait and per-file metadata

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use atlas_core::{ClassNode, EnumNode, FileNode, FunctionNode};
use futures_util::StreamExt;
use futures_util::stream;

/// What a raw link will become once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkKind {
    Import,
    Reference,
}

/// An import or a use of an imported name, still expressed as candidate
/// relative paths. The first candidate that names a project file wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub kind: LinkKind,
    /// Module or name as written in the source.
    pub name: String,
    pub candidates: Vec<String>,
    /// Set for references, e.g. `module_reference`.
    pub reference_type: Option<String>,
    pub lineno: Option<u32>,
}

impl RawLink {
    pub fn import(name: impl Into<String>, candidates: Vec<String>) -> Self {
        RawLink {
            kind: LinkKind::Import,
            name: name.into(),
            candidates,
            reference_type: None,
            lineno: None,
        }
    }

    pub fn reference(name: impl Into<String>, candidates: Vec<String>, reference_type: &str) -> Self {
        RawLink {
            kind: LinkKind::Reference,
            name: name.into(),
            candidates,
            reference_type: Some(reference_type.to_string()),
            lineno: None,
        }
    }

    pub fn at_line(mut self, lineno: u32) -> Self {
        self.lineno = Some(lineno);
        self
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    pub functions: Vec<FunctionNode>,
    pub classes: Vec<ClassNode>,
    pub enums: Vec<EnumNode>,
    pub imports: Vec<RawLink>,
    pub references: Vec<RawLink>,
}

impl FileMetadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.enums.is_empty()
            && self.imports.is_empty()
            && self.references.is_empty()
    }

    /// Number same-named symbols of each kind in source order so repeated
    /// names keep distinct merge keys.
    pub fn assign_ordinals(&mut self) {
        fn number<T>(items: &mut [T], parts: impl Fn(&mut T) -> (&str, &mut u32)) {
            let mut seen: HashMap<String, u32> = HashMap::new();
            for item in items.iter_mut() {
                let (name, ordinal) = parts(item);
                let count = seen.entry(name.to_string()).or_insert(0);
                *ordinal = *count;
                *count += 1;
            }
        }
        number(&mut self.functions, |f| (f.name.as_str(), &mut f.ordinal));
        number(&mut self.classes, |c| (c.name.as_str(), &mut c.ordinal));
        number(&mut self.enums, |e| (e.name.as_str(), &mut e.ordinal));
    }

    /// Imports followed by references.
    pub fn links(&self) -> impl Iterator<Item = &RawLink> {
        self.imports.iter().chain(self.references.iter())
    }
}

/// Turns one project file into symbols and raw links.
#[async_trait::async_trait]
pub trait SymbolExtractor: Send + Sync {
    async fn extract(&self, file: &FileNode) -> Result<FileMetadata>;
}

/// A file paired with what was extracted from it.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub file: FileNode,
    pub metadata: FileMetadata,
}

/// Tally of one content pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub native: usize,
    pub assisted: usize,
    pub failed: usize,
}

/// Routes Python to the native extractor and everything else to the
/// assisted one. Per-file failures are logged and yield empty metadata.
pub struct ContentExtractor {
    native: Arc<dyn SymbolExtractor>,
    assisted: Arc<dyn SymbolExtractor>,
    concurrency: usize,
}

impl ContentExtractor {
    pub fn new(
        native: Arc<dyn SymbolExtractor>,
        assisted: Arc<dyn SymbolExtractor>,
        concurrency: usize,
    ) -> Self {
        Self {
            native,
            assisted,
            concurrency: concurrency.max(1),
        }
    }

    fn is_native(file: &FileNode) -> bool {
        file.file_type == "python"
    }

    async fn extract_one(&self, file: &FileNode) -> (FileMetadata, bool) {
        let extractor = if Self::is_native(file) {
            &self.native
        } else {
            &self.assisted
        };
        match extractor.extract(file).await {
            Ok(metadata) => (metadata, true),
            Err(e) => {
                tracing::warn!("Extraction failed for {}: {:#}", file.relative_path, e);
                (FileMetadata::empty(), false)
            }
        }
    }

    /// Extract every file. Native files are parsed one after another on the
    /// parser pool; assisted files run with bounded concurrency. Output is
    /// ordered by relative path.
    pub async fn extract_all(&self, files: &[FileNode]) -> (Vec<ExtractedFile>, ExtractionStats) {
        let mut stats = ExtractionStats::default();
        let mut out = Vec::with_capacity(files.len());

        let (native, assisted): (Vec<&FileNode>, Vec<&FileNode>) =
            files.iter().partition(|f| Self::is_native(f));

        for file in native {
            let (metadata, ok) = self.extract_one(file).await;
            if ok {
                stats.native += 1;
            } else {
                stats.failed += 1;
            }
            out.push(ExtractedFile {
                file: file.clone(),
                metadata,
            });
        }

        let results: Vec<(FileNode, FileMetadata, bool)> = stream::iter(assisted)
            .map(|file| async move {
                let (metadata, ok) = self.extract_one(file).await;
                (file.clone(), metadata, ok)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (file, metadata, ok) in results {
            if ok {
                stats.assisted += 1;
            } else {
                stats.failed += 1;
            }
            out.push(ExtractedFile { file, metadata });
        }

        out.sort_by(|a, b| a.file.relative_path.cmp(&b.file.relative_path));
        (out, stats)
    }
}
