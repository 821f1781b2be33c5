//! LLM-assisted extraction for files without a native parser

use std::sync::Arc;

use anyhow::{Context, Result};
use atlas_ai::{AnalysisProvider, FileAnalysis};
use atlas_ai::prompt::truncate_content;
use atlas_core::config::LlmSettings;
use atlas_core::paths::{join, normalize, parent_dir};
use atlas_core::{ClassNode, EnumNode, FileNode, FunctionNode, ids, model};

use crate::extractor::{FileMetadata, RawLink, SymbolExtractor};

/// Suffixes that make a dotted specifier a file name rather than a module path.
const FILE_SUFFIXES: &[&str] = &[
    "h", "hh", "hpp", "c", "cc", "cpp", "js", "jsx", "mjs", "ts", "tsx", "css", "scss", "json",
    "vue", "svelte", "py", "rb", "php", "go", "java", "kt", "rs", "swift",
];

pub struct AssistedExtractor {
    provider: Arc<dyn AnalysisProvider>,
    max_file_bytes: u64,
    max_chars: usize,
}

impl AssistedExtractor {
    pub fn new(provider: Arc<dyn AnalysisProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            max_file_bytes: settings.max_file_bytes,
            max_chars: settings.max_chars,
        }
    }

    /// Map a provider analysis onto graph records for `file`.
    pub fn to_metadata(file: &FileNode, analysis: FileAnalysis) -> FileMetadata {
        let functions = analysis
            .functions
            .into_iter()
            .map(|f| {
                let lineno = f.lineno.unwrap_or(0);
                FunctionNode {
                    function_id: ids::fresh_id(),
                    file_id: file.file_id.clone(),
                    project_id: file.project_id.clone(),
                    name: f.name,
                    return_type: f.return_type,
                    arguments: f.arguments,
                    decorators: f.decorators,
                    is_static: f.is_static,
                    is_async: f.is_async,
                    docstring: f.docstring,
                    lineno,
                    end_lineno: f.end_lineno.unwrap_or(lineno),
                    ordinal: 0,
                    created_at: model::timestamp(),
                }
            })
            .collect();

        let classes = analysis
            .classes
            .into_iter()
            .map(|c| {
                let lineno = c.lineno.unwrap_or(0);
                ClassNode {
                    class_id: ids::fresh_id(),
                    file_id: file.file_id.clone(),
                    project_id: file.project_id.clone(),
                    name: c.name,
                    kind: c.kind,
                    superclasses: c.superclasses,
                    methods: c.methods,
                    attributes: c.attributes,
                    docstring: c.docstring,
                    lineno,
                    end_lineno: c.end_lineno.unwrap_or(lineno),
                    ordinal: 0,
                    created_at: model::timestamp(),
                }
            })
            .collect();

        let enums = analysis
            .enums
            .into_iter()
            .map(|e| EnumNode {
                enum_id: ids::fresh_id(),
                file_id: file.file_id.clone(),
                project_id: file.project_id.clone(),
                name: e.name,
                values: e.values,
                docstring: e.docstring,
                lineno: 0,
                end_lineno: 0,
                ordinal: 0,
                created_at: model::timestamp(),
            })
            .collect();

        let imports = analysis
            .imports
            .into_iter()
            .filter_map(|spec| {
                let candidates = import_candidates(&spec, &file.relative_path);
                (!candidates.is_empty()).then(|| RawLink::import(spec, candidates))
            })
            .collect();

        let mut metadata = FileMetadata {
            functions,
            classes,
            enums,
            imports,
            references: Vec::new(),
        };
        metadata.assign_ordinals();
        metadata
    }
}

#[async_trait::async_trait]
impl SymbolExtractor for AssistedExtractor {
    async fn extract(&self, file: &FileNode) -> Result<FileMetadata> {
        if file.size > self.max_file_bytes {
            tracing::warn!(
                "Skipping {}: {} bytes exceeds the {} byte analysis limit",
                file.relative_path,
                file.size,
                self.max_file_bytes
            );
            return Ok(FileMetadata::empty());
        }

        let bytes = tokio::fs::read(&file.file_path)
            .await
            .with_context(|| format!("Failed to read {}", file.file_path))?;
        let content = match std::str::from_utf8(&bytes) {
            Ok(text) if !text.contains('\0') => text,
            _ => {
                tracing::debug!("Skipping binary file {}", file.relative_path);
                return Ok(FileMetadata::empty());
            }
        };
        if content.trim().is_empty() {
            return Ok(FileMetadata::empty());
        }

        let content = truncate_content(content, self.max_chars);
        let analysis = self
            .provider
            .analyze_file(&content, &file.file_type)
            .await
            .with_context(|| format!("{} analysis failed", self.provider.name()))?;

        Ok(Self::to_metadata(file, analysis))
    }
}

fn extension(relative_path: &str) -> Option<&str> {
    let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    name.rsplit_once('.').map(|(_, ext)| ext).filter(|e| !e.is_empty())
}

fn push_unique(out: &mut Vec<String>, path: String) {
    if !path.is_empty() && !out.contains(&path) {
        out.push(path);
    }
}

/// Extensions a bundler tries for an extensionless script import, in order.
const SCRIPT_FAMILY: &[&str] = &["ts", "tsx", "js", "jsx", "mjs"];

/// The importer's own extension first, then the rest of its family.
fn extension_order(ext: Option<&str>) -> Vec<&str> {
    match ext {
        Some(ext) if SCRIPT_FAMILY.contains(&ext) => std::iter::once(ext)
            .chain(SCRIPT_FAMILY.iter().copied().filter(|e| *e != ext))
            .collect(),
        Some(ext) => vec![ext],
        None => Vec::new(),
    }
}

/// The path itself if it names a file, otherwise the path with each
/// candidate extension, then as a directory index.
fn with_extensions(out: &mut Vec<String>, base: &str, ext: Option<&str>) {
    if extension(base).is_some_and(|e| FILE_SUFFIXES.contains(&e)) {
        push_unique(out, base.to_string());
        return;
    }
    let order = extension_order(ext);
    for ext in &order {
        push_unique(out, format!("{base}.{ext}"));
    }
    for ext in &order {
        push_unique(out, format!("{base}/index.{ext}"));
    }
    push_unique(out, base.to_string());
}

/// Candidate project paths for an import specifier found in `importer`.
pub fn import_candidates(spec: &str, importer: &str) -> Vec<String> {
    let spec = spec
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '<' | '>' | '`'));
    if spec.is_empty() {
        return Vec::new();
    }

    let dir = parent_dir(importer);
    let ext = extension(importer);
    let mut out = Vec::new();

    if spec.starts_with("./") || spec.starts_with("../") {
        if let Some(base) = normalize(&join(dir, spec)) {
            with_extensions(&mut out, &base, ext);
        }
    } else if let Some(rooted) = spec.strip_prefix('/') {
        if let Some(base) = normalize(rooted) {
            with_extensions(&mut out, &base, ext);
        }
    } else if spec.contains('/') {
        for base in [normalize(&join(dir, spec)), normalize(spec)].into_iter().flatten() {
            with_extensions(&mut out, &base, ext);
        }
    } else if extension(spec).is_some_and(|e| FILE_SUFFIXES.contains(&e)) {
        // `board.h`, `util.js`: a file next to the importer or at the root.
        push_unique(&mut out, join(dir, spec));
        push_unique(&mut out, spec.to_string());
    } else {
        // Dotted module path.
        let path = spec.replace('.', "/");
        push_unique(&mut out, format!("{path}.py"));
        if let Some(ext) = ext.filter(|e| *e != "py") {
            push_unique(&mut out, format!("{path}.{ext}"));
            push_unique(&mut out, join(dir, &format!("{path}.{ext}")));
        }
    }
    out
}
