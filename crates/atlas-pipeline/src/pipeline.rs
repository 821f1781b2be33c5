//! Analysis pipeline: intake, structure, content, classification
//!
//! One run per project. Stages execute in order; a fatal error stops the
//! run, attaches an error report and leaves whatever was written in place.
//! Re-running over the same tree upserts rather than duplicates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use atlas_ai::{AnalysisProvider, create_provider};
use atlas_core::{
    AnalysisError, ComponentNode, GraphEntity, ProjectStatus, RelationshipRecord,
    RelationshipType, ReportNode, Settings,
};
use atlas_indexer::{
    AssistedExtractor, ContentExtractor, ExtractedFile, ExtractionStats, ParserPool,
    ProjectStructure, PythonExtractor, ReferenceResolver, ResolutionStats, StructureWalker,
    classify_component, create_parser_pool, extract_archive, prepare_workdir,
};
use atlas_store::{GraphStore, GraphWriter, StatusSink, WriteReport};
use serde::Serialize;

use crate::status::{ANALYSIS_REPORT, CONTENT_REPORT, ProjectProgress, STRUCTURE_REPORT};

/// Aggregate counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub project_id: String,
    pub root: PathBuf,
    pub folders: usize,
    pub files: usize,
    pub skipped_entries: usize,
    pub functions: usize,
    pub classes: usize,
    pub enums: usize,
    pub imports: usize,
    pub references: usize,
    pub unresolved_links: usize,
    pub components: usize,
    pub native_files: usize,
    pub assisted_files: usize,
    pub failed_files: usize,
    pub records_written: usize,
    pub failed_batches: usize,
}

impl AnalysisSummary {
    fn absorb_writes(&mut self, report: WriteReport) {
        self.records_written += report.written;
        self.failed_batches += report.failed_batches;
    }

    fn absorb_extraction(&mut self, stats: ExtractionStats) {
        self.native_files = stats.native;
        self.assisted_files = stats.assisted;
        self.failed_files = stats.failed;
    }

    fn absorb_resolution(&mut self, stats: ResolutionStats) {
        self.unresolved_links = stats.unresolved;
    }
}

/// Symbols and edges produced by the content stage.
#[derive(Default)]
struct ContentGraph {
    functions: Vec<atlas_core::FunctionNode>,
    classes: Vec<atlas_core::ClassNode>,
    enums: Vec<atlas_core::EnumNode>,
    ownership: Vec<RelationshipRecord>,
    links: Vec<RelationshipRecord>,
}

impl ContentGraph {
    fn build(extracted: Vec<ExtractedFile>, resolver: &mut ReferenceResolver<'_>) -> Self {
        let mut graph = ContentGraph::default();

        for ExtractedFile { file, metadata } in extracted {
            let owner = file.node_ref();

            for link in resolver.resolve_all(&file.file_id, metadata.links()) {
                graph.links.push(link.to_record());
            }

            for function in metadata.functions {
                graph.ownership.push(
                    RelationshipRecord::new(RelationshipType::HasFunction, owner.clone(), function.node_ref())
                        .stamped(),
                );
                graph.functions.push(function);
            }
            for class in metadata.classes {
                graph.ownership.push(
                    RelationshipRecord::new(RelationshipType::HasClass, owner.clone(), class.node_ref())
                        .stamped(),
                );
                graph.classes.push(class);
            }
            for enum_node in metadata.enums {
                graph.ownership.push(
                    RelationshipRecord::new(RelationshipType::HasEnum, owner.clone(), enum_node.node_ref())
                        .stamped(),
                );
                graph.enums.push(enum_node);
            }
        }
        graph
    }

    fn count(&self, kind: RelationshipType) -> usize {
        self.links.iter().filter(|r| r.kind == kind).count()
    }
}

pub struct Analyzer {
    writer: GraphWriter,
    sink: Arc<dyn StatusSink>,
    provider: Arc<dyn AnalysisProvider>,
    parser_pool: ParserPool,
    settings: Settings,
}

impl Analyzer {
    pub fn new(
        store: Arc<dyn GraphStore>,
        sink: Arc<dyn StatusSink>,
        provider: Arc<dyn AnalysisProvider>,
        settings: Settings,
    ) -> Self {
        Self {
            writer: GraphWriter::new(store, settings.batch_size),
            sink,
            provider,
            parser_pool: create_parser_pool(),
            settings,
        }
    }

    /// Build an analyzer whose LLM provider comes from `settings.llm`.
    pub fn from_settings(
        store: Arc<dyn GraphStore>,
        sink: Arc<dyn StatusSink>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let provider = create_provider(&settings.llm)?;
        tracing::info!("Using {} provider for non-Python files", provider.name());
        Ok(Self::new(store, sink, provider, settings))
    }

    /// Unpack `archive` into a fresh working directory and analyze it.
    pub async fn analyze_archive(
        &self,
        archive: &Path,
        project_id: &str,
    ) -> Result<AnalysisSummary, AnalysisError> {
        let progress = ProjectProgress::new(self.sink.clone(), project_id);

        let extract_dir = match self.unpack(archive, project_id).await {
            Ok(dir) => dir,
            Err(e) => {
                progress.fail("intake", &e).await;
                return Err(e);
            }
        };
        self.run(&extract_dir, progress).await
    }

    /// Analyze a directory already on disk.
    pub async fn analyze_directory(
        &self,
        root: &Path,
        project_id: &str,
    ) -> Result<AnalysisSummary, AnalysisError> {
        let progress = ProjectProgress::new(self.sink.clone(), project_id);
        self.run(root, progress).await
    }

    async fn unpack(&self, archive: &Path, project_id: &str) -> Result<PathBuf, AnalysisError> {
        let archive = archive.to_path_buf();
        let temp_root = self.settings.storage.temp_dir.clone();
        let max_bytes = self.settings.storage.max_upload_bytes();
        let project_id = project_id.to_string();

        let extraction = tokio::task::spawn_blocking(move || {
            let dest = prepare_workdir(&temp_root, &project_id)?;
            extract_archive(&archive, &dest, max_bytes)
        })
        .await
        .map_err(|e| AnalysisError::Stage {
            stage: "intake",
            message: e.to_string(),
        })??;
        Ok(extraction.extract_dir)
    }

    async fn run(
        &self,
        root: &Path,
        mut progress: ProjectProgress,
    ) -> Result<AnalysisSummary, AnalysisError> {
        let project_id = progress.project_id().to_string();
        let mut summary = AnalysisSummary {
            project_id: project_id.clone(),
            root: root.to_path_buf(),
            ..AnalysisSummary::default()
        };

        // ── Structure ───────────────────────────────────────────
        progress
            .advance(ProjectStatus::AnalyzingStructure, "Analyzing project structure")
            .await;
        let structure = match self.walk(root, &project_id).await {
            Ok(structure) => structure,
            Err(e) => {
                progress.fail("structure", &e).await;
                return Err(e);
            }
        };
        summary.folders = structure.folder_count();
        summary.files = structure.file_count();
        summary.skipped_entries = structure.skipped;
        summary.root = structure.root.clone();

        let mut writes = WriteReport::default();
        writes.absorb(self.writer.write_entities(&structure.folders).await);
        writes.absorb(self.writer.write_entities(&structure.files).await);
        writes.absorb(self.writer.write_relationships(&structure.containment).await);
        summary.absorb_writes(writes);

        progress
            .advance(ProjectStatus::StructureAnalyzed, "Project structure analyzed")
            .await;
        progress
            .report(
                ReportNode::new(
                    &project_id,
                    STRUCTURE_REPORT,
                    format!("{} folders, {} files", summary.folders, summary.files),
                )
                .with_detail("folders", summary.folders)
                .with_detail("files", summary.files)
                .with_detail("skipped_entries", summary.skipped_entries)
                .with_detail("failed_batches", writes.failed_batches),
            )
            .await;

        // ── Content ─────────────────────────────────────────────
        progress
            .advance(ProjectStatus::AnalyzingContent, "Analyzing file contents")
            .await;
        let extractor = ContentExtractor::new(
            Arc::new(PythonExtractor::new(self.parser_pool.clone())),
            Arc::new(AssistedExtractor::new(self.provider.clone(), &self.settings.llm)),
            self.settings.llm.concurrency,
        );
        let (extracted, stats) = extractor.extract_all(&structure.files).await;
        summary.absorb_extraction(stats);

        let mut resolver = ReferenceResolver::new(&structure.index);
        let content = ContentGraph::build(extracted, &mut resolver);
        summary.absorb_resolution(resolver.stats());
        summary.functions = content.functions.len();
        summary.classes = content.classes.len();
        summary.enums = content.enums.len();
        summary.imports = content.count(RelationshipType::Imports);
        summary.references = content.count(RelationshipType::References);

        let mut writes = WriteReport::default();
        writes.absorb(self.writer.write_entities(&content.functions).await);
        writes.absorb(self.writer.write_entities(&content.classes).await);
        writes.absorb(self.writer.write_entities(&content.enums).await);
        writes.absorb(self.writer.write_relationships(&content.ownership).await);
        writes.absorb(self.writer.write_relationships(&content.links).await);

        // ── Classification ──────────────────────────────────────
        let components: Vec<ComponentNode> = structure
            .files
            .iter()
            .map(|f| ComponentNode::for_file(f, classify_component(&f.relative_path, &f.file_type)))
            .collect();
        let classified: Vec<RelationshipRecord> = structure
            .files
            .iter()
            .zip(&components)
            .map(|(f, c)| {
                RelationshipRecord::new(RelationshipType::ClassifiesAs, f.node_ref(), c.node_ref())
                    .stamped()
            })
            .collect();
        summary.components = components.len();
        writes.absorb(self.writer.write_entities(&components).await);
        writes.absorb(self.writer.write_relationships(&classified).await);
        summary.absorb_writes(writes);

        progress
            .advance(ProjectStatus::ContentAnalyzed, "File contents analyzed")
            .await;
        progress
            .report(
                ReportNode::new(
                    &project_id,
                    CONTENT_REPORT,
                    format!(
                        "{} functions, {} classes, {} enums, {} imports",
                        summary.functions, summary.classes, summary.enums, summary.imports
                    ),
                )
                .with_detail("functions", summary.functions)
                .with_detail("classes", summary.classes)
                .with_detail("enums", summary.enums)
                .with_detail("imports", summary.imports)
                .with_detail("references", summary.references)
                .with_detail("unresolved_links", summary.unresolved_links)
                .with_detail("components", summary.components)
                .with_detail("failed_files", summary.failed_files)
                .with_detail("failed_batches", writes.failed_batches),
            )
            .await;

        // ── Done ────────────────────────────────────────────────
        progress.advance(ProjectStatus::Analyzed, "Analysis complete").await;
        progress
            .report(
                ReportNode::new(&project_id, ANALYSIS_REPORT, "Analysis complete")
                    .with_detail("files", summary.files)
                    .with_detail("folders", summary.folders)
                    .with_detail("records_written", summary.records_written)
                    .with_detail("failed_batches", summary.failed_batches),
            )
            .await;

        tracing::info!(
            "Analyzed project {}: {} files, {} functions, {} classes, {} imports, {} failed batches",
            project_id,
            summary.files,
            summary.functions,
            summary.classes,
            summary.imports,
            summary.failed_batches
        );
        Ok(summary)
    }

    async fn walk(&self, root: &Path, project_id: &str) -> Result<ProjectStructure, AnalysisError> {
        let walker = StructureWalker::new(project_id);
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || walker.walk(&root))
            .await
            .map_err(|e| AnalysisError::Stage {
                stage: "structure",
                message: e.to_string(),
            })?
    }
}
