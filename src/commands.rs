//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use atlas_core::Settings;
use atlas_indexer::{classify_component, classify_path};
use atlas_pipeline::Analyzer;
use atlas_store::{CypherHttpStore, MemoryStore};

pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    Settings::load(path).context("Failed to load settings")
}

pub async fn analyze(settings: Settings, archive: PathBuf, project: String) -> anyhow::Result<()> {
    tracing::info!("Analyzing {} as project {}", archive.display(), project);

    let store = Arc::new(CypherHttpStore::new(&settings.graph).context("Failed to build graph client")?);
    store
        .ping()
        .await
        .with_context(|| format!("Graph endpoint {} is not reachable", store.endpoint()))?;

    let analyzer = Analyzer::from_settings(store.clone(), store, settings)?;
    let summary = analyzer
        .analyze_archive(&archive, &project)
        .await
        .with_context(|| format!("Analysis of {} failed", archive.display()))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn scan(mut settings: Settings, dir: PathBuf, project: String, llm: bool) -> anyhow::Result<()> {
    if !llm {
        settings.llm.provider = "local".to_string();
    }
    tracing::info!("Scanning {} as project {}", dir.display(), project);

    let store = MemoryStore::new();
    let analyzer = Analyzer::from_settings(Arc::new(store.clone()), Arc::new(store.clone()), settings)?;
    let summary = analyzer
        .analyze_directory(&dir, &project)
        .await
        .with_context(|| format!("Scan of {} failed", dir.display()))?;

    let graph = store.read().await;
    tracing::info!("Graph holds {} nodes, {} edges", graph.node_count(), graph.edge_count());

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub fn classify(path: PathBuf) -> anyhow::Result<()> {
    let file_type = classify_path(&path);
    let component = classify_component(&path.to_string_lossy(), &file_type);
    println!("{}\t{}\t{}", path.display(), file_type, component.as_str());
    Ok(())
}
