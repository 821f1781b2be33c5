//! Atlas CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Crates whose logs the default filter lets through.
const LOG_TARGETS: &[&str] = &[
    "atlas",
    "atlas_core",
    "atlas_indexer",
    "atlas_ai",
    "atlas_store",
    "atlas_pipeline",
];

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Analyze a source archive into a project graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to ./atlas.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpack an archive and write its graph to the graph database
    Analyze {
        /// Path to the .zip archive
        archive: PathBuf,

        /// Project identifier
        #[arg(short, long)]
        project: String,

        /// Graph endpoint base URL
        #[arg(long)]
        graph_uri: Option<String>,

        /// Records per transaction
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Analyze a directory into an in-memory graph and print a summary
    Scan {
        /// Directory to analyze
        dir: PathBuf,

        /// Project identifier
        #[arg(short, long, default_value = "local")]
        project: String,

        /// Use the configured LLM provider for non-Python files
        #[arg(long)]
        llm: bool,
    },
    /// Print the file type and component of a path
    Classify {
        path: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, log_level))
            .collect();
        tracing_subscriber::EnvFilter::new(directives.join(","))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            archive,
            project,
            graph_uri,
            batch_size,
        } => {
            let mut settings = commands::load_settings(cli.config.as_deref())?;
            if let Some(uri) = graph_uri {
                settings.graph.uri = uri;
            }
            if let Some(batch_size) = batch_size {
                settings.batch_size = batch_size;
            }
            commands::analyze(settings, archive, project).await
        }
        Commands::Scan { dir, project, llm } => {
            let settings = commands::load_settings(cli.config.as_deref())?;
            commands::scan(settings, dir, project, llm).await
        }
        Commands::Classify { path } => commands::classify(path),
        Commands::Version => {
            println!("Atlas v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
