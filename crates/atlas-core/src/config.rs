//! Runtime settings
//!
//! Resolution order: built-in defaults, then an optional `atlas.toml`, then
//! environment variables (a `.env` file is honoured), then CLI flags applied
//! by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE: &str = "atlas.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Base URL of the Cypher HTTP endpoint.
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `openai` or `local`.
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    /// Files above this size get empty metadata instead of an LLM call.
    pub max_file_bytes: u64,
    /// Content is truncated to this many characters before prompting.
    pub max_chars: usize,
    /// In-flight LLM requests per project.
    pub concurrency: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            max_file_bytes: 100 * 1024,
            max_chars: 25_000,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where uploaded archives are unpacked.
    pub temp_dir: PathBuf,
    pub max_upload_mb: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("./tmp"),
            max_upload_mb: 500,
        }
    }
}

impl StorageSettings {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graph: GraphSettings,
    pub llm: LlmSettings,
    pub storage: StorageSettings,
    /// Records per graph-store transaction.
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graph: GraphSettings::default(),
            llm: LlmSettings::default(),
            storage: StorageSettings::default(),
            batch_size: 100,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `atlas.toml` if present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(
            "Settings loaded: graph={} llm={}/{} batch_size={}",
            settings.graph.uri,
            settings.llm.provider,
            settings.llm.model,
            settings.batch_size
        );
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `ATLAS_*` style overrides from a key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ATLAS_GRAPH_URI") {
            self.graph.uri = v;
        }
        if let Some(v) = lookup("ATLAS_GRAPH_USER") {
            self.graph.user = v;
        }
        if let Some(v) = lookup("ATLAS_GRAPH_PASSWORD") {
            self.graph.password = v;
        }
        if let Some(v) = lookup("ATLAS_GRAPH_DATABASE") {
            self.graph.database = v;
        }
        if let Some(v) = lookup("ATLAS_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = lookup("ATLAS_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("ATLAS_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_number("ATLAS_LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("ATLAS_LLM_CONCURRENCY") {
            self.llm.concurrency = parse_number("ATLAS_LLM_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("ATLAS_TEMP_DIR") {
            self.storage.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ATLAS_MAX_UPLOAD_MB") {
            self.storage.max_upload_mb = parse_number("ATLAS_MAX_UPLOAD_MB", &v)?;
        }
        if let Some(v) = lookup("ATLAS_BATCH_SIZE") {
            self.batch_size = parse_number("ATLAS_BATCH_SIZE", &v)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
