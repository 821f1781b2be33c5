//! AI provider implementations

pub mod local;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use atlas_core::config::LlmSettings;

use super::bridge::AnalysisProvider;

/// Factory function to create AI providers
pub fn create_provider(settings: &LlmSettings) -> Result<Arc<dyn AnalysisProvider>> {
    match settings.provider.as_str() {
        "openai" => {
            let provider = openai::OpenAIProvider::new(
                settings.api_key.clone(),
                Duration::from_secs(settings.timeout_secs),
            )?
            .with_model(settings.model.clone());
            Ok(Arc::new(provider))
        }
        "local" => Ok(Arc::new(local::LocalProvider::new())),
        other => anyhow::bail!("Unknown AI provider: {}", other),
    }
}
