//! OpenAI provider implementation

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::super::bridge::{AnalysisProvider, FileAnalysis};
use super::super::prompt::{SYSTEM_PROMPT, file_analysis_prompt};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key
                .unwrap_or_else(|| std::env::var("OPENAI_API_KEY").unwrap_or_default()),
            model: "gpt-4o-mini".to_string(),
        })
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn request(&self, prompt: &str, json_mode: bool) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(2);
        if !json_mode {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.0,
            max_tokens: 4000,
            response_format: json_mode.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        }
    }

    async fn send(&self, request: &OpenAIRequest) -> Result<reqwest::Response> {
        self.client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send request to OpenAI")
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[async_trait::async_trait]
impl AnalysisProvider for OpenAIProvider {
    async fn analyze_file(&self, content: &str, file_type: &str) -> Result<FileAnalysis> {
        let prompt = file_analysis_prompt(content, file_type);

        let mut response = self.send(&self.request(&prompt, true)).await?;

        // Older models reject `response_format`; retry with a system instruction instead.
        if response.status() == StatusCode::BAD_REQUEST {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                "JSON response format not supported ({}), using standard response",
                error_text.trim()
            );
            response = self.send(&self.request(&prompt, false)).await?;
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to decode OpenAI response")?;
        let reply = openai_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("OpenAI response had no choices")?;

        Ok(FileAnalysis::parse_lenient(reply))
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}
