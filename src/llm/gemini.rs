//! Gemini API client
//!
//! This module provides a direct HTTP client for the Google Gemini API,
//! translating conversation turns into Gemini `contents` and Gemini
//! responses back into plain reply text.
//!
//! # Authentication
//!
//! Uses a Gemini API key (set via `GEMINI_API_KEY` environment variable or passed directly).
//!
//! ```ignore
//! // From environment variable
//! let llm = GeminiProvider::from_env()?;
//!
//! // With explicit API key
//! let llm = GeminiProvider::new("AIza...")?.with_model("gemini-1.5-flash");
//! ```

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use super::provider::{LlmProvider, TextStream};
use crate::conversation::{Role, Turn};
use crate::core::env;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Finish reasons that mean the reply was cut off by the model, not completed
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "OTHER",
];

fn is_blocking_finish(reason: &str) -> bool {
    BLOCKING_FINISH_REASONS.contains(&reason)
}

// ============================================================================
// Gemini-specific request/response types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

impl GeminiCandidate {
    /// Visible text of this candidate; thought summaries are skipped
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiResponse {
    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    fn first_candidate(&self) -> Option<&GeminiCandidate> {
        self.candidates.as_ref().and_then(|c| c.first())
    }

    /// Extract the reply text of a complete (non-streaming) response
    fn into_reply(self) -> Result<String> {
        if let Some(reason) = self.block_reason() {
            anyhow::bail!("Gemini blocked the prompt: {}", reason);
        }

        let candidate = self
            .first_candidate()
            .context("No candidates in Gemini response")?;

        let finish_reason = candidate.finish_reason.as_deref();
        if let Some(reason) = finish_reason.filter(|r| is_blocking_finish(r)) {
            anyhow::bail!("Gemini stopped the reply early (finish_reason={})", reason);
        }

        let text = candidate.text();
        if text.is_empty() {
            anyhow::bail!(
                "Gemini returned an empty reply (finish_reason={})",
                finish_reason.unwrap_or("unknown")
            );
        }

        Ok(text)
    }
}

// ============================================================================
// GeminiProvider
// ============================================================================

/// Google Gemini LLM provider
///
/// Holds no conversation state: every call receives the full history.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_base: String,
    system_instruction: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider from environment variables
    ///
    /// Reads from:
    /// - `GEMINI_API_KEY` (required)
    /// - `GEMINI_MODEL` (optional, defaults to `gemini-1.5-flash`)
    /// - `GEMINI_MAX_TOKENS` (optional, defaults to 1024)
    /// - `GEMINI_TEMPERATURE` (optional, defaults to 0.7)
    /// - `GEMINI_API_BASE` (optional, overrides the Google endpoint)
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating Gemini provider from environment");

        let api_key =
            env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable not set")?;

        let mut provider = Self::new(api_key)?;

        if let Some(model) = env::var("GEMINI_MODEL") {
            provider = provider.with_model(model);
        }
        if let Some(max_tokens) = env::parse_var("GEMINI_MAX_TOKENS")? {
            provider = provider.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = env::parse_var("GEMINI_TEMPERATURE")? {
            provider = provider.with_temperature(temperature);
        }
        if let Some(api_base) = env::var("GEMINI_API_BASE") {
            provider = provider.with_api_base(api_base);
        }

        tracing::info!("Using model: {}", provider.model);
        tracing::info!("Max tokens: {}", provider.max_tokens);

        Ok(provider)
    }

    /// Create a new Gemini provider with a specific API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            api_base: DEFAULT_API_BASE.to_string(),
            system_instruction: None,
        })
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the API base URL (proxies, local test servers)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the system instruction sent with every request
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    // ========================================================================
    // Format conversion: turns -> Gemini
    // ========================================================================

    /// Convert conversation turns to Gemini contents
    fn convert_turns(turns: &[Turn]) -> Vec<GeminiContent> {
        let contents = turns
            .iter()
            .filter(|t| !t.text.is_empty())
            .map(|t| GeminiContent {
                role: match t.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
                parts: vec![GeminiPart::text(t.text.clone())],
            })
            .collect();

        // Gemini requires alternating user/model turns - merge consecutive same-role messages
        Self::merge_consecutive_roles(contents)
    }

    /// Merge consecutive messages with the same role (Gemini requires alternation)
    fn merge_consecutive_roles(contents: Vec<GeminiContent>) -> Vec<GeminiContent> {
        let mut merged: Vec<GeminiContent> = Vec::new();

        for content in contents {
            if let Some(last) = merged.last_mut() {
                if last.role == content.role {
                    last.parts.extend(content.parts);
                    continue;
                }
            }
            merged.push(content);
        }

        merged
    }

    /// Build a GeminiRequest from the conversation history
    fn build_request(&self, history: &[Turn]) -> GeminiRequest {
        GeminiRequest {
            contents: Self::convert_turns(history),
            system_instruction: self.system_instruction.as_ref().map(|text| {
                GeminiSystemInstruction {
                    parts: vec![GeminiPart::text(text.clone())],
                }
            }),
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: Some(self.max_tokens),
                temperature: Some(self.temperature),
            }),
        }
    }

    // ========================================================================
    // API methods
    // ========================================================================

    /// Build the API URL for a given operation
    fn api_url(&self, operation: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, operation)
    }

    /// Send a non-streaming request to the Gemini API
    async fn send_gemini_request(&self, request: &GeminiRequest) -> Result<GeminiResponse> {
        let url = self.api_url("generateContent");

        let request_json =
            serde_json::to_string(request).context("Failed to serialize Gemini request")?;
        tracing::debug!("[Gemini] Request JSON: {}", request_json);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .body(request_json)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;

        tracing::debug!("[Gemini] Response status: {}", status);
        tracing::debug!("[Gemini] Response body: {}", response_text);

        if !status.is_success() {
            tracing::error!("[Gemini] API error: {} - {}", status, response_text);
            anyhow::bail!("Gemini API error ({}): {}", status, response_text);
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).context("Failed to parse Gemini API response")?;

        Ok(gemini_response)
    }

    /// Send a streaming request to the Gemini API
    ///
    /// Returns once the upstream has answered with a success status; the
    /// body is then parsed lazily as server-sent events.
    async fn send_gemini_streaming_request(&self, request: &GeminiRequest) -> Result<TextStream> {
        let url = format!("{}?alt=sse", self.api_url("streamGenerateContent"));

        let request_json = serde_json::to_string(request)
            .context("Failed to serialize Gemini streaming request")?;
        tracing::debug!("[Gemini] Streaming request JSON: {}", request_json);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .body(request_json)
            .send()
            .await
            .context("Failed to send streaming request to Gemini API")?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::error!("[Gemini] Streaming API error: {} - {}", status, error_text);
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        tracing::info!("[Gemini] Streaming response started");

        let byte_stream = response.bytes_stream();
        let stream_reader = StreamReader::new(
            byte_stream.map(|result| result.map_err(|e| std::io::Error::other(e.to_string()))),
        );
        let buf_reader = tokio::io::BufReader::new(stream_reader);

        let stream = async_stream::try_stream! {
            let mut lines = buf_reader.lines();
            let mut chunk_index: usize = 0;

            while let Some(line) = lines.next_line().await? {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim_start();
                if data.is_empty() {
                    continue;
                }

                let gemini_resp: GeminiResponse = match serde_json::from_str(data) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("[Gemini] Failed to parse streaming chunk: {}", e);
                        continue;
                    }
                };

                if let Some(reason) = gemini_resp.block_reason() {
                    Err::<(), _>(anyhow::anyhow!("Gemini blocked the prompt: {}", reason))?;
                }

                let Some(candidate) = gemini_resp.first_candidate() else {
                    continue;
                };

                let text = candidate.text();
                if !text.is_empty() {
                    chunk_index += 1;
                    yield text;
                }

                if let Some(ref reason) = candidate.finish_reason {
                    tracing::info!("[Gemini] Stream: finish_reason={}", reason);
                    if is_blocking_finish(reason) {
                        Err::<(), _>(anyhow::anyhow!(
                            "Gemini stopped the reply early (finish_reason={}) after {} chunks",
                            reason,
                            chunk_index
                        ))?;
                    }
                    break;
                }
            }

            tracing::info!("[Gemini] Stream: loop ended after {} text chunks", chunk_index);
            if chunk_index == 0 {
                Err::<(), _>(anyhow::anyhow!("Gemini returned an empty streamed reply"))?;
            }
        };

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// LlmProvider implementation
// ============================================================================

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, history: &[Turn]) -> Result<String> {
        tracing::info!("[Gemini] Sending message");
        tracing::debug!("[Gemini] Turns in history: {}", history.len());

        let request = self.build_request(history);
        let gemini_response = self.send_gemini_request(&request).await?;
        gemini_response.into_reply()
    }

    async fn generate_stream(&self, history: &[Turn]) -> Result<TextStream> {
        tracing::info!("[Gemini] Streaming message");
        tracing::debug!("[Gemini] Turns in history: {}", history.len());

        let request = self.build_request(history);
        self.send_gemini_streaming_request(&request).await
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
