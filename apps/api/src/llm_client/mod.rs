/// LLM Client — the single point of entry for every generative call in the service.
///
/// ARCHITECTURAL RULE: extraction and tailoring never talk HTTP to a model directly.
/// They receive an `Arc<dyn ChatProvider>` and go through `call_tool`.
///
/// The concrete provider is any OpenAI-compatible chat-completions endpoint with
/// function-tool support. When no key is configured, `UnconfiguredProvider` answers
/// every call with `LlmError::NoProvider`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

#[cfg(test)]
pub mod fake;
pub mod prompts;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No AI provider configured. Set OPENAI_API_KEY (recommended) or AI_GATEWAY_API_KEY.")]
    NoProvider,
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A function tool the model is forced to call. `parameters` is a JSON schema.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Overrides the provider's default model when set.
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tool: Option<ToolSpec>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ChatRequest {
    pub fn with_tool(
        system: impl Into<String>,
        user: impl Into<String>,
        tool: ToolSpec,
        timeout: Duration,
    ) -> Self {
        Self {
            model: None,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            tool: Some(tool),
            temperature: 0.0,
            timeout,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool.as_ref().map(|t| t.name)
    }

    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// What came back from a provider: either structured tool arguments or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCompletion {
    ToolCall { name: String, arguments: String },
    Text(String),
}

/// The provider seam. Carried in `AppState` as `Arc<dyn ChatProvider>` so tests can
/// substitute a deterministic fake.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short label used in logs and diagnostics ("openai", "gateway", "unconfigured", ...).
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError>;
}

/// Calls the provider and deserializes the forced tool's arguments.
/// Falls back to parsing a text reply as JSON when the model ignored the tool.
pub async fn call_tool<T: DeserializeOwned>(
    provider: &dyn ChatProvider,
    request: &ChatRequest,
) -> Result<T, LlmError> {
    let completion = provider.complete(request).await?;
    let raw = match &completion {
        ChatCompletion::ToolCall { arguments, .. } => arguments.as_str(),
        ChatCompletion::Text(text) => strip_json_fences(text),
    };
    if raw.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(raw).map_err(LlmError::Parse)
}

/// Builds the provider for the given configuration.
pub fn provider_from_config(
    config: Option<&ProviderConfig>,
) -> Result<Arc<dyn ChatProvider>, LlmError> {
    match config {
        Some(cfg) => Ok(Arc::new(LlmClient::new(cfg.clone())?)),
        None => Ok(Arc::new(UnconfiguredProvider)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Unconfigured provider
// ────────────────────────────────────────────────────────────────────────────

pub struct UnconfiguredProvider;

#[async_trait]
impl ChatProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        Err(LlmError::NoProvider)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible chat-completions client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Wraps an OpenAI-compatible chat-completions endpoint with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: ProviderConfig,
}

impl LlmClient {
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()?,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn body<'a>(&'a self, request: &'a ChatRequest) -> CompletionsRequest<'a> {
        let tools = request.tool.as_ref().map(|t| {
            vec![serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })]
        });
        let tool_choice = request.tool.as_ref().map(|t| {
            serde_json::json!({ "type": "function", "function": { "name": t.name } })
        });
        CompletionsRequest {
            model: request.model.as_deref().unwrap_or(&self.config.model),
            messages: &request.messages,
            temperature: request.temperature,
            tools,
            tool_choice,
        }
    }
}

#[async_trait]
impl ChatProvider for LlmClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    /// Retries on 429 (rate limit), 5xx and connection errors with exponential backoff.
    /// Timeouts are returned immediately; the caller owns the attempt budget for those.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        let body = self.body(request);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Provider call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.config.url)
                .bearer_auth(&self.config.api_key)
                .timeout(request.timeout)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() => return Err(LlmError::Timeout(request.timeout)),
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Provider returned {}: {}", status, truncate(&body, 300));
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: truncate(&body, 300),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or_else(|_| truncate(&body, 300));
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: CompletionsResponse = match response.json().await {
                Ok(p) => p,
                Err(e) if e.is_timeout() => return Err(LlmError::Timeout(request.timeout)),
                Err(e) => return Err(LlmError::Http(e)),
            };

            if let Some(usage) = &parsed.usage {
                debug!(
                    "Provider call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            let message = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .ok_or(LlmError::EmptyContent)?;

            if let Some(call) = message.tool_calls.into_iter().next() {
                return Ok(ChatCompletion::ToolCall {
                    name: call.function.name,
                    arguments: call.function.arguments,
                });
            }
            return match message.content {
                Some(text) if !text.trim().is_empty() => Ok(ChatCompletion::Text(text)),
                _ => Err(LlmError::EmptyContent),
            };
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeProvider, FakeReply};
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        key: String,
    }

    fn tool() -> ToolSpec {
        ToolSpec {
            name: "demo",
            description: "demo tool",
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_request_body_forces_tool_choice() {
        let client = LlmClient::new(ProviderConfig {
            name: "openai".into(),
            url: "http://localhost".into(),
            api_key: "k".into(),
            model: "gpt-4o-mini".into(),
        })
        .unwrap();
        let req = ChatRequest::with_tool("sys", "user", tool(), Duration::from_secs(5));
        let body = serde_json::to_value(client.body(&req)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["tool_choice"]["function"]["name"], "demo");
        assert_eq!(body["tools"][0]["function"]["name"], "demo");
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn test_call_tool_parses_tool_arguments() {
        let provider = FakeProvider::scripted(vec![FakeReply::tool(serde_json::json!({"key": "v"}))]);
        let req = ChatRequest::with_tool("s", "u", tool(), Duration::from_secs(1));
        let out: Payload = call_tool(&provider, &req).await.unwrap();
        assert_eq!(out.key, "v");
    }

    #[tokio::test]
    async fn test_call_tool_accepts_fenced_text_reply() {
        let provider =
            FakeProvider::scripted(vec![FakeReply::Text("```json\n{\"key\":\"t\"}\n```".into())]);
        let req = ChatRequest::with_tool("s", "u", tool(), Duration::from_secs(1));
        let out: Payload = call_tool(&provider, &req).await.unwrap();
        assert_eq!(out.key, "t");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_reports_no_provider() {
        let req = ChatRequest::with_tool("s", "u", tool(), Duration::from_secs(1));
        let err = call_tool::<Payload>(&UnconfiguredProvider, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NoProvider));
    }
}
