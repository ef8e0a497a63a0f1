//! Groq LLM client implementation.
//!
//! Implements the `SqlGenerator` trait against Groq's OpenAI-compatible chat
//! completions API. Failures are split into transient
//! (network/timeout/rate-limit) and fatal so the generator service can
//! decide whether to fall back.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ChartqlError, Result};
use crate::llm::SqlGenerator;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Groq chat completions endpoint.
const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq client configuration.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl GroqConfig {
    /// Creates a new config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Groq-backed SQL generator.
#[derive(Debug, Clone)]
pub struct GroqClient {
    config: GroqConfig,
    client: Client,
}

impl GroqClient {
    /// Creates a new Groq client with the given configuration.
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChartqlError::generation(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Maps an API error response to a pipeline error.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> ChartqlError {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ChartqlError::generation("Authentication failed. Check your GROQ_API_KEY.");
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return ChartqlError::transient("Rate limited by the Groq API (HTTP 429).");
        }

        let message = serde_json::from_str::<GroqErrorResponse>(body)
            .map(|r| r.error.message)
            .unwrap_or_else(|_| body.to_string());

        if status.is_server_error() || is_transient_message(&message) {
            ChartqlError::transient(format!("Groq API error ({status}): {message}"))
        } else {
            ChartqlError::generation(format!("Groq API error ({status}): {message}"))
        }
    }
}

/// Substring heuristic for transience, used where no structured signal is
/// available. The matched keyword set is part of the observable fallback
/// behavior.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["connection refused", "timed out", "timeout", "dns", "429", "rate limit",
        "too many requests", "network"]
        .iter()
        .any(|kw| lower.contains(kw))
}

#[async_trait]
impl SqlGenerator for GroqClient {
    async fn generate_sql(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!(model = %self.config.model, "Sending generation request to Groq");

        let response = self
            .client
            .post(GROQ_API_URL)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChartqlError::transient("Request to Groq API timed out.")
                } else if e.is_connect() {
                    ChartqlError::transient(format!("Failed to connect to Groq API: {e}"))
                } else {
                    ChartqlError::generation(format!("Groq request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChartqlError::generation(format!("Failed to read Groq response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ChartqlError::generation(format!("Failed to parse Groq response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| ChartqlError::generation("No choices in Groq response"))
    }
}

// Groq API types (OpenAI-compatible subset).

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct GroqErrorResponse {
    error: GroqError,
}

#[derive(Debug, Deserialize)]
struct GroqError {
    message: String,
}
