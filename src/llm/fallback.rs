//! Deterministic offline fallback generator.
//!
//! Used when the remote generator is unavailable or fails transiently.
//! Returns a fixed safe statement in the single-cell "message" shape that
//! the orchestrator short-circuits into a user-facing notice.

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::llm::SqlGenerator;

/// Length of the prompt excerpt included in the log line.
const LOG_PROMPT_CHARS: usize = 120;

/// The fixed statement the fallback always returns.
pub const FALLBACK_SQL: &str = "SELECT 'LLM offline - cannot generate SQL for this question \
right now. Please try again later or contact the admin.' AS message;";

/// Pure, local, no-network SQL generator.
///
/// Never fails and never inspects the prompt beyond logging a truncated
/// copy. Two calls with different prompts return identical SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    /// Creates a new fallback generator.
    pub fn new() -> Self {
        Self
    }

    /// Returns the fixed fallback statement, logging a truncated prompt.
    pub fn fallback_sql(&self, prompt: &str) -> String {
        let truncated: String = prompt
            .chars()
            .take(LOG_PROMPT_CHARS)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        warn!(
            "Using fallback SQL generator (remote LLM unavailable). Prompt (truncated): {}",
            truncated
        );
        FALLBACK_SQL.to_string()
    }
}

#[async_trait]
impl SqlGenerator for FallbackGenerator {
    async fn generate_sql(&self, prompt: &str) -> Result<String> {
        Ok(self.fallback_sql(prompt))
    }
}
