//! Mock SQL generator for testing.

use async_trait::async_trait;

use crate::error::{ChartqlError, Result};
use crate::llm::SqlGenerator;

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(String),
    FailTransient(String),
    FailFatal(String),
}

/// Generator stub with a fixed canned behavior.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    behavior: MockBehavior,
}

impl MockGenerator {
    /// Creates a mock that always returns the given SQL text.
    pub fn returning(sql: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Respond(sql.into()),
        }
    }

    /// Creates a mock that always fails with the given error.
    pub fn failing_with(error: ChartqlError) -> Self {
        let behavior = match error {
            ChartqlError::TransientGeneration(msg) => MockBehavior::FailTransient(msg),
            ChartqlError::Generation(msg) => MockBehavior::FailFatal(msg),
            other => MockBehavior::FailFatal(other.to_string()),
        };
        Self { behavior }
    }
}

#[async_trait]
impl SqlGenerator for MockGenerator {
    async fn generate_sql(&self, _prompt: &str) -> Result<String> {
        match &self.behavior {
            MockBehavior::Respond(sql) => Ok(sql.clone()),
            MockBehavior::FailTransient(msg) => Err(ChartqlError::transient(msg.clone())),
            MockBehavior::FailFatal(msg) => Err(ChartqlError::generation(msg.clone())),
        }
    }
}
