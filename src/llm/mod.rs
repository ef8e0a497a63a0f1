//! SQL generation via LLM.
//!
//! Provides the generator trait, the remote Groq-backed client, the
//! deterministic offline fallback, and the service that routes between them.

pub mod fallback;
pub mod groq;
pub mod mock;
pub mod prompt;
pub mod service;

pub use fallback::{FallbackGenerator, FALLBACK_SQL};
pub use groq::{GroqClient, GroqConfig, DEFAULT_MODEL};
pub use mock::MockGenerator;
pub use prompt::{build_few_shot_prompt, build_sql_prompt, FewShotExample};
pub use service::GeneratorService;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for clients that turn a prompt into SQL text.
///
/// Implementations must be thread-safe (Send + Sync): one generator instance
/// is shared across all concurrent pipeline invocations.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generates SQL text for the given prompt.
    ///
    /// Remote implementations fail with `ChartqlError::TransientGeneration`
    /// for network/timeout/rate-limit conditions and
    /// `ChartqlError::Generation` for everything else.
    async fn generate_sql(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_implements_trait() {
        let generator: Box<dyn SqlGenerator> = Box::new(MockGenerator::returning("SELECT 1;"));
        let sql = generator.generate_sql("any prompt").await.unwrap();
        assert_eq!(sql, "SELECT 1;");
    }
}
