//! Generator service: primary path with transient-failure fallback.
//!
//! Owns the optional remote client and the offline fallback, and decides
//! per call which one answers. The "permanently degraded" state (no primary
//! client could be constructed) is fixed at construction time and only read
//! afterward, so it needs no synchronization.

use tracing::{info, warn};

use crate::error::{ChartqlError, Result};
use crate::llm::groq::is_transient_message;
use crate::llm::{FallbackGenerator, SqlGenerator};

/// Routes generation calls to the primary client, falling back to the
/// deterministic offline generator on transient failures.
pub struct GeneratorService {
    /// Primary remote client; `None` means permanently degraded.
    primary: Option<Box<dyn SqlGenerator>>,
    fallback: FallbackGenerator,
}

impl GeneratorService {
    /// Creates a service with a working primary generator.
    pub fn new(primary: Box<dyn SqlGenerator>) -> Self {
        Self {
            primary: Some(primary),
            fallback: FallbackGenerator::new(),
        }
    }

    /// Creates a permanently degraded service that always uses the fallback.
    ///
    /// Used when the primary client could not be constructed at startup,
    /// typically because no API key was configured.
    pub fn degraded() -> Self {
        warn!("Primary SQL generator unavailable; every request will use the offline fallback");
        Self {
            primary: None,
            fallback: FallbackGenerator::new(),
        }
    }

    /// Returns true if the primary path is permanently unavailable.
    pub fn is_degraded(&self) -> bool {
        self.primary.is_none()
    }

    /// Generates SQL directly from the fallback, bypassing the primary path.
    ///
    /// The orchestrator uses this for its one execution-failure retry.
    pub fn fallback_sql(&self, prompt: &str) -> String {
        self.fallback.fallback_sql(prompt)
    }

    /// Generates SQL for the prompt.
    ///
    /// Transient primary failures (network, timeout, rate limit) are
    /// absorbed by the fallback; any other primary failure propagates as a
    /// fatal generation error.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let primary = match &self.primary {
            Some(primary) => primary,
            None => return Ok(self.fallback.fallback_sql(prompt)),
        };

        match primary.generate_sql(prompt).await {
            Ok(sql) => {
                info!("Generated SQL from primary model");
                Ok(sql)
            }
            Err(e) if is_transient(&e) => {
                warn!("Primary generator failed transiently: {e}");
                Ok(self.fallback.fallback_sql(prompt))
            }
            Err(e) => Err(e),
        }
    }
}

/// Decides whether a generation error is transient.
///
/// Prefers the structured error category; the message-substring heuristic is
/// a last resort for errors that arrive without one.
fn is_transient(error: &ChartqlError) -> bool {
    match error {
        ChartqlError::TransientGeneration(_) => true,
        ChartqlError::Generation(msg) => is_transient_message(msg),
        _ => false,
    }
}
