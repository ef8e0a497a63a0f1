//! ChartQL turns natural-language questions into safe read-only SQL against
//! a fixed schema, executes it, and picks a chart for the result.
//!
//! The core is the [`pipeline::QueryOrchestrator`]: prompt construction from
//! schema context, generation via a remote model with a deterministic offline
//! fallback, SQL sanitization and safety validation, execution-failure
//! recovery, and chart inference/rendering.

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod schema;
pub mod sql;
pub mod table;

pub use error::{ChartqlError, Result};
pub use pipeline::{PipelineResult, QueryOrchestrator};
