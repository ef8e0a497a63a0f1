//! Chart selection and rendering.
//!
//! [`infer_chart`] maps a result table to a [`ChartSpec`]; the render side
//! turns a spec into a backend configuration and a shareable URL.

mod inference;
mod render;

pub use inference::infer_chart;
pub use render::{render, BackendKind, ChartBackend, ChartPayload, QuickChartBackend};

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a result table should be visualized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Scatter,
    Histogram,
    Table,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
            ChartKind::Table => "table",
        };
        f.write_str(name)
    }
}

/// A chart decision: kind plus axis mapping. Produced once per query and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Vec<String>,
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub is_time_series: bool,
}

impl ChartSpec {
    /// A bare spec of the given kind with no axis mapping.
    pub fn of_kind(kind: ChartKind) -> Self {
        Self {
            kind,
            x: None,
            y: Vec::new(),
            title: None,
            x_label: None,
            y_label: None,
            is_time_series: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
