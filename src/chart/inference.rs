//! Deterministic chart-type inference from a result table's shape.

use tracing::debug;

use crate::chart::{ChartKind, ChartSpec};
use crate::table::ResultTable;

/// Column names treated as a time axis (case-insensitive exact match).
const TIME_LIKE_COLUMNS: &[&str] = &["date", "usage_date", "year", "month", "billing_cycle"];

/// Picks a chart kind and axis mapping for a result table.
///
/// The decision is a fixed ordered rule list; the first matching rule wins,
/// so the same table always produces the same spec. The question and SQL are
/// accepted for future refinement but do not influence the current rules.
pub fn infer_chart(table: &ResultTable, _question: &str, _sql: &str) -> ChartSpec {
    if table.row_count() > 0 && table.is_all_null() {
        return ChartSpec::of_kind(ChartKind::Table)
            .with_title("No data available for the selected query or filters");
    }

    if table.is_empty() || table.column_count() == 0 {
        return ChartSpec::of_kind(ChartKind::Table).with_title("No data returned");
    }

    let numeric = table.numeric_columns();
    let categorical = table.categorical_columns();
    let time_like: Vec<&str> = table
        .columns()
        .iter()
        .map(|col| col.name.as_str())
        .filter(|name| is_time_like(name))
        .collect();

    if let (Some(&x), Some(&y)) = (time_like.first(), numeric.first()) {
        debug!(x, y, "Inferred time-series line chart");
        let mut spec = ChartSpec::of_kind(ChartKind::Line).with_title(format!("{y} over {x}"));
        spec.x = Some(x.to_string());
        spec.y = vec![y.to_string()];
        spec.x_label = Some(x.to_string());
        spec.y_label = Some(y.to_string());
        spec.is_time_series = true;
        return spec;
    }

    if let (Some(&cat), Some(&metric)) = (categorical.first(), numeric.first()) {
        let distinct = table.distinct_count(cat);
        // Pie charts stop reading well past a handful of slices.
        if distinct <= 6 {
            let mut spec = ChartSpec::of_kind(ChartKind::Pie)
                .with_title(format!("Distribution of {metric} by {cat}"));
            spec.x = Some(cat.to_string());
            spec.y = vec![metric.to_string()];
            return spec;
        }
        let mut spec =
            ChartSpec::of_kind(ChartKind::Bar).with_title(format!("{metric} by {cat}"));
        spec.x = Some(cat.to_string());
        spec.y = vec![metric.to_string()];
        spec.x_label = Some(cat.to_string());
        spec.y_label = Some(metric.to_string());
        return spec;
    }

    if numeric.len() >= 2 {
        let (x, y) = (numeric[0], numeric[1]);
        let mut spec = ChartSpec::of_kind(ChartKind::Scatter).with_title(format!("{y} vs {x}"));
        spec.x = Some(x.to_string());
        spec.y = vec![y.to_string()];
        return spec;
    }

    if numeric.len() == 1 {
        let metric = numeric[0];
        let mut spec =
            ChartSpec::of_kind(ChartKind::Histogram).with_title(format!("Distribution of {metric}"));
        spec.x = Some(metric.to_string());
        spec.x_label = Some(metric.to_string());
        return spec;
    }

    ChartSpec::of_kind(ChartKind::Table).with_title("Query result")
}

fn is_time_like(name: &str) -> bool {
    let lower = name.to_lowercase();
    TIME_LIKE_COLUMNS.contains(&lower.as_str())
}
