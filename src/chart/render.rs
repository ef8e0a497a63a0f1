//! Chart rendering backends.
//!
//! A [`ChartBackend`] turns a table plus a [`ChartSpec`] into a renderer
//! configuration and a shareable URL. QuickChart is the one shipped backend;
//! adding another means adding a [`BackendKind`] variant and an impl, not
//! branching on strings.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use url::Url;

use crate::chart::{ChartKind, ChartSpec};
use crate::table::{ResultTable, Value};

/// Hosted chart-image endpoint; the config rides in the `c` query parameter.
const QUICKCHART_BASE_URL: &str = "https://quickchart.io/chart";

/// Shipped rendering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    QuickChart,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::QuickChart => "quickchart",
        }
    }
}

/// A rendered chart: backend id, the configuration it was built from, a
/// shareable URL (empty string when there is nothing to draw) and an
/// optional user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPayload {
    pub backend: BackendKind,
    pub config: Json,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChartPayload {
    /// True when no drawable chart was produced.
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// Renders a chart decision against a concrete backend.
pub trait ChartBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn render(&self, table: &ResultTable, spec: &ChartSpec) -> ChartPayload;

    /// Payload carrying a user-facing message instead of a chart. The config
    /// embeds the message as a one-row table.
    fn message_payload(&self, message: &str) -> ChartPayload {
        ChartPayload {
            backend: self.kind(),
            config: json!({
                "type": "table",
                "data": {"rows": [{"message": message}]},
            }),
            url: String::new(),
            message: Some(message.to_string()),
        }
    }

    /// Payload for a query that returned no rows: the empty-table config
    /// with the message riding alongside, not embedded as a row.
    fn empty_payload(&self, message: &str) -> ChartPayload {
        ChartPayload {
            backend: self.kind(),
            config: json!({"type": "table", "data": {}}),
            url: String::new(),
            message: Some(message.to_string()),
        }
    }
}

/// Renders a table with the given spec on the given backend.
pub fn render(table: &ResultTable, spec: &ChartSpec, backend: &dyn ChartBackend) -> ChartPayload {
    backend.render(table, spec)
}

/// Backend producing Chart.js configurations hosted on quickchart.io.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickChartBackend;

impl ChartBackend for QuickChartBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::QuickChart
    }

    fn render(&self, table: &ResultTable, spec: &ChartSpec) -> ChartPayload {
        let config = match spec.kind {
            ChartKind::Line | ChartKind::Bar => axis_chart_config(table, spec),
            ChartKind::Pie => pie_config(table, spec),
            ChartKind::Histogram => histogram_config(table, spec),
            ChartKind::Scatter => scatter_config(table, spec),
            ChartKind::Table => json!({"type": "table", "data": {}}),
        };

        // The empty table config is the "no chart" signal; callers rely on
        // the URL being empty in that case.
        let url = if spec.kind == ChartKind::Table {
            String::new()
        } else {
            chart_url(&config)
        };

        ChartPayload {
            backend: BackendKind::QuickChart,
            config,
            url,
            message: None,
        }
    }
}

fn chart_url(config: &Json) -> String {
    let mut url = Url::parse(QUICKCHART_BASE_URL).expect("base URL is valid");
    url.query_pairs_mut().append_pair("c", &config.to_string());
    url.into()
}

fn title_options(spec: &ChartSpec) -> Json {
    json!({"title": {"display": true, "text": spec.title.clone().unwrap_or_default()}})
}

fn axis_titles(x: &str, y: &str) -> Json {
    json!({
        "x": {"title": {"display": true, "text": x}},
        "y": {"title": {"display": true, "text": y}},
    })
}

fn labels_for(table: &ResultTable, column: &str) -> Vec<String> {
    table
        .column_values(column)
        .into_iter()
        .map(Value::to_display_string)
        .collect()
}

fn series_for(table: &ResultTable, column: &str) -> Vec<Json> {
    table
        .column_values(column)
        .into_iter()
        .map(|v| v.as_f64().map_or(Json::Null, |n| json!(n)))
        .collect()
}

fn axis_chart_config(table: &ResultTable, spec: &ChartSpec) -> Json {
    let x = spec.x.as_deref().unwrap_or_default();
    let labels = labels_for(table, x);
    let datasets: Vec<Json> = spec
        .y
        .iter()
        .map(|metric| json!({"label": metric, "data": series_for(table, metric)}))
        .collect();

    let x_label = spec.x_label.as_deref().unwrap_or(x);
    let y_label = spec
        .y_label
        .as_deref()
        .or_else(|| spec.y.first().map(String::as_str))
        .unwrap_or_default();

    json!({
        "type": spec.kind.to_string(),
        "data": {"labels": labels, "datasets": datasets},
        "options": {
            "plugins": title_options(spec),
            "scales": axis_titles(x_label, y_label),
        },
    })
}

fn pie_config(table: &ResultTable, spec: &ChartSpec) -> Json {
    let x = spec.x.as_deref().unwrap_or_default();
    let metric = spec.y.first().map(String::as_str).unwrap_or_default();

    json!({
        "type": "pie",
        "data": {
            "labels": labels_for(table, x),
            "datasets": [{"label": metric, "data": series_for(table, metric)}],
        },
        "options": {"plugins": title_options(spec)},
    })
}

fn histogram_config(table: &ResultTable, spec: &ChartSpec) -> Json {
    let x = spec.x.as_deref().unwrap_or_default();

    // Distinct-value binning: count occurrences per value, ordered by the
    // value itself (numerically where the values are numeric).
    let mut counts: Vec<(String, Option<f64>, u64)> = Vec::new();
    for value in table.column_values(x) {
        let label = value.to_display_string();
        match counts.iter_mut().find(|(l, _, _)| *l == label) {
            Some(entry) => entry.2 += 1,
            None => counts.push((label, value.as_f64(), 1)),
        }
    }
    counts.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.0.cmp(&b.0),
    });

    let labels: Vec<&str> = counts.iter().map(|(l, _, _)| l.as_str()).collect();
    let data: Vec<u64> = counts.iter().map(|(_, _, c)| *c).collect();
    let x_label = spec.x_label.as_deref().unwrap_or(x);

    json!({
        "type": "bar",
        "data": {
            "labels": labels,
            "datasets": [{"label": "Count", "data": data}],
        },
        "options": {
            "plugins": title_options(spec),
            "scales": axis_titles(x_label, "Count"),
        },
    })
}

fn scatter_config(table: &ResultTable, spec: &ChartSpec) -> Json {
    let x = spec.x.as_deref().unwrap_or_default();
    let y = spec.y.first().map(String::as_str).unwrap_or_default();

    let xs = table.column_values(x);
    let ys = table.column_values(y);
    let points: Vec<Json> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(vx, vy)| match (vx.as_f64(), vy.as_f64()) {
            (Some(px), Some(py)) => Some(json!({"x": px, "y": py})),
            _ => None,
        })
        .collect();

    json!({
        "type": "scatter",
        "data": {"datasets": [{"label": format!("{y} vs {x}"), "data": points}]},
        "options": {
            "plugins": title_options(spec),
            "scales": axis_titles(x, y),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::infer_chart;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultTable {
        ResultTable::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_line_chart_config_and_url() {
        let t = table(
            &["month", "revenue"],
            vec![
                vec![Value::Text("2024-01".into()), Value::Float(10.0)],
                vec![Value::Text("2024-02".into()), Value::Float(12.5)],
            ],
        );
        let spec = infer_chart(&t, "", "");
        let payload = render(&t, &spec, &QuickChartBackend);

        assert_eq!(payload.backend, BackendKind::QuickChart);
        assert_eq!(payload.config["type"], "line");
        assert_eq!(payload.config["data"]["labels"][0], "2024-01");
        assert_eq!(payload.config["data"]["datasets"][0]["label"], "revenue");
        assert!(payload.url.starts_with("https://quickchart.io/chart?c="));
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_table_kind_has_empty_url() {
        let t = ResultTable::empty();
        let spec = infer_chart(&t, "", "");
        let payload = render(&t, &spec, &QuickChartBackend);

        assert_eq!(payload.config, json!({"type": "table", "data": {}}));
        assert_eq!(payload.url, "");
        assert!(payload.is_empty());
    }

    #[test]
    fn test_histogram_bins_by_distinct_value() {
        let t = table(
            &["gb"],
            vec![
                vec![Value::Int(10)],
                vec![Value::Int(2)],
                vec![Value::Int(10)],
            ],
        );
        let spec = infer_chart(&t, "", "");
        let payload = render(&t, &spec, &QuickChartBackend);

        // Numeric ordering, not lexical: 2 before 10.
        assert_eq!(payload.config["type"], "bar");
        assert_eq!(payload.config["data"]["labels"], json!(["2", "10"]));
        assert_eq!(payload.config["data"]["datasets"][0]["data"], json!([1, 2]));
        assert_eq!(payload.config["data"]["datasets"][0]["label"], "Count");
    }

    #[test]
    fn test_scatter_pairs_numeric_points() {
        let t = table(
            &["height", "weight"],
            vec![
                vec![Value::Float(1.7), Value::Float(70.0)],
                vec![Value::Null, Value::Float(80.0)],
            ],
        );
        let spec = infer_chart(&t, "", "");
        let payload = render(&t, &spec, &QuickChartBackend);

        let points = payload.config["data"]["datasets"][0]["data"]
            .as_array()
            .unwrap();
        // The row with a null x is dropped rather than plotted at zero.
        assert_eq!(points.len(), 1);
        assert_eq!(points[0], json!({"x": 1.7, "y": 70.0}));
    }

    #[test]
    fn test_pie_config() {
        let t = table(
            &["plan", "amount"],
            vec![
                vec![Value::Text("basic".into()), Value::Int(3)],
                vec![Value::Text("pro".into()), Value::Int(5)],
            ],
        );
        let spec = infer_chart(&t, "", "");
        let payload = render(&t, &spec, &QuickChartBackend);

        assert_eq!(payload.config["type"], "pie");
        assert_eq!(payload.config["data"]["labels"], json!(["basic", "pro"]));
    }

    #[test]
    fn test_message_payload() {
        let payload = QuickChartBackend.message_payload("nothing to see");
        assert!(payload.is_empty());
        assert_eq!(payload.message.as_deref(), Some("nothing to see"));
        assert_eq!(
            payload.config["data"]["rows"][0]["message"],
            "nothing to see"
        );
    }

    #[test]
    fn test_empty_payload_keeps_table_config_bare() {
        let payload = QuickChartBackend.empty_payload("No data to display");
        assert!(payload.is_empty());
        assert_eq!(payload.message.as_deref(), Some("No data to display"));
        assert_eq!(payload.config, json!({"type": "table", "data": {}}));
    }
}
