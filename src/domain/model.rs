use crate::utils::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Only empty cells count as missing; whitespace is a value.
pub fn is_missing(cell: &str) -> bool {
    cell.is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Numeric view of the column; missing or unparseable cells are `None`.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.cells
            .iter()
            .map(|cell| {
                if is_missing(cell) {
                    None
                } else {
                    cell.trim().parse::<f64>().ok()
                }
            })
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|cell| is_missing(cell)).count()
    }
}

/// Column-major table. All columns hold the same number of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        if let Some(column) = columns.iter().find(|c| c.cells.len() != row_count) {
            return Err(AnalyzerError::ParseError {
                message: format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.cells.len(),
                    row_count
                ),
            });
        }
        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|c| c.cells.get(row))
            .map(String::as_str)
    }

    /// Leading rows as JSON objects keyed by column name. Missing cells become `null`.
    pub fn head_records(&self, n: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        (0..self.row_count.min(n))
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| {
                        let cell = &column.cells[row];
                        let value = if is_missing(cell) {
                            serde_json::Value::Null
                        } else {
                            serde_json::Value::String(cell.clone())
                        };
                        (column.name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Numeric,
    Date { format: &'static str },
    Text,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Numeric => "numeric",
            ColumnRole::Date { .. } => "date",
            ColumnRole::Text => "text",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedColumn {
    pub name: String,
    pub role: ColumnRole,
    pub is_price: bool,
}

/// Role of every column, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Classification {
    pub columns: Vec<ClassifiedColumn>,
}

impl Classification {
    fn names_where(&self, keep: impl Fn(&ClassifiedColumn) -> bool) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| keep(c))
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn numeric(&self) -> Vec<&str> {
        self.names_where(|c| c.role == ColumnRole::Numeric)
    }

    pub fn text(&self) -> Vec<&str> {
        self.names_where(|c| c.role == ColumnRole::Text)
    }

    pub fn date(&self) -> Vec<&str> {
        self.names_where(|c| matches!(c.role, ColumnRole::Date { .. }))
    }

    pub fn price(&self) -> Vec<&str> {
        self.names_where(|c| c.is_price)
    }

    /// Table indices of the columns with the given role, in table order.
    pub fn indices(&self, role: ColumnRole) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.role == role)
            .map(|(i, _)| i)
    }

    pub fn price_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_price)
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub highlight: bool,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            highlight: false,
        }
    }

    pub fn highlighted(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            highlight: true,
            ..Self::new(label, value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub title: String,
    pub metrics: Vec<Metric>,
}

impl Answer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            metrics: Vec::new(),
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn metric(&self, label: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value.as_str())
    }

    /// Result box markup. Every value coming from the table is escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class='result-box'>\n");
        html.push_str(&format!("    <h3>{}</h3>\n", escape_html(&self.title)));
        for metric in &self.metrics {
            let class = if metric.highlight {
                " class='highlight'"
            } else {
                ""
            };
            html.push_str(&format!(
                "    <p{}><b>{}:</b> {}</p>\n",
                class,
                escape_html(&metric.label),
                escape_html(&metric.value)
            ));
        }
        html.push_str("</div>");
        html
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for metric in &self.metrics {
            write!(f, "\n  {}: {}", metric.label, metric.value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Answer(Answer),
    /// No heuristic applies; the caller may ask the fallback assistant.
    NoMatch,
    /// A heuristic failed; shown inline, the session stays usable.
    Error(String),
}

/// What the fallback assistant gets to see of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackContext {
    pub columns: Vec<String>,
    pub sample: Vec<serde_json::Map<String, serde_json::Value>>,
    pub question: String,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
