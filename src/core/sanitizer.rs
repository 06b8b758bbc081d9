//! Upload validation and CSV ingestion.
//!
//! Raw bytes are decoded, size-checked, scanned for command-execution
//! formulas, stripped of leading spreadsheet formulas and finally parsed into
//! a [`Table`] whose cells are the text content left after HTML parsing.

use crate::config::{DuplicateHeaderPolicy, IngestConfig};
use crate::domain::model::{Column, Table};
use crate::utils::error::{AnalyzerError, Result};
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;

/// One or more `=FUNC(...)` formulas at the start of a line.
static FORMULA_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:=[+-]?[A-Z]+\([^\n]*?\))+").expect("valid formula pattern")
});

static DANGEROUS_FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)=(?:!|\||cmd|powershell)").expect("valid command pattern")
});

/// Elements whose text is not human-readable content.
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "iframe", "noscript", "template"];

/// Decoded upload text that passed every security check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedText(String);

impl SanitizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn ingest(&self, raw: &[u8]) -> Result<Table> {
        let text = self.sanitize(raw)?;
        let table = self.parse(&text)?;
        tracing::info!(
            "✅ Datos cargados: {} registros, {} columnas",
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }

    pub fn sanitize(&self, raw: &[u8]) -> Result<SanitizedText> {
        let content = String::from_utf8(raw.to_vec()).inspect_err(|e| {
            tracing::warn!("❌ Upload rejected, invalid UTF-8 at byte {}", e.utf8_error().valid_up_to());
        })?;

        // The ceiling applies to the decoded character count, not the raw byte length.
        let size = content.chars().count();
        if size > self.config.max_size {
            tracing::warn!("❌ Upload rejected: {} characters > {}", size, self.config.max_size);
            return Err(AnalyzerError::SizeLimitError {
                size,
                limit: self.config.max_size,
            });
        }

        // Scanned before stripping so a leading `=CMD(...)` rejects the file
        // instead of disappearing with the formula prefix.
        if let Some(found) = DANGEROUS_FORMULA.find(&content) {
            tracing::warn!("❌ Upload rejected, dangerous formula '{}'", found.as_str());
            return Err(AnalyzerError::SecurityError {
                pattern: found.as_str().to_string(),
            });
        }

        let stripped = FORMULA_PREFIX.replace_all(&content, "");
        if stripped.len() != content.len() {
            tracing::debug!("🧹 Stripped leading formulas ({} bytes)", content.len() - stripped.len());
        }

        Ok(SanitizedText(stripped.into_owned()))
    }

    pub fn parse(&self, text: &SanitizedText) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_str().as_bytes());

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(AnalyzerError::ParseError {
                message: "No columns to parse from file".to_string(),
            });
        }

        let names = self.column_names(headers.iter())?;
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > names.len() {
                // header is line 1
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(index as u64 + 2);
                return Err(AnalyzerError::ParseError {
                    message: format!(
                        "Expected {} fields in line {}, saw {}",
                        names.len(),
                        line,
                        record.len()
                    ),
                });
            }
            for (column, cell) in cells.iter_mut().enumerate() {
                cell.push(strip_markup(record.get(column).unwrap_or("")));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::new(name, cells))
            .collect();
        Table::new(columns)
    }

    fn column_names<'a>(&self, headers: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();

        for header in headers {
            let name = header.trim().to_string();
            if seen.contains(&name) {
                match self.config.duplicate_headers {
                    DuplicateHeaderPolicy::Reject => {
                        return Err(AnalyzerError::ColumnAmbiguityError { column: name });
                    }
                    DuplicateHeaderPolicy::Rename => {
                        let renamed = (1..)
                            .map(|n| format!("{}.{}", name, n))
                            .find(|candidate| !seen.contains(candidate))
                            .unwrap_or_else(|| name.clone());
                        tracing::debug!("Duplicate column '{}' renamed to '{}'", name, renamed);
                        seen.insert(renamed.clone());
                        names.push(renamed);
                    }
                }
            } else {
                seen.insert(name.clone());
                names.push(name);
            }
        }

        Ok(names)
    }
}

/// Sanitizes with the default ingest settings.
pub fn sanitize(raw: &[u8]) -> Result<SanitizedText> {
    Ingestor::default().sanitize(raw)
}

/// Removes markup, keeping the readable text. Tags left open at the end of a
/// cell are dropped along with their attributes. Repeats until nothing
/// changes, since decoded entities or fragments like `<<b>b>` can form new tags.
pub fn strip_markup(cell: &str) -> String {
    let mut current = cell.to_string();
    while current.contains(|c: char| c == '<' || c == '&') {
        let cleaned = text_content(&current);
        if cleaned == current {
            break;
        }
        current = cleaned;
    }
    current
}

fn text_content(cell: &str) -> String {
    let fragment = Html::parse_fragment(cell);
    let text: String = fragment
        .root_element()
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
            })
        })
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .collect();
    text
}
