//! Keyword heuristics for the fixed set of questions answered locally.
//!
//! Rules are checked in priority order against the lower-cased question. The
//! first rule that both matches the wording and finds the columns it needs
//! produces the answer; a rule missing its columns passes to the next one.

use crate::domain::model::{
    is_missing, AnalysisResult, Answer, Classification, ColumnRole, Metric, Table,
};
use crate::utils::error::{AnalyzerError, Result};

const LONGEST_KEYWORDS: [&str; 3] = ["más largo", "mas largo", "longest"];

const CALORIE_KEYWORDS: [&str; 4] = ["calorías", "calorias", "calorie", "kcal"];
const CALORIE_COLUMN_KEYWORDS: [&str; 2] = ["calor", "kcal"];

const HIGH_KEYWORDS: [&str; 7] = [
    "mayor", "más alt", "mas alt", "máxim", "maxim", "highest", "most",
];

const MISSING_KEYWORDS: [&str; 7] = [
    "faltantes", "missing", "vacíos", "vacios", "nulos", "null", "empty",
];

const PRICE_QUESTION_KEYWORDS: [&str; 9] = [
    "precio", "costo", "valor", "price", "cost", "caro", "barat", "expensive", "cheap",
];
const PRICE_MAX_KEYWORDS: [&str; 7] = [
    "mayor", "más car", "mas car", "máxim", "maxim", "highest", "expensive",
];
const PRICE_MIN_KEYWORDS: [&str; 9] = [
    "menor", "más barat", "mas barat", "mínim", "minim", "económic", "economic", "lowest",
    "cheap",
];

const NAME_COLUMN_KEYWORDS: [&str; 2] = ["nombre", "name"];
const NOT_AVAILABLE: &str = "N/A";

fn contains_any(question: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| question.contains(keyword))
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the (lower-cased) question asks for this analysis.
    fn matches(&self, question: &str) -> bool;

    /// `Ok(None)` when the table lacks the columns this rule needs.
    fn answer(
        &self,
        table: &Table,
        classification: &Classification,
        question: &str,
    ) -> Result<Option<Answer>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Max,
    Min,
}

/// Row and value of the extreme, first occurrence on ties. NaN is skipped.
fn find_extreme(values: &[Option<f64>], extreme: Extreme) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (row, value) in values.iter().enumerate() {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            continue;
        };
        let better = match (best, extreme) {
            (None, _) => true,
            (Some((_, current)), Extreme::Max) => value > current,
            (Some((_, current)), Extreme::Min) => value < current,
        };
        if better {
            best = Some((row, value));
        }
    }
    best
}

fn name_column(table: &Table, classification: &Classification) -> Option<usize> {
    let mut text_columns = classification.indices(ColumnRole::Text);
    let first = text_columns.next()?;
    std::iter::once(first)
        .chain(text_columns)
        .find(|&index| {
            table
                .column(index)
                .map(|c| contains_any(&c.name.to_lowercase(), &NAME_COLUMN_KEYWORDS))
                .unwrap_or(false)
        })
        .or(Some(first))
}

fn companion_name(table: &Table, column: Option<usize>, row: usize) -> String {
    column
        .and_then(|index| table.cell(index, row))
        .filter(|cell| !is_missing(cell))
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn column_values(table: &Table, index: usize) -> Result<(&str, Vec<Option<f64>>)> {
    let column = table.column(index).ok_or_else(|| AnalyzerError::AnalysisError {
        message: format!("column {} out of range", index),
    })?;
    Ok((column.name.as_str(), column.numbers()))
}

/// Integers print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `$1,234.50` style, two decimals with thousands separators.
pub fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (integer, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("${}{}.{}", sign, grouped, decimals)
}

pub struct LongestTextRule;

impl Rule for LongestTextRule {
    fn name(&self) -> &'static str {
        "longest_text"
    }

    fn matches(&self, question: &str) -> bool {
        contains_any(question, &LONGEST_KEYWORDS)
    }

    fn answer(
        &self,
        table: &Table,
        classification: &Classification,
        _question: &str,
    ) -> Result<Option<Answer>> {
        let Some(index) = classification.indices(ColumnRole::Text).next() else {
            return Ok(None);
        };
        let Some(column) = table.column(index) else {
            return Ok(None);
        };

        let lengths: Vec<Option<f64>> = column
            .cells
            .iter()
            .map(|cell| (!is_missing(cell)).then(|| cell.chars().count() as f64))
            .collect();
        let (row, length) =
            find_extreme(&lengths, Extreme::Max).ok_or_else(|| AnalyzerError::AnalysisError {
                message: format!("column '{}' has no values", column.name),
            })?;

        Ok(Some(
            Answer::new(format!("📏 {} más largo", column.name))
                .with_metric(Metric::new("Nombre", column.cells[row].clone()))
                .with_metric(Metric::new(
                    "Longitud",
                    format!("{} caracteres", format_number(length)),
                )),
        ))
    }
}

pub struct CalorieRule;

impl Rule for CalorieRule {
    fn name(&self) -> &'static str {
        "max_calories"
    }

    fn matches(&self, question: &str) -> bool {
        contains_any(question, &CALORIE_KEYWORDS) && contains_any(question, &HIGH_KEYWORDS)
    }

    fn answer(
        &self,
        table: &Table,
        classification: &Classification,
        _question: &str,
    ) -> Result<Option<Answer>> {
        let calorie_column = classification.indices(ColumnRole::Numeric).find(|&index| {
            table
                .column(index)
                .map(|c| contains_any(&c.name.to_lowercase(), &CALORIE_COLUMN_KEYWORDS))
                .unwrap_or(false)
        });
        let Some(index) = calorie_column else {
            return Ok(None);
        };

        let (name, values) = column_values(table, index)?;
        let (row, calories) =
            find_extreme(&values, Extreme::Max).ok_or_else(|| AnalyzerError::AnalysisError {
                message: format!("column '{}' has no values", name),
            })?;
        let product = companion_name(table, name_column(table, classification), row);

        Ok(Some(
            Answer::new("🔥 Bebida/comida con más calorías")
                .with_metric(Metric::new("Nombre", product))
                .with_metric(Metric::highlighted("Calorías", format_number(calories))),
        ))
    }
}

pub struct MissingDataRule;

impl Rule for MissingDataRule {
    fn name(&self) -> &'static str {
        "missing_data"
    }

    fn matches(&self, question: &str) -> bool {
        contains_any(question, &MISSING_KEYWORDS)
    }

    fn answer(
        &self,
        table: &Table,
        _classification: &Classification,
        _question: &str,
    ) -> Result<Option<Answer>> {
        let metrics: Vec<Metric> = table
            .columns()
            .iter()
            .filter_map(|column| {
                let missing = column.missing_count();
                (missing > 0).then(|| Metric::highlighted(column.name.clone(), missing.to_string()))
            })
            .collect();

        if metrics.is_empty() {
            return Ok(Some(Answer::new("✅ No hay datos faltantes")));
        }

        let mut answer = Answer::new("⚠️ Datos faltantes");
        answer.metrics = metrics;
        Ok(Some(answer))
    }
}

pub struct PriceRule;

impl PriceRule {
    fn direction(question: &str) -> Option<Extreme> {
        if contains_any(question, &PRICE_MAX_KEYWORDS) {
            Some(Extreme::Max)
        } else if contains_any(question, &PRICE_MIN_KEYWORDS) {
            Some(Extreme::Min)
        } else {
            None
        }
    }
}

impl Rule for PriceRule {
    fn name(&self) -> &'static str {
        "price_extreme"
    }

    fn matches(&self, question: &str) -> bool {
        contains_any(question, &PRICE_QUESTION_KEYWORDS) && Self::direction(question).is_some()
    }

    fn answer(
        &self,
        table: &Table,
        classification: &Classification,
        question: &str,
    ) -> Result<Option<Answer>> {
        let Some(index) = classification.price_indices().next() else {
            return Ok(None);
        };
        let Some(extreme) = Self::direction(question) else {
            return Ok(None);
        };

        let (name, values) = column_values(table, index)?;
        let (row, price) = find_extreme(&values, extreme).ok_or_else(|| {
            AnalyzerError::AnalysisError {
                message: format!("column '{}' has no values", name),
            }
        })?;

        let name_index = name_column(table, classification);
        let subject = name_index
            .and_then(|i| table.column(i))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Producto".to_string());
        let title = match extreme {
            Extreme::Max => format!("💰 {} más caro", subject),
            Extreme::Min => format!("💸 {} más económico", subject),
        };

        Ok(Some(
            Answer::new(title)
                .with_metric(Metric::new("Nombre", companion_name(table, name_index, row)))
                .with_metric(Metric::highlighted("Precio", format_currency(price))),
        ))
    }
}

pub struct Router {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(vec![
            Box::new(LongestTextRule),
            Box::new(CalorieRule),
            Box::new(MissingDataRule),
            Box::new(PriceRule),
        ])
    }
}

impl Router {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn analyze(
        &self,
        table: &Table,
        classification: &Classification,
        question: &str,
    ) -> AnalysisResult {
        let question = question.to_lowercase();

        for rule in &self.rules {
            if !rule.matches(&question) {
                continue;
            }
            match rule.answer(table, classification, &question) {
                Ok(Some(answer)) => {
                    tracing::debug!("🎯 Rule '{}' answered", rule.name());
                    return AnalysisResult::Answer(answer);
                }
                Ok(None) => {
                    tracing::debug!("Rule '{}' matched but its columns are missing", rule.name());
                }
                Err(e) => {
                    tracing::warn!("❌ Rule '{}' failed: {}", rule.name(), e);
                    return AnalysisResult::Error(e.user_friendly_message());
                }
            }
        }

        AnalysisResult::NoMatch
    }
}

pub fn analyze(table: &Table, classification: &Classification, question: &str) -> AnalysisResult {
    Router::default().analyze(table, classification, question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;
    use crate::domain::model::Column;

    fn table(columns: &[(&str, &[&str])]) -> Table {
        Table::new(
            columns
                .iter()
                .map(|(name, cells)| {
                    Column::new(*name, cells.iter().map(|c| c.to_string()).collect())
                })
                .collect(),
        )
        .unwrap()
    }

    fn ask(table: &Table, question: &str) -> AnalysisResult {
        analyze(table, &classify(table), question)
    }

    fn expect_answer(result: AnalysisResult) -> Answer {
        match result {
            AnalysisResult::Answer(answer) => answer,
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn test_most_expensive_drink() {
        let table = table(&[("Nombre", &["Coca Cola", "Agua"]), ("Precio", &["25.50", "10.00"])]);

        let answer = expect_answer(ask(&table, "¿Cuál es el más caro?"));

        assert_eq!(answer.metric("Nombre"), Some("Coca Cola"));
        assert_eq!(answer.metric("Precio"), Some("$25.50"));
        assert!(answer.title.contains("Nombre más caro"));
    }

    #[test]
    fn test_cheapest_drink() {
        let table = table(&[("Nombre", &["Coca Cola", "Agua"]), ("Precio", &["25.50", "10.00"])]);

        let answer = expect_answer(ask(&table, "¿cuál tiene el precio menor?"));

        assert_eq!(answer.metric("Nombre"), Some("Agua"));
        assert_eq!(answer.metric("Precio"), Some("$10.00"));
        assert!(answer.title.contains("más económico"));
    }

    #[test]
    fn test_price_tie_returns_first_row() {
        let table = table(&[
            ("Nombre", &["Agua", "Coca Cola", "Sprite"]),
            ("Precio", &["10", "25.5", "25.50"]),
        ]);

        let answer = expect_answer(ask(&table, "más caro"));
        assert_eq!(answer.metric("Nombre"), Some("Coca Cola"));
    }

    #[test]
    fn test_most_calories() {
        let table = table(&[("Calorias", &["150", "300", "90"]), ("Nombre", &["A", "B", "C"])]);

        let answer = expect_answer(ask(&table, "mayor calorías"));

        assert_eq!(answer.metric("Nombre"), Some("B"));
        assert_eq!(answer.metric("Calorías"), Some("300"));
    }

    #[test]
    fn test_calories_without_name_column() {
        let table = table(&[("kcal", &["1", "2"])]);
        let answer = expect_answer(ask(&table, "highest calories"));
        assert_eq!(answer.metric("Nombre"), Some("N/A"));
    }

    #[test]
    fn test_name_column_prefers_nombre() {
        let table = table(&[
            ("Marca", &["X", "Y"]),
            ("Nombre del producto", &["A", "B"]),
            ("Calorías", &["5", "9"]),
        ]);
        let answer = expect_answer(ask(&table, "la de mayor calorías"));
        assert_eq!(answer.metric("Nombre"), Some("B"));
    }

    #[test]
    fn test_missing_data_report() {
        let table = table(&[
            ("Nombre", &["A", "B", "C", "D", "E"]),
            ("Notas", &["x", "", "y", "", "z"]),
        ]);

        let answer = expect_answer(ask(&table, "datos faltantes"));

        assert_eq!(answer.metrics.len(), 1);
        assert_eq!(answer.metric("Notas"), Some("2"));
    }

    #[test]
    fn test_whitespace_cell_is_not_missing() {
        let table = table(&[
            ("Nombre", &["A", "B", "C"]),
            ("Notas", &["x", "  ", ""]),
        ]);

        let answer = expect_answer(ask(&table, "datos faltantes"));

        assert_eq!(answer.metric("Notas"), Some("1"));
    }

    #[test]
    fn test_no_missing_data() {
        let table = table(&[("Nombre", &["A"])]);
        let answer = expect_answer(ask(&table, "¿hay valores vacíos?"));
        assert!(answer.title.contains("No hay datos faltantes"));
        assert!(answer.metrics.is_empty());
    }

    #[test]
    fn test_longest_text() {
        let table = table(&[
            ("Bebida", &["Té", "Limonada", "Horchata", ""]),
            ("Precio", &["1", "2", "3", "4"]),
        ]);

        let answer = expect_answer(ask(&table, "¿Cuál es la bebida con el nombre más largo?"));

        assert_eq!(answer.metric("Nombre"), Some("Limonada"));
        assert_eq!(answer.metric("Longitud"), Some("8 caracteres"));
        assert!(answer.title.starts_with("📏 Bebida"));
    }

    #[test]
    fn test_priority_order_first_rule_wins() {
        let table = table(&[("Nombre", &["Agua", "Horchata"]), ("Precio", &["", "3"])]);
        // Matches both the longest-text and the missing-data wording.
        let answer = expect_answer(ask(&table, "el más largo y los faltantes"));
        assert_eq!(answer.metric("Nombre"), Some("Horchata"));
    }

    #[test]
    fn test_unmet_precondition_falls_through() {
        // No text column: the longest-text rule steps aside for the missing-data rule.
        let table = table(&[("Precio", &["1", ""])]);
        let answer = expect_answer(ask(&table, "más largo con faltantes"));
        assert_eq!(answer.metric("Precio"), Some("1"));

        // No calorie column and no price column: nothing left.
        assert_eq!(ask(&table, "mayor calorías"), AnalysisResult::NoMatch);
    }

    #[test]
    fn test_price_without_price_column_is_no_match() {
        let table = table(&[("Nombre", &["A"]), ("Cantidad", &["3"])]);
        assert_eq!(ask(&table, "¿cuál es el más caro?"), AnalysisResult::NoMatch);
    }

    #[test]
    fn test_unrecognized_question_is_no_match() {
        let table = table(&[("Nombre", &["A"])]);
        assert_eq!(ask(&table, "¿qué opinas del clima?"), AnalysisResult::NoMatch);
    }

    #[test]
    fn test_empty_price_column_is_inline_error() {
        let table = table(&[("Nombre", &["A", "B"]), ("Precio", &["", ""])]);
        match ask(&table, "más caro") {
            AnalysisResult::Error(message) => assert!(message.contains("Error en análisis")),
            other => panic!("expected inline error, got {:?}", other),
        }
    }

    #[test]
    fn test_rules_in_priority_order() {
        assert_eq!(
            Router::default().rule_names(),
            vec!["longest_text", "max_calories", "missing_data", "price_extreme"]
        );
    }

    #[test]
    fn test_rule_matching_in_isolation() {
        assert!(PriceRule.matches("el costo mayor"));
        assert!(!PriceRule.matches("el costo"));
        assert!(CalorieRule.matches("most calories"));
        assert!(!CalorieRule.matches("calorías"));
        assert!(MissingDataRule.matches("missing values"));
        assert!(LongestTextRule.matches("longest name"));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(25.5), "$25.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(-5.0), "$-5.00");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(300.0), "300");
        assert_eq!(format_number(2.5), "2.5");
    }
}
