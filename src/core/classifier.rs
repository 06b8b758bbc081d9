//! Column role inference.
//!
//! Each column goes through an ordered list of [`ColumnProbe`]s; the first
//! probe that accepts every non-empty cell decides the role. Text is the
//! fallback and always accepts.

use crate::domain::model::{is_missing, Classification, ClassifiedColumn, Column, ColumnRole, Table};
use chrono::NaiveDate;

/// Case-insensitive substrings that mark a numeric column as a price.
pub const PRICE_KEYWORDS: [&str; 5] = ["precio", "costo", "valor", "mxn", "usd"];

/// Accepted date layouts, tried in this order.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y%m%d"];

pub trait ColumnProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Role for the column if every non-empty cell fits, `None` otherwise.
    fn probe(&self, column: &Column) -> Option<ColumnRole>;
}

fn present_cells(column: &Column) -> impl Iterator<Item = &str> {
    column
        .cells
        .iter()
        .filter(|c| !is_missing(c))
        .map(|c| c.trim())
}

pub struct NumericProbe;

impl ColumnProbe for NumericProbe {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn probe(&self, column: &Column) -> Option<ColumnRole> {
        present_cells(column)
            .all(|cell| cell.parse::<i64>().is_ok() || cell.parse::<f64>().is_ok())
            .then_some(ColumnRole::Numeric)
    }
}

pub struct DateProbe {
    formats: Vec<&'static str>,
}

impl DateProbe {
    pub fn new(formats: &[&'static str]) -> Self {
        Self {
            formats: formats.to_vec(),
        }
    }
}

impl Default for DateProbe {
    fn default() -> Self {
        Self::new(&DATE_FORMATS)
    }
}

impl ColumnProbe for DateProbe {
    fn name(&self) -> &'static str {
        "date"
    }

    fn probe(&self, column: &Column) -> Option<ColumnRole> {
        // A column with no values at all never reaches here: the numeric probe takes it.
        if present_cells(column).next().is_none() {
            return None;
        }
        self.formats
            .iter()
            .copied()
            .find(|format| {
                present_cells(column).all(|cell| NaiveDate::parse_from_str(cell, format).is_ok())
            })
            .map(|format| ColumnRole::Date { format })
    }
}

pub struct TextProbe;

impl ColumnProbe for TextProbe {
    fn name(&self) -> &'static str {
        "text"
    }

    fn probe(&self, _column: &Column) -> Option<ColumnRole> {
        Some(ColumnRole::Text)
    }
}

pub struct Classifier {
    probes: Vec<Box<dyn ColumnProbe>>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec![
            Box::new(NumericProbe),
            Box::new(DateProbe::default()),
            Box::new(TextProbe),
        ])
    }
}

impl Classifier {
    pub fn new(probes: Vec<Box<dyn ColumnProbe>>) -> Self {
        Self { probes }
    }

    pub fn classify(&self, table: &Table) -> Classification {
        let columns = table
            .columns()
            .iter()
            .map(|column| {
                let role = self
                    .probes
                    .iter()
                    .find_map(|probe| {
                        let role = probe.probe(column)?;
                        tracing::debug!("Column '{}' classified by {} probe", column.name, probe.name());
                        Some(role)
                    })
                    .unwrap_or(ColumnRole::Text);
                ClassifiedColumn {
                    name: column.name.clone(),
                    role,
                    is_price: role == ColumnRole::Numeric && is_price_name(&column.name),
                }
            })
            .collect();

        Classification { columns }
    }
}

pub fn classify(table: &Table) -> Classification {
    Classifier::default().classify(table)
}

pub fn is_price_name(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    PRICE_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_roles_in_probe_order() {
        let table = table(&[
            ("Nombre", &["Coca Cola", "Agua", ""]),
            ("Precio MXN", &["25.50", "10", ""]),
            ("Calorias", &["150", "-3", "1e2"]),
            ("Fecha", &["2024-01-31", "", "2023-12-01"]),
            ("Dia", &["31/01/2024", "01/02/2024", "15/02/2024"]),
            ("Mes", &["01/31/2024", "02/01/2024", "12/15/2024"]),
        ]);

        let classification = classify(&table);

        assert_eq!(classification.numeric(), vec!["Precio MXN", "Calorias"]);
        assert_eq!(classification.text(), vec!["Nombre"]);
        assert_eq!(classification.date(), vec!["Fecha", "Dia", "Mes"]);
        assert_eq!(classification.price(), vec!["Precio MXN"]);

        assert_eq!(classification.columns[3].role, ColumnRole::Date { format: "%Y-%m-%d" });
        assert_eq!(classification.columns[4].role, ColumnRole::Date { format: "%d/%m/%Y" });
        assert_eq!(classification.columns[5].role, ColumnRole::Date { format: "%m/%d/%Y" });
    }

    #[test]
    fn test_whitespace_cell_blocks_numeric() {
        let table = table(&[("Precio", &["10", "  ", "12"]), ("Costo", &["10", "", " 12 "])]);
        let classification = classify(&table);
        assert_eq!(classification.text(), vec!["Precio"]);
        assert_eq!(classification.numeric(), vec!["Costo"]);
    }

    #[test]
    fn test_ambiguous_dates_take_first_format() {
        let table = table(&[("Fecha", &["01/02/2024", "03/04/2024"])]);
        let classification = classify(&table);
        assert_eq!(classification.columns[0].role, ColumnRole::Date { format: "%d/%m/%Y" });
    }

    #[test]
    fn test_compact_dates_are_numeric_first() {
        let table = table(&[("Fecha", &["20240101", "20240202"])]);
        assert_eq!(classify(&table).numeric(), vec!["Fecha"]);
    }

    #[test]
    fn test_mixed_dates_fall_back_to_text() {
        let table = table(&[("Fecha", &["2024-01-01", "31/01/2024"])]);
        assert_eq!(classify(&table).text(), vec!["Fecha"]);
    }

    #[test]
    fn test_price_requires_numeric() {
        let table = table(&[("Valor", &["alto", "bajo"]), ("costo_usd", &["1", "2"])]);
        let classification = classify(&table);
        assert_eq!(classification.price(), vec!["costo_usd"]);
    }

    #[test]
    fn test_every_column_gets_exactly_one_role() {
        let table = table(&[
            ("a", &["1", "x"]),
            ("b", &["", ""]),
            ("c", &["2024-01-01", ""]),
            ("Precio", &["3", "4"]),
        ]);
        let classification = classify(&table);

        for name in table.column_names() {
            let buckets = [
                classification.numeric().contains(&name.as_str()),
                classification.text().contains(&name.as_str()),
                classification.date().contains(&name.as_str()),
            ];
            assert_eq!(buckets.iter().filter(|b| **b).count(), 1, "column {}", name);
        }
        for price in classification.price() {
            assert!(classification.numeric().contains(&price));
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let table = table(&[("x", &["1", "2"]), ("y", &["2024-01-01", "2024-01-02"])]);
        assert_eq!(classify(&table), classify(&table));
    }

    #[test]
    fn test_custom_probe_order() {
        let classifier = Classifier::new(vec![Box::new(DateProbe::new(&["%Y%m%d"])), Box::new(TextProbe)]);
        let table = table(&[("Fecha", &["20240101"])]);
        assert_eq!(
            classifier.classify(&table).columns[0].role,
            ColumnRole::Date { format: "%Y%m%d" }
        );
    }
}
