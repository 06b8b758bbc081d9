use crate::config::IngestConfig;
use crate::core::classifier::Classifier;
use crate::core::router::Router;
use crate::core::sanitizer::Ingestor;
use crate::domain::model::{AnalysisResult, Answer, Classification, FallbackContext, Table};
use crate::domain::ports::Assistant;
use crate::utils::error::Result;
use std::fmt;
use std::sync::Arc;

pub const NO_ANSWER_MESSAGE: &str = "No se encontró respuesta automática. Reformula tu pregunta.";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "No se pudo conectar con el servicio de IA";

/// Rows shown in the load summary preview.
const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answered by a local heuristic.
    Answer(Answer),
    /// Raw text from the fallback assistant.
    Assistant(String),
    /// Nothing could answer; the session keeps going.
    Warning(String),
    /// A heuristic failed on this question.
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Answer(answer) => write!(f, "{}", answer),
            Reply::Assistant(text) => write!(f, "{}", text),
            Reply::Warning(message) => write!(f, "⚠️ {}", message),
            Reply::Error(message) => write!(f, "❌ {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub columns: Vec<String>,
    pub numeric: Vec<String>,
    pub text: Vec<String>,
    pub date: Vec<String>,
    pub price: Vec<String>,
    pub preview: Vec<Vec<String>>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "✅ Datos cargados: {} registros, {} columnas",
            self.records,
            self.columns.len()
        )?;
        writeln!(f, "Columnas numéricas: {}", self.numeric.join(", "))?;
        writeln!(f, "Columnas de texto: {}", self.text.join(", "))?;
        writeln!(f, "Columnas de fecha: {}", self.date.join(", "))?;
        writeln!(f, "Columnas de precio: {}", self.price.join(", "))?;
        writeln!(f)?;
        write!(f, "{}", self.columns.join(" | "))?;
        for row in &self.preview {
            write!(f, "\n{}", row.join(" | "))?;
        }
        Ok(())
    }
}

/// One ingested upload and everything derived from it.
pub struct Session {
    table: Table,
    classification: Classification,
    router: Router,
    assistant: Option<Arc<dyn Assistant>>,
    sample_rows: usize,
}

impl Session {
    pub fn new(table: Table, assistant: Option<Arc<dyn Assistant>>, sample_rows: usize) -> Self {
        let classification = Classifier::default().classify(&table);
        Self {
            table,
            classification,
            router: Router::default(),
            assistant,
            sample_rows,
        }
    }

    /// Ingests the raw upload. Any ingestion error is terminal: no session is created.
    pub fn from_upload(
        raw: &[u8],
        config: &IngestConfig,
        assistant: Option<Arc<dyn Assistant>>,
        sample_rows: usize,
    ) -> Result<Self> {
        let table = Ingestor::new(config.clone()).ingest(raw)?;
        Ok(Self::new(table, assistant, sample_rows))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn has_assistant(&self) -> bool {
        self.assistant.is_some()
    }

    pub fn summary(&self) -> Summary {
        let owned = |names: Vec<&str>| -> Vec<String> { names.into_iter().map(str::to_string).collect() };
        let preview = (0..self.table.row_count().min(PREVIEW_ROWS))
            .map(|row| {
                (0..self.table.column_count())
                    .map(|column| self.table.cell(column, row).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();

        Summary {
            records: self.table.row_count(),
            columns: self.table.column_names(),
            numeric: owned(self.classification.numeric()),
            text: owned(self.classification.text()),
            date: owned(self.classification.date()),
            price: owned(self.classification.price()),
            preview,
        }
    }

    pub fn analyze(&self, question: &str) -> AnalysisResult {
        self.router
            .analyze(&self.table, &self.classification, question)
    }

    pub fn fallback_context(&self, question: &str) -> FallbackContext {
        FallbackContext {
            columns: self.table.column_names(),
            sample: self.table.head_records(self.sample_rows),
            question: question.to_string(),
        }
    }

    /// Local heuristics first, then the assistant if one was injected.
    pub async fn ask(&self, question: &str) -> Reply {
        tracing::info!("❓ Question: {}", question);

        match self.analyze(question) {
            AnalysisResult::Answer(answer) => Reply::Answer(answer),
            AnalysisResult::Error(message) => Reply::Error(message),
            AnalysisResult::NoMatch => self.ask_assistant(question).await,
        }
    }

    async fn ask_assistant(&self, question: &str) -> Reply {
        let Some(assistant) = &self.assistant else {
            tracing::info!("No heuristic matched and no assistant configured");
            return Reply::Warning(NO_ANSWER_MESSAGE.to_string());
        };

        tracing::info!("🤖 Asking {} ...", assistant.name());
        match assistant.answer(&self.fallback_context(question)).await {
            Ok(text) => Reply::Assistant(text),
            Err(e) => {
                tracing::warn!("❌ {} failed: {}", assistant.name(), e);
                tracing::warn!("💡 {}", e.recovery_suggestion());
                Reply::Warning(SERVICE_UNAVAILABLE_MESSAGE.to_string())
            }
        }
    }
}
