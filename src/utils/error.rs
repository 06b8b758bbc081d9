use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("File is not valid UTF-8 text: {0}")]
    EncodingError(#[from] std::string::FromUtf8Error),

    #[error("File too large: {size} characters exceeds the limit of {limit}")]
    SizeLimitError { size: usize, limit: usize },

    #[error("Dangerous content detected: {pattern}")]
    SecurityError { pattern: String },

    #[error("Malformed CSV: {message}")]
    ParseError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Duplicate column name: {column}")]
    ColumnAmbiguityError { column: String },

    #[error("AI service error: {message}")]
    ExternalServiceError { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Analysis error: {message}")]
    AnalysisError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Ingestion,
    Security,
    Configuration,
    ExternalService,
    Analysis,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalyzerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalyzerError::EncodingError(_)
            | AnalyzerError::SizeLimitError { .. }
            | AnalyzerError::ParseError { .. }
            | AnalyzerError::CsvError(_)
            | AnalyzerError::ColumnAmbiguityError { .. } => ErrorCategory::Ingestion,
            AnalyzerError::SecurityError { .. } => ErrorCategory::Security,
            AnalyzerError::ConfigError { .. }
            | AnalyzerError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AnalyzerError::ExternalServiceError { .. } | AnalyzerError::ApiError(_) => {
                ErrorCategory::ExternalService
            }
            AnalyzerError::AnalysisError { .. } => ErrorCategory::Analysis,
            AnalyzerError::IoError(_) | AnalyzerError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Analysis => ErrorSeverity::Low,
            ErrorCategory::ExternalService => ErrorSeverity::Medium,
            ErrorCategory::Ingestion | ErrorCategory::Security => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AnalyzerError::EncodingError(_) => "Save the file as UTF-8 and upload it again",
            AnalyzerError::SizeLimitError { .. } => "Split the file into parts under 10 MiB",
            AnalyzerError::SecurityError { .. } => {
                "Remove formulas that run commands (=CMD, =|, =!) from the file"
            }
            AnalyzerError::ParseError { .. } | AnalyzerError::CsvError(_) => {
                "Check that every row has the same number of comma-separated fields"
            }
            AnalyzerError::ColumnAmbiguityError { .. } => {
                "Give every column a unique header or use duplicate_headers = \"rename\""
            }
            AnalyzerError::ExternalServiceError { .. } | AnalyzerError::ApiError(_) => {
                "Check the network connection and the GROQ_API_KEY value"
            }
            AnalyzerError::ConfigError { .. } | AnalyzerError::InvalidConfigValueError { .. } => {
                "Review the configuration file"
            }
            AnalyzerError::AnalysisError { .. } => "Rephrase the question",
            AnalyzerError::IoError(_) => "Check that the file exists and is readable",
            AnalyzerError::SerializationError(_) => "Report this as a bug",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Ingestion => format!("Error al procesar CSV: {}", self),
            ErrorCategory::Security => format!("Archivo rechazado por seguridad: {}", self),
            ErrorCategory::ExternalService => {
                "No se pudo conectar con el servicio de IA".to_string()
            }
            ErrorCategory::Analysis => format!("Error en análisis: {}", self),
            ErrorCategory::Configuration | ErrorCategory::System => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
