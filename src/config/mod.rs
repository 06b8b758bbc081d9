pub mod toml_config;

pub use toml_config::{AppConfig, AssistantConfig, DuplicateHeaderPolicy, IngestConfig};

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "csv-insight")]
#[command(about = "Ask questions about a CSV file")]
pub struct CliConfig {
    /// CSV file to analyze
    pub file: String,

    /// Question to answer; repeat for several. Reads stdin when omitted.
    #[arg(short, long = "question")]
    pub questions: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// API key for the fallback assistant (overrides config and GROQ_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Print answers as HTML result boxes
    #[arg(long)]
    pub html: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::validation::*;

        validate_path("file", &self.file)?;
        validate_file_extension("file", &self.file, &["csv"])?;
        if let Some(config) = &self.config {
            validate_path("config", config)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;

    #[test]
    fn test_parse_repeated_questions() {
        let config = CliConfig::parse_from([
            "csv-insight",
            "bebidas.csv",
            "-q",
            "¿cuál es el más caro?",
            "--question",
            "datos faltantes",
        ]);

        assert_eq!(config.file, "bebidas.csv");
        assert_eq!(config.questions.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_csv_file() {
        let config = CliConfig::parse_from(["csv-insight", "bebidas.xlsx"]);
        assert!(config.validate().is_err());
    }
}
