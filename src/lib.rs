pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{GroqAssistant, LocalStorage};
pub use config::AppConfig;
pub use crate::core::classifier::{classify, Classifier};
pub use crate::core::router::{analyze, Router};
pub use crate::core::sanitizer::{sanitize, Ingestor, SanitizedText};
pub use crate::core::session::{Reply, Session};
pub use utils::error::{AnalyzerError, Result};
