use crate::utils::error::{AnalyzerError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 上傳檔案大小上限 (10 MiB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Ceiling on the decoded text length, in characters.
    pub max_size: usize,
    pub duplicate_headers: DuplicateHeaderPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_UPLOAD_SIZE,
            duplicate_headers: DuplicateHeaderPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHeaderPolicy {
    /// Repeated headers become `name.1`, `name.2`, ... in column order.
    #[default]
    Rename,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub sample_rows: usize,
    pub timeout_seconds: Option<u64>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            sample_rows: 3,
            timeout_seconds: Some(30),
        }
    }
}

impl AssistantConfig {
    /// 決定 API key：命令列 > 設定檔 > 環境變數。
    /// 未替換的 `${VAR}` 佔位符視為未設定。
    pub fn resolve_api_key(&self, cli_key: Option<&str>) -> Option<String> {
        let usable = |key: &str| {
            let key = key.trim();
            !key.is_empty() && !key.starts_with("${")
        };

        cli_key
            .filter(|k| usable(k))
            .map(|k| k.trim().to_string())
            .or_else(|| {
                self.api_key
                    .as_deref()
                    .filter(|k| usable(k))
                    .map(|k| k.trim().to_string())
            })
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|k| usable(k))
                    .map(|k| k.trim().to_string())
            })
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AnalyzerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AnalyzerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GROQ_API_KEY})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_min("ingest.max_size", self.ingest.max_size, 1)?;

        validate_url("assistant.base_url", &self.assistant.base_url)?;
        validate_non_empty_string("assistant.model", &self.assistant.model)?;
        validate_range("assistant.temperature", self.assistant.temperature, 0.0, 2.0)?;
        validate_range("assistant.sample_rows", self.assistant.sample_rows, 1, 50)?;
        if let Some(timeout) = self.assistant.timeout_seconds {
            validate_min("assistant.timeout_seconds", timeout, 1)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.ingest.max_size, MAX_UPLOAD_SIZE);
        assert_eq!(config.ingest.duplicate_headers, DuplicateHeaderPolicy::Rename);
        assert_eq!(config.assistant.model, DEFAULT_MODEL);
        assert_eq!(config.assistant.sample_rows, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[ingest]
max_size = 2048
duplicate_headers = "reject"

[assistant]
api_key = "gsk_test"
base_url = "http://localhost:9999/v1"
model = "llama-3.1-8b-instant"
temperature = 0.3
sample_rows = 5
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.ingest.max_size, 2048);
        assert_eq!(config.ingest.duplicate_headers, DuplicateHeaderPolicy::Reject);
        assert_eq!(config.assistant.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.assistant.base_url, "http://localhost:9999/v1");
        assert_eq!(config.assistant.sample_rows, 5);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CSV_INSIGHT_TEST_MODEL", "mixtral-8x7b");

        let toml_content = r#"
[assistant]
model = "${CSV_INSIGHT_TEST_MODEL}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.assistant.model, "mixtral-8x7b");

        std::env::remove_var("CSV_INSIGHT_TEST_MODEL");
    }

    #[test]
    fn test_unresolved_placeholder_is_not_an_api_key() {
        let toml_content = r#"
[assistant]
api_key = "${CSV_INSIGHT_TEST_UNSET_KEY}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.assistant.api_key.as_deref(),
            Some("${CSV_INSIGHT_TEST_UNSET_KEY}")
        );
        assert_eq!(
            config.assistant.resolve_api_key(Some("from-cli")).as_deref(),
            Some("from-cli")
        );
    }

    #[test]
    fn test_cli_key_wins_over_file_key() {
        let config = AppConfig {
            assistant: AssistantConfig {
                api_key: Some("from-file".to_string()),
                ..AssistantConfig::default()
            },
            ..AppConfig::default()
        };

        assert_eq!(
            config.assistant.resolve_api_key(Some("from-cli")).as_deref(),
            Some("from-cli")
        );
        assert_eq!(
            config.assistant.resolve_api_key(Some("  ")).as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[assistant]
base_url = "invalid-url"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[assistant]\ntemperature = 5.0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_policy_is_config_error() {
        let result = AppConfig::from_toml_str("[ingest]\nduplicate_headers = \"merge\"");
        assert!(matches!(result, Err(AnalyzerError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[ingest]\nmax_size = 100\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.ingest.max_size, 100);
    }
}
