use crate::config::AssistantConfig;
use crate::domain::model::FallbackContext;
use crate::domain::ports::Assistant;
use crate::utils::error::{AnalyzerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Chat-completion client for Groq's OpenAI-compatible API.
pub struct GroqAssistant {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GroqAssistant {
    pub fn new(api_key: String, config: &AssistantConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// `None` when no API key is available; the heuristics keep working without it.
    pub fn from_config(config: &AssistantConfig, cli_key: Option<&str>) -> Result<Option<Self>> {
        match config.resolve_api_key(cli_key) {
            Some(api_key) => Ok(Some(Self::new(api_key, config)?)),
            None => {
                tracing::warn!("⚠️ No API key configured, AI fallback disabled");
                Ok(None)
            }
        }
    }

    fn endpoint(&self) -> String {
        if self.base_url.ends_with('/') {
            format!("{}chat/completions", self.base_url)
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn system_prompt(context: &FallbackContext) -> Result<String> {
        let columns = serde_json::to_string(&context.columns)?;
        let sample = serde_json::to_string(&context.sample)?;

        Ok(format!(
            "Eres un experto analista de datos. Analiza este dataset:\n\
             - Columnas: {}\n\
             - Muestra: {}\n\n\
             Responde en español con información precisa.\n\
             Para precios usa formato: $XX.XX\n\
             Para análisis de texto, verifica longitudes.\n\
             Reporta datos faltantes si existen.",
            columns, sample
        ))
    }
}

#[async_trait]
impl Assistant for GroqAssistant {
    fn name(&self) -> &str {
        "groq"
    }

    async fn answer(&self, context: &FallbackContext) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": Self::system_prompt(context)?
                },
                {
                    "role": "user",
                    "content": context.question
                }
            ],
            "temperature": self.temperature,
        });

        tracing::debug!("Making API request to: {}", self.endpoint());
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::ExternalServiceError {
                message: format!("API error ({}): {}", status, text),
            });
        }

        let json: serde_json::Value = response.json().await?;
        json.pointer("/choices/0/message/content")
            .and_then(|content| content.as_str())
            .map(str::to_string)
            .ok_or_else(|| AnalyzerError::ExternalServiceError {
                message: "Invalid response format: missing choices[0].message.content".to_string(),
            })
    }
}
