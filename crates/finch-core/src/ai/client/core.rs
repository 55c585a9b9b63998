//! Ollama HTTP client

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::config::OllamaConfig;
use crate::ai::model::{ModelError, ModelInfo};
use crate::constants;

/// Thin HTTP client for one Ollama server
pub struct OllamaClient {
    http: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(constants::ai::CONNECT_TIMEOUT)
            .build()
            .context("Failed to build Ollama HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// POST a chat body, turning non-2xx statuses into `ModelError::Api`
    pub(super) async fn post_chat(&self, body: &Value) -> Result<reqwest::Response, ModelError> {
        let url = self.config.endpoint("api/chat");
        debug!(url = %url, model = ?body.get("model"), "Ollama chat request");

        let response = self.http.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }

    /// Models installed on the server (`GET /api/tags`)
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        let response = self
            .http
            .get(self.config.endpoint("api/tags"))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: Value = response.json().await?;
        Ok(parse_tags(&body))
    }
}

/// Ollama reports failures as `{"error": "..."}`
async fn error_from_response(response: reqwest::Response) -> ModelError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text);
    ModelError::Api { status, message }
}

fn parse_tags(body: &Value) -> Vec<ModelInfo> {
    let Some(models) = body.get("models").and_then(|m| m.as_array()) else {
        return Vec::new();
    };

    models
        .iter()
        .filter_map(|model| {
            let name = model.get("name").and_then(|n| n.as_str())?;
            let details = model.get("details");
            let detail = |key: &str| {
                details
                    .and_then(|d| d.get(key))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            Some(ModelInfo {
                name: name.to_string(),
                size: model.get("size").and_then(|s| s.as_u64()),
                family: detail("family"),
                parameter_size: detail("parameter_size"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tags_listing() {
        let body = json!({
            "models": [
                {
                    "name": "granite4:350m",
                    "size": 708000000u64,
                    "details": { "family": "granite", "parameter_size": "350M" }
                },
                { "name": "phi4" },
                { "size": 1 }
            ]
        });

        let models = parse_tags(&body);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].family.as_deref(), Some("granite"));
        assert_eq!(models[0].parameter_size.as_deref(), Some("350M"));
        assert_eq!(models[1].name, "phi4");
        assert_eq!(models[1].size, None);
    }

    #[test]
    fn missing_models_key_is_empty() {
        assert!(parse_tags(&json!({})).is_empty());
    }
}
