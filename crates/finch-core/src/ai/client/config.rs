//! Ollama client configuration

use std::time::Duration;

use serde::Serialize;

use crate::ai::model::ModelRole;
use crate::config::FinchConfig;
use crate::constants;

/// Connection settings for an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Bound on one non-streaming call
    pub request_timeout: Duration,
    /// Bound on the silence between two streamed chunks
    pub stream_idle_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: constants::ai::DEFAULT_OLLAMA_HOST.to_string(),
            request_timeout: constants::ai::REQUEST_TIMEOUT,
            stream_idle_timeout: constants::ai::STREAM_IDLE_TIMEOUT,
        }
    }
}

impl OllamaConfig {
    pub fn from_finch_config(config: &FinchConfig) -> Self {
        Self {
            base_url: config.ollama_host.clone(),
            ..Self::default()
        }
    }

    /// Full URL for an API path such as `api/chat`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Per-request generation options (`options` in the request body)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelOptions {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<usize>,
}

impl ModelOptions {
    /// Deterministic selection, looser responses, all available cores
    pub fn for_role(role: ModelRole) -> Self {
        let temperature = match role {
            ModelRole::ToolSelection => constants::ai::SELECTOR_TEMPERATURE,
            ModelRole::Response => constants::ai::RESPONDER_TEMPERATURE,
        };
        Self {
            temperature,
            num_thread: std::thread::available_parallelism().ok().map(|n| n.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        let config = OllamaConfig {
            base_url: "http://gpu-box:11434/".into(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("/api/chat"), "http://gpu-box:11434/api/chat");
        assert_eq!(config.endpoint("api/tags"), "http://gpu-box:11434/api/tags");
    }

    #[test]
    fn role_temperatures() {
        assert_eq!(ModelOptions::for_role(ModelRole::ToolSelection).temperature, 0.0);
        assert_eq!(ModelOptions::for_role(ModelRole::Response).temperature, 0.5);
        assert!(ModelOptions::for_role(ModelRole::Response).num_thread.is_some());
    }
}
