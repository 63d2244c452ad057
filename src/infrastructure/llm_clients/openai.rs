use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Chat-completions client for OpenAI and API-compatible providers (OpenRouter, local servers).
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn api_key(config: &LLMConfig) -> Result<String> {
        config
            .credential()
            .map(str::to_string)
            .ok_or_else(|| AppError::MissingCredential(config.provider.display_name().to_string()))
    }

    fn endpoint(config: &LLMConfig) -> String {
        if config.base_url.ends_with('/') {
            format!("{}chat/completions", config.base_url)
        } else {
            format!("{}/chat/completions", config.base_url)
        }
    }

    fn request_body(config: &LLMConfig, system: &str, user: &str) -> serde_json::Value {
        json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        })
    }

    fn completion_text(json: &serde_json::Value) -> Result<String> {
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let url = Self::endpoint(config);
        debug!(%url, model = %config.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&Self::request_body(config, system, user))
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        Self::completion_text(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_handles_trailing_slash() {
        let mut config = LLMConfig::default();
        config.base_url = "http://localhost:1234/v1/".to_string();
        assert_eq!(
            OpenAIClient::endpoint(&config),
            "http://localhost:1234/v1/chat/completions"
        );

        config.base_url = "https://api.openai.com/v1".to_string();
        assert_eq!(
            OpenAIClient::endpoint(&config),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_is_deterministic() {
        let config = LLMConfig::default();
        let body = OpenAIClient::request_body(&config, "sys", "usr");
        assert_eq!(body["temperature"], json!(0.0));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["model"], "gpt-4.1-mini");
    }

    #[test]
    fn test_completion_text_extraction() {
        let ok = json!({"choices": [{"message": {"content": " SELECT 1 "}}]});
        assert_eq!(OpenAIClient::completion_text(&ok).unwrap(), " SELECT 1 ");

        let bad = json!({"error": "nope"});
        assert!(matches!(
            OpenAIClient::completion_text(&bad),
            Err(AppError::LLMError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let config = LLMConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..LLMConfig::default()
        };
        let err = OpenAIClient::new()
            .generate(&config, "sys", "usr")
            .await
            .unwrap_err();
        assert_eq!(err, AppError::MissingCredential("OpenAI".to_string()));
    }
}
