use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    OpenRouter,
    Local,
}

impl LLMProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "OpenAI",
            LLMProvider::OpenRouter => "OpenRouter",
            LLMProvider::Local => "Local",
        }
    }

    /// Name of the keychain entry holding this provider's key.
    pub fn keyring_entry(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "openai",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Local => "local",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
}

impl LLMConfig {
    /// The configured key, if it is present and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key: None,
            max_tokens: Some(1024),
            temperature: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_not_a_credential() {
        let mut config = LLMConfig::default();
        assert_eq!(config.credential(), None);

        config.api_key = Some("   ".to_string());
        assert_eq!(config.credential(), None);

        config.api_key = Some(" sk-test ".to_string());
        assert_eq!(config.credential(), Some("sk-test"));
    }

    #[test]
    fn test_default_is_deterministic_and_valid() {
        let config = LLMConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range_is_invalid() {
        let config = LLMConfig {
            temperature: 3.5,
            ..LLMConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
