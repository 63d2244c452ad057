use crate::application::use_cases::sheet_ingestor::{
    DEFAULT_HEADER_KEYWORDS, DEFAULT_MIN_HEADER_MATCHES,
};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use validator::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "report_builder.toml";
pub const ENV_PREFIX: &str = "REPORT_BUILDER_";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const KEYRING_SERVICE: &str = "report-builder";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    #[validate(nested)]
    pub llm: LLMConfig,
    #[validate(nested)]
    pub ingest: IngestConfig,
    /// Rows shown in the terminal preview; the CSV artifact always holds the full result.
    #[validate(range(min = 1))]
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            llm: LLMConfig::default(),
            ingest: IngestConfig::default(),
            preview_rows: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for spreadsheet files.
    pub raw_dir: PathBuf,
    /// File-backed relational store.
    pub database: PathBuf,
    /// CSV artifact rewritten on every run.
    pub output_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            database: PathBuf::from("outputs/report.db"),
            output_csv: PathBuf::from("outputs/result.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IngestConfig {
    /// Vocabulary that marks a data row as a misplaced header.
    #[validate(length(min = 1))]
    pub header_keywords: Vec<String>,
    #[validate(range(min = 1))]
    pub min_header_matches: usize,
    /// File extensions picked up from `raw_dir`.
    #[validate(length(min = 1))]
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_keywords: DEFAULT_HEADER_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            min_header_matches: DEFAULT_MIN_HEADER_MATCHES,
            extensions: vec!["xlsx".to_string()],
        }
    }
}

pub struct ConfigService {
    keyring: KeyringManager,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    /// Layered load: defaults, then the TOML file (if present), then `REPORT_BUILDER_*` env vars.
    /// Nested keys use `__`, e.g. `REPORT_BUILDER_LLM__MODEL`.
    pub fn load(&self, config_file: Option<&Path>) -> Result<AppConfig> {
        let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if config_file.is_some() && !file.is_file() {
            return Err(AppError::ConfigError(format!(
                "Config file {} does not exist",
                file.display()
            )));
        }

        let figment = Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        if config.llm.credential().is_none() {
            config.llm.api_key = self.resolve_api_key(&config.llm);
        }

        debug!(
            raw_dir = %config.paths.raw_dir.display(),
            database = %config.paths.database.display(),
            model = %config.llm.model,
            has_api_key = config.llm.credential().is_some(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Credential lookup order: `OPENAI_API_KEY`, then the OS keychain.
    fn resolve_api_key(&self, llm: &LLMConfig) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| match self.keyring.get_secret(llm.provider.keyring_entry()) {
                Ok(secret) => secret,
                Err(e) => {
                    warn!(error = %e, "Keychain lookup failed");
                    None
                }
            })
    }

    pub fn save_api_key(&self, llm: &LLMConfig, key: &str) -> Result<()> {
        self.keyring.set_secret(llm.provider.keyring_entry(), key)
    }
}
