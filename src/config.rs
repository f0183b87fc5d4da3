//! Configuration management for medform using the prefer crate.
//!
//! A config file has `[ocr]`, `[llm]`, `[batch]` and `[export]` sections, all
//! optional. Environment variables (and a `.env` file, loaded in `main`)
//! override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::export::ExportFormat;
use crate::llm::LlmConfig;
use crate::ocr::OcrConfig;
use crate::services::BatchOptions;

/// Shown in place of secrets when printing configuration.
const REDACTED: &str = "********";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// Defaults for result export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default output file, relative to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Default export format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ExportFormat>,
}

impl ExportConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cloud OCR settings.
    #[serde(default, skip_serializing_if = "OcrConfig::is_default")]
    pub ocr: OcrConfig,
    /// Generative-text settings.
    #[serde(default, skip_serializing_if = "LlmConfig::is_default")]
    pub llm: LlmConfig,
    /// Rate limiting and fallback behavior.
    #[serde(default, skip_serializing_if = "BatchOptions::is_default")]
    pub batch: BatchOptions,
    /// Export defaults.
    #[serde(default, skip_serializing_if = "ExportConfig::is_default")]
    pub export: ExportConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers medform config files in standard locations.
    /// A file that fails to parse is reported and ignored.
    pub async fn load() -> Self {
        let config = match prefer::load("medform").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config file: {}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.with_env_overrides()
    }

    /// Load an explicitly named config file and apply environment overrides.
    pub async fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::load_from_path(path).await?.with_env_overrides())
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment variable overrides to every section.
    pub fn with_env_overrides(mut self) -> Self {
        self.ocr = self.ocr.with_env_overrides();
        self.llm = self.llm.with_env_overrides();
        self.batch = self.batch.with_env_overrides();
        self
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// The configured default output file, resolved against the config file's directory.
    pub fn export_output(&self) -> Option<PathBuf> {
        let output = self.export.output.as_deref()?;
        let base = self.base_dir().unwrap_or_else(|| PathBuf::from("."));
        Some(self.resolve_path(output, &base))
    }

    /// Settings a processing run needs but that are not set.
    pub fn missing_settings(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if is_blank(&self.ocr.endpoint) {
            missing.push("OCR endpoint (VISION_ENDPOINT or [ocr] endpoint)".to_string());
        }
        if is_blank(&self.ocr.api_key) {
            missing.push("OCR key (VISION_KEY or [ocr] api_key)".to_string());
        }
        if self.llm.provider.requires_api_key() && is_blank(&self.llm.api_key) {
            missing.push(format!(
                "{} API key (LLM_API_KEY or [llm] api_key)",
                self.llm.provider
            ));
        }
        missing
    }

    /// A copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.ocr.api_key.is_some() {
            config.ocr.api_key = Some(REDACTED.to_string());
        }
        if config.llm.api_key.is_some() {
            config.llm.api_key = Some(REDACTED.to_string());
        }
        config
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
