//! OCR client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rate_limit::env_number;

/// Configuration for the cloud OCR client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Computer Vision resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Subscription key sent as `Ocp-Apim-Subscription-Key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional BCP-47 language hint passed to the Read API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Delay before the first status poll, in milliseconds
    #[serde(default = "default_initial_poll_delay_ms")]
    pub initial_poll_delay_ms: u64,
    /// Ceiling for the exponential poll delay, in seconds
    #[serde(default = "default_max_poll_interval_secs")]
    pub max_poll_interval_secs: u64,
    /// Give up on a recognition job after this many seconds
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Timeout for each individual HTTP request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_initial_poll_delay_ms() -> u64 {
    1000
}

fn default_max_poll_interval_secs() -> u64 {
    8
}

fn default_max_wait_secs() -> u64 {
    120
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            language: None,
            initial_poll_delay_ms: default_initial_poll_delay_ms(),
            max_poll_interval_secs: default_max_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl OcrConfig {
    /// Apply environment variable overrides.
    ///
    /// - `VISION_ENDPOINT`: Computer Vision endpoint
    /// - `VISION_KEY`: subscription key
    /// - `OCR_LANGUAGE`: language hint
    /// - `OCR_MAX_WAIT_SECS`: polling budget per image
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("VISION_ENDPOINT") {
            if !val.trim().is_empty() {
                self.endpoint = Some(val);
            }
        }
        if let Ok(val) = std::env::var("VISION_KEY") {
            if !val.trim().is_empty() {
                self.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("OCR_LANGUAGE") {
            self.language = Some(val);
        }
        if let Some(n) = env_number("OCR_MAX_WAIT_SECS") {
            self.max_wait_secs = n;
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn initial_poll_delay(&self) -> Duration {
        Duration::from_millis(self.initial_poll_delay_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_secs(self.max_poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OcrConfig::default();
        assert!(config.endpoint.is_none());
        assert_eq!(config.initial_poll_delay(), Duration::from_secs(1));
        assert_eq!(config.max_poll_interval(), Duration::from_secs(8));
        assert_eq!(config.max_wait(), Duration::from_secs(120));
        assert!(config.is_default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: OcrConfig = toml::from_str(
            r#"
            endpoint = "https://example.cognitiveservices.azure.com/"
            max_wait_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.max_wait_secs, 30);
        assert_eq!(config.initial_poll_delay_ms, 1000);
        assert!(config.api_key.is_none());
    }
}
