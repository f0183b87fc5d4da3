//! Batch processing options, stages and errors.

use serde::{Deserialize, Serialize};

use crate::rate_limit::{env_number, PacingMode, RateError};

/// What the corrected diagnosis falls back to when normalization fails.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Reuse the diagnosis found by the label extractor
    #[default]
    Extracted,
    /// Write "Error occurred"
    #[value(name = "error")]
    #[serde(rename = "error")]
    ErrorString,
}

impl FallbackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::ErrorString => "error",
        }
    }
}

/// What goes into the "Extracted Diagnosis" column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractedDiagnosisMode {
    /// The provisional-diagnosis field found in the recognized text
    #[default]
    Field,
    /// The full recognized text
    RawText,
}

impl ExtractedDiagnosisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::RawText => "raw-text",
        }
    }
}

/// Options for a batch run; the `[batch]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Maximum files started per minute
    #[serde(default = "default_rate_per_minute")]
    pub rate_per_minute: f64,
    #[serde(default)]
    pub pacing: PacingMode,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    #[serde(default)]
    pub extracted_mode: ExtractedDiagnosisMode,
}

fn default_rate_per_minute() -> f64 {
    15.0
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            rate_per_minute: default_rate_per_minute(),
            pacing: PacingMode::default(),
            fallback: FallbackPolicy::default(),
            extracted_mode: ExtractedDiagnosisMode::default(),
        }
    }
}

impl BatchOptions {
    /// Apply environment variable overrides.
    ///
    /// - `RATE_LIMIT_PER_MINUTE`: files started per minute
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(rate) = env_number("RATE_LIMIT_PER_MINUTE") {
            self.rate_per_minute = rate;
        }
        self
    }

    pub fn with_rate(mut self, rate_per_minute: f64) -> Self {
        self.rate_per_minute = rate_per_minute;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingMode) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_extracted_mode(mut self, mode: ExtractedDiagnosisMode) -> Self {
        self.extracted_mode = mode;
        self
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Where a single file is in its processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Pending,
    OcrInFlight,
    OcrSucceeded,
    OcrFailed,
    NormalizerInFlight,
    Done { success: bool },
}

impl std::fmt::Display for FileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::OcrInFlight => f.write_str("ocr-in-flight"),
            Self::OcrSucceeded => f.write_str("ocr-succeeded"),
            Self::OcrFailed => f.write_str("ocr-failed"),
            Self::NormalizerInFlight => f.write_str("normalizer-in-flight"),
            Self::Done { success: true } => f.write_str("done(success)"),
            Self::Done { success: false } => f.write_str("done(failed)"),
        }
    }
}

/// Errors that stop a batch before any file is processed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid batch configuration: {0}")]
    Rate(#[from] RateError),
}
