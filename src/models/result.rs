//! Per-file processing results.

use serde::{Deserialize, Serialize};

use super::StructuredFields;

/// Placeholder written into diagnosis columns when a file could not be processed.
pub const ERROR_OCCURRED: &str = "Error occurred";

/// Terminal status of a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Success,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing one uploaded file.
///
/// Built once by the batch processor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub file_name: String,
    pub extracted_diagnosis: String,
    pub corrected_diagnosis: String,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Fields returned by the language model, when normalization succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_fields: Option<StructuredFields>,
}

impl ProcessingResult {
    pub fn success(
        file_name: impl Into<String>,
        extracted_diagnosis: String,
        corrected_diagnosis: String,
        structured_fields: Option<StructuredFields>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            extracted_diagnosis,
            corrected_diagnosis,
            processing_status: ProcessingStatus::Success,
            error_message: None,
            structured_fields,
        }
    }

    pub fn failed(file_name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            file_name: file_name.into(),
            extracted_diagnosis: ERROR_OCCURRED.to_string(),
            corrected_diagnosis: ERROR_OCCURRED.to_string(),
            processing_status: ProcessingStatus::Failed,
            error_message: Some(error.to_string()),
            structured_fields: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.processing_status == ProcessingStatus::Success
    }
}
