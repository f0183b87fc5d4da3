//! OCR service abstraction.
//!
//! The batch processor talks to OCR through [`OcrService`] so that the cloud
//! client can be swapped for a fake in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::RecognizedPage;

/// Errors from OCR services.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR not configured: {0}")]
    NotConfigured(String),

    #[error("OCR request failed: {0}")]
    Request(String),

    #[error("OCR API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("OCR response missing Operation-Location header")]
    MissingOperation,

    #[error("OCR job {operation_id} failed")]
    JobFailed { operation_id: String },

    #[error("OCR job {operation_id} did not finish within {waited:?}")]
    Timeout {
        operation_id: String,
        waited: Duration,
    },

    #[error("Failed to parse OCR response: {0}")]
    Parse(String),
}

/// A text-recognition service.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Short name for logs and status output.
    fn name(&self) -> &str;

    /// Whether the service has what it needs to make requests.
    fn is_available(&self) -> bool;

    /// Describe what is missing, or the current setup when available.
    fn availability_hint(&self) -> String;

    /// Recognize text in an image.
    async fn recognize(&self, image: &[u8]) -> Result<Vec<RecognizedPage>, OcrError>;
}
