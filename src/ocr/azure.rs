//! Azure Computer Vision Read API client.
//!
//! Recognition is asynchronous: the image is submitted to `read/analyze`,
//! which answers `202 Accepted` with an `Operation-Location` header. The job
//! is then polled at `read/analyzeResults/{id}` until it succeeds or fails.
//!
//! Polls back off exponentially from `initial_poll_delay_ms` up to
//! `max_poll_interval_secs`, and the whole job is bounded by `max_wait_secs`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::backend::{OcrError, OcrService};
use super::config::OcrConfig;
use crate::models::RecognizedPage;
use crate::rate_limit::backoff_delay;

const ANALYZE_PATH: &str = "vision/v3.2/read/analyze";
const RESULTS_PATH: &str = "vision/v3.2/read/analyzeResults/";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Status of a Read job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadOperationResult {
    status: JobStatus,
    #[serde(default)]
    created_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    read_results: Vec<RecognizedPage>,
}

/// Cloud OCR client for the Azure Read API.
pub struct AzureReadClient {
    config: OcrConfig,
    client: Client,
}

impl AzureReadClient {
    /// Create a new client. Missing credentials are reported per request,
    /// not here.
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| OcrError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    fn credentials(&self) -> Result<(Url, &str), OcrError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| OcrError::NotConfigured("VISION_ENDPOINT is not set".to_string()))?;
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OcrError::NotConfigured("VISION_KEY is not set".to_string()))?;
        Ok((base_url(endpoint)?, key))
    }

    /// Submit an image and return the operation id of the Read job.
    async fn submit(&self, base: &Url, key: &str, image: &[u8]) -> Result<String, OcrError> {
        let mut url = join(base, ANALYZE_PATH)?;
        if let Some(ref language) = self.config.language {
            url.query_pairs_mut().append_pair("language", language);
        }

        let resp = self
            .client
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| OcrError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let location = resp
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .ok_or(OcrError::MissingOperation)?;
        operation_id(location).ok_or(OcrError::MissingOperation)
    }

    async fn fetch_result(
        &self,
        base: &Url,
        key: &str,
        operation_id: &str,
    ) -> Result<ReadOperationResult, OcrError> {
        let url = join(base, &format!("{}{}", RESULTS_PATH, operation_id))?;
        let resp = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, key)
            .send()
            .await
            .map_err(|e| OcrError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| OcrError::Parse(e.to_string()))
    }

    /// Poll a Read job until it reaches a terminal status or the wait budget runs out.
    async fn poll(
        &self,
        base: &Url,
        key: &str,
        operation_id: &str,
    ) -> Result<Vec<RecognizedPage>, OcrError> {
        let started = Instant::now();
        let max_wait = self.config.max_wait();
        let mut attempt = 0;

        loop {
            let remaining = max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(
                    "OCR job {} still pending after {} polls",
                    operation_id, attempt
                );
                return Err(OcrError::Timeout {
                    operation_id: operation_id.to_string(),
                    waited: started.elapsed(),
                });
            }

            let delay = backoff_delay(
                attempt,
                self.config.initial_poll_delay(),
                self.config.max_poll_interval(),
            )
            .min(remaining);
            tokio::time::sleep(delay).await;
            attempt += 1;

            let result = self.fetch_result(base, key, operation_id).await?;
            match result.status {
                JobStatus::Succeeded => {
                    if let (Some(created), Some(updated)) =
                        (result.created_date_time, result.last_updated_date_time)
                    {
                        debug!(
                            "OCR job {} took {}ms server-side",
                            operation_id,
                            (updated - created).num_milliseconds()
                        );
                    }
                    let pages = result
                        .analyze_result
                        .map(|r| r.read_results)
                        .unwrap_or_default();
                    return Ok(pages);
                }
                JobStatus::Failed => {
                    return Err(OcrError::JobFailed {
                        operation_id: operation_id.to_string(),
                    })
                }
                JobStatus::NotStarted | JobStatus::Running | JobStatus::Unknown => {
                    debug!(
                        "OCR job {} status {:?} (poll {})",
                        operation_id, result.status, attempt
                    );
                }
            }
        }
    }
}

#[async_trait]
impl OcrService for AzureReadClient {
    fn name(&self) -> &str {
        "azure-read"
    }

    fn is_available(&self) -> bool {
        self.credentials().is_ok()
    }

    fn availability_hint(&self) -> String {
        match self.credentials() {
            Ok((base, _)) => format!("Azure Read API is available (endpoint: {})", base),
            Err(e) => format!(
                "{}. Set VISION_ENDPOINT and VISION_KEY, or [ocr] endpoint/api_key in the config file",
                e
            ),
        }
    }

    async fn recognize(&self, image: &[u8]) -> Result<Vec<RecognizedPage>, OcrError> {
        let (base, key) = self.credentials()?;
        let operation_id = self.submit(&base, key, image).await?;
        info!("Submitted OCR job {} ({} bytes)", operation_id, image.len());
        self.poll(&base, key, &operation_id).await
    }
}

/// Parse an endpoint into a base URL that relative paths can be joined onto.
fn base_url(endpoint: &str) -> Result<Url, OcrError> {
    let endpoint = endpoint.trim();
    let with_slash = if endpoint.ends_with('/') {
        endpoint.to_string()
    } else {
        format!("{}/", endpoint)
    };
    Url::parse(&with_slash)
        .map_err(|e| OcrError::NotConfigured(format!("invalid endpoint {:?}: {}", endpoint, e)))
}

fn join(base: &Url, path: &str) -> Result<Url, OcrError> {
    base.join(path)
        .map_err(|e| OcrError::Request(format!("invalid request URL: {}", e)))
}

/// The operation id is the last path segment of the Operation-Location URL.
fn operation_id(location: &str) -> Option<String> {
    let trimmed = location.trim().trim_end_matches('/');
    let path = trimmed.split('?').next().unwrap_or(trimmed);
    path.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
