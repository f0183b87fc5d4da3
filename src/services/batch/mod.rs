//! Sequential, rate-limited batch processing of uploaded forms.
//!
//! Each file goes through OCR, then the diagnosis extractor and the
//! language-model normalizer. Files are processed strictly one at a time, in
//! input order, with request starts spaced by a [`RatePacer`]. A failure in
//! one file becomes a failed [`ProcessingResult`] and never stops the batch.

mod types;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::Normalizer;
use crate::models::{ProcessingResult, UploadedFile, ERROR_OCCURRED};
use crate::ocr::{recognized_text, OcrService};
use crate::rate_limit::RatePacer;
use crate::services::diagnosis::{extract_provisional_diagnosis, NOT_FOUND};

pub use types::{BatchError, BatchOptions, ExtractedDiagnosisMode, FallbackPolicy, FileStage};

/// Runs uploaded files through OCR and normalization.
pub struct BatchProcessor {
    ocr: Arc<dyn OcrService>,
    normalizer: Normalizer,
    options: BatchOptions,
}

impl BatchProcessor {
    pub fn new(ocr: Arc<dyn OcrService>, normalizer: Normalizer, options: BatchOptions) -> Self {
        Self {
            ocr,
            normalizer,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every file in order and return one result per file.
    ///
    /// `on_progress` is called after each file with the completed fraction;
    /// the last call is exactly `1.0`. An invalid rate is rejected before any
    /// file is touched.
    pub async fn process<F>(
        &self,
        files: &[UploadedFile],
        mut on_progress: F,
    ) -> Result<Vec<ProcessingResult>, BatchError>
    where
        F: FnMut(f64),
    {
        let mut pacer = RatePacer::per_minute(self.options.rate_per_minute, self.options.pacing)?;
        let total = files.len();
        let mut results = Vec::with_capacity(total);

        info!(
            "Processing {} file(s) at {} per minute ({} pacing)",
            total,
            self.options.rate_per_minute,
            self.options.pacing.as_str()
        );

        for (index, file) in files.iter().enumerate() {
            pacer.wait_turn().await;
            let result = self.process_file(file).await;
            results.push(result);
            on_progress((index + 1) as f64 / total as f64);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Batch complete: {} succeeded, {} failed",
            total - failed,
            failed
        );
        Ok(results)
    }

    /// Process a single file. Errors end up in the returned result.
    pub async fn process_file(&self, file: &UploadedFile) -> ProcessingResult {
        let name = file.name();
        let stage = |next: FileStage| debug!("{}: {}", name, next);

        stage(FileStage::Pending);
        stage(FileStage::OcrInFlight);
        let pages = match self.ocr.recognize(file.bytes()).await {
            Ok(pages) => pages,
            Err(e) => {
                stage(FileStage::OcrFailed);
                warn!("OCR failed for {}: {}", name, e);
                stage(FileStage::Done { success: false });
                return ProcessingResult::failed(name, e);
            }
        };
        stage(FileStage::OcrSucceeded);

        let text = recognized_text(&pages);
        let found = extract_provisional_diagnosis(&text);
        let extracted = match self.options.extracted_mode {
            ExtractedDiagnosisMode::Field => found.clone(),
            ExtractedDiagnosisMode::RawText => text.trim_end().to_string(),
        };

        stage(FileStage::NormalizerInFlight);
        let result = match self.normalizer.normalize(&text).await {
            Ok(fields) => {
                let corrected = fields.diagnosis().unwrap_or(NOT_FOUND).to_string();
                ProcessingResult::success(name, extracted, corrected, Some(fields))
            }
            Err(e) => {
                warn!("Normalization failed for {}, using fallback: {}", name, e);
                let corrected = match self.options.fallback {
                    FallbackPolicy::Extracted => found,
                    FallbackPolicy::ErrorString => ERROR_OCCURRED.to_string(),
                };
                ProcessingResult::success(name, extracted, corrected, None)
            }
        };
        stage(FileStage::Done { success: true });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, TextGenerator};
    use crate::models::{ProcessingStatus, RecognizedLine, RecognizedPage};
    use crate::ocr::OcrError;
    use crate::rate_limit::{PacingMode, RateError};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Recognizes every image as one line of text: the image bytes themselves.
    /// Images starting with "fail" produce an OCR error.
    struct EchoOcr {
        latency: Duration,
    }

    #[async_trait]
    impl OcrService for EchoOcr {
        fn name(&self) -> &str {
            "echo"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            "always available".to_string()
        }

        async fn recognize(&self, image: &[u8]) -> Result<Vec<RecognizedPage>, OcrError> {
            tokio::time::sleep(self.latency).await;
            let text = String::from_utf8_lossy(image).to_string();
            if text.starts_with("fail") {
                return Err(OcrError::Api {
                    status: 500,
                    body: "internal error".to_string(),
                });
            }
            Ok(vec![RecognizedPage {
                page: 1,
                lines: vec![RecognizedLine {
                    text,
                    words: Vec::new(),
                }],
            }])
        }
    }

    struct FixedReply(&'static str);

    #[async_trait]
    impl TextGenerator for FixedReply {
        fn name(&self) -> String {
            "fixed".to_string()
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn processor(reply: &'static str, options: BatchOptions) -> BatchProcessor {
        BatchProcessor::new(
            Arc::new(EchoOcr {
                latency: Duration::ZERO,
            }),
            Normalizer::new(Arc::new(FixedReply(reply)), "{content}", 1000),
            options,
        )
    }

    fn files(contents: &[&str]) -> Vec<UploadedFile> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| UploadedFile::new(format!("form{}.png", i + 1), c.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_files_respect_rate() {
        let processor = processor(
            r#"{"provisional_diagnosis": "RE cataract nuclear"}"#,
            BatchOptions::default(),
        );
        let files = files(&[
            "Provisional Diagnosis: Nuclear",
            "Provisional Diagnosis: Cataract",
            "nothing here",
        ]);

        let started = Instant::now();
        let mut progress = Vec::new();
        let results = processor
            .process(&files, |p| progress.push(p))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(8));
        assert_eq!(results.len(), 3);
        let names: Vec<_> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, ["form1.png", "form2.png", "form3.png"]);
        assert_eq!(results[0].extracted_diagnosis, "Nuclear");
        assert_eq!(results[1].extracted_diagnosis, "Cataract");
        assert_eq!(results[2].extracted_diagnosis, NOT_FOUND);
        assert!(results
            .iter()
            .all(|r| r.corrected_diagnosis == "RE cataract nuclear"));

        assert_eq!(progress.len(), 3);
        assert!((progress[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((progress[1] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(progress[2], 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_pacing_absorbs_latency() {
        let slow = |pacing| {
            BatchProcessor::new(
                Arc::new(EchoOcr {
                    latency: Duration::from_secs(3),
                }),
                Normalizer::new(Arc::new(FixedReply("{}")), "{content}", 1000),
                BatchOptions::default().with_pacing(pacing),
            )
        };
        let files = files(&["a", "b", "c"]);

        let started = Instant::now();
        slow(PacingMode::Interval)
            .process(&files, |_| {})
            .await
            .unwrap();
        // Starts at 0, 4 and 8 seconds; the last OCR call takes 3 more.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(11) && elapsed < Duration::from_secs(12));

        let started = Instant::now();
        slow(PacingMode::FixedDelay)
            .process(&files, |_| {})
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(17) && elapsed < Duration::from_secs(18));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let processor = processor("{}", BatchOptions::default());
        let mut calls = 0;
        let results = processor.process(&[], |_| calls += 1).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_reply_falls_back() {
        let files = files(&["Provisional Diagnosis: Cataract"]);

        let results = processor("not json", BatchOptions::default())
            .process(&files, |_| {})
            .await
            .unwrap();
        assert_eq!(results[0].processing_status, ProcessingStatus::Success);
        assert_eq!(results[0].corrected_diagnosis, "Cataract");
        assert!(results[0].structured_fields.is_none());

        let options = BatchOptions::default().with_fallback(FallbackPolicy::ErrorString);
        let results = processor("not json", options)
            .process(&files, |_| {})
            .await
            .unwrap();
        assert_eq!(results[0].processing_status, ProcessingStatus::Success);
        assert_eq!(results[0].corrected_diagnosis, ERROR_OCCURRED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_model_diagnosis_is_not_found() {
        let files = files(&["Provisional Diagnosis: Cataract"]);
        let results = processor(r#"{"provisional_diagnosis": ""}"#, BatchOptions::default())
            .process(&files, |_| {})
            .await
            .unwrap();
        assert_eq!(results[0].corrected_diagnosis, NOT_FOUND);
        assert!(results[0].structured_fields.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ocr_failure_does_not_stop_batch() {
        let files = files(&["fail me", "Provisional diagnosis: Glaucoma"]);
        let mut progress = Vec::new();
        let results = processor(r#"{"provisional_diagnosis": "Glaucoma"}"#, BatchOptions::default())
            .process(&files, |p| progress.push(p))
            .await
            .unwrap();

        assert_eq!(results[0].processing_status, ProcessingStatus::Failed);
        assert_eq!(results[0].extracted_diagnosis, ERROR_OCCURRED);
        assert_eq!(results[0].corrected_diagnosis, ERROR_OCCURRED);
        assert!(results[0].error_message.as_deref().unwrap().contains("500"));
        assert_eq!(results[1].processing_status, ProcessingStatus::Success);
        assert_eq!(results[1].corrected_diagnosis, "Glaucoma");
        assert_eq!(progress, [0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_raw_text_mode() {
        let options = BatchOptions::default()
            .with_rate(600.0)
            .with_extracted_mode(ExtractedDiagnosisMode::RawText);
        let files = files(&["Provisional Diagnosis: Cataract"]);
        let results = processor("{}", options)
            .process(&files, |_| {})
            .await
            .unwrap();
        assert_eq!(
            results[0].extracted_diagnosis,
            "Provisional Diagnosis: Cataract"
        );
    }

    #[tokio::test]
    async fn test_invalid_rate_rejected() {
        let options = BatchOptions::default().with_rate(0.0);
        let err = processor("{}", options)
            .process(&files(&["a"]), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Rate(RateError::InvalidRate(_))));
    }
}
