//! Turns recognized form text into [`StructuredFields`] via a language model.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use super::client::{
    truncate_content, LlmClient, LlmConfig, LlmError, TextGenerator, CONTENT_PLACEHOLDER,
};
use crate::models::{FieldError, StructuredFields};

/// Fenced-code markers the model wraps its JSON in.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```json\n?|\n?```").unwrap());

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("model response is not valid JSON: {0}")]
    Parse(String),

    #[error("model response rejected: {0}")]
    Validation(#[from] FieldError),
}

/// Remove ```` ```json ```` / ```` ``` ```` markers and surrounding whitespace.
pub fn strip_code_fences(response: &str) -> String {
    CODE_FENCE.replace_all(response, "").trim().to_string()
}

/// Parse a raw model response into validated fields.
pub fn parse_fields(response: &str) -> Result<StructuredFields, NormalizeError> {
    let cleaned = strip_code_fences(response);
    let value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| NormalizeError::Parse(e.to_string()))?;
    Ok(StructuredFields::from_json_value(value)?)
}

/// Sends recognized text to a [`TextGenerator`] with a fixed instruction.
#[derive(Clone)]
pub struct Normalizer {
    generator: Arc<dyn TextGenerator>,
    template: String,
    max_content_chars: usize,
}

impl Normalizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        template: impl Into<String>,
        max_content_chars: usize,
    ) -> Self {
        Self {
            generator,
            template: template.into(),
            max_content_chars,
        }
    }

    /// Build a normalizer backed by an [`LlmClient`].
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let template = config.prompt_template().to_string();
        let max_content_chars = config.max_content_chars;
        let client = LlmClient::new(config)?;
        Ok(Self::new(Arc::new(client), template, max_content_chars))
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Embed the text into the prompt template.
    pub fn build_prompt(&self, text: &str) -> String {
        let content = truncate_content(text, self.max_content_chars);
        if content.len() < text.len() {
            debug!(
                "Truncated recognized text from {} to {} bytes",
                text.len(),
                content.len()
            );
        }
        self.template.replace(CONTENT_PLACEHOLDER, content)
    }

    pub async fn normalize(&self, text: &str) -> Result<StructuredFields, NormalizeError> {
        let prompt = self.build_prompt(text);
        let response = self.generator.generate(&prompt).await?;
        parse_fields(&response).inspect_err(|e| {
            warn!(
                "Unusable response from {}: {} ({} bytes)",
                self.generator.name(),
                e,
                response.len()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedGenerator {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        fn name(&self) -> String {
            "canned".to_string()
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(LlmError::Api)
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"a\": 1}\n```"),
            "{\"a\": 1}"
        );
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_fenced_json_response() {
        let generator = CannedGenerator::replying("```json {\"provisional_diagnosis\":\"X\"} ```");
        let normalizer = Normalizer::new(generator.clone(), "Parse: {content}", 100);

        let fields = normalizer.normalize("form text").await.unwrap();
        assert_eq!(fields.provisional_diagnosis, "X");
        assert_eq!(
            generator.prompts.lock().unwrap().as_slice(),
            ["Parse: form text".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_json_response_is_parse_error() {
        let generator = CannedGenerator::replying("I could not read this form.");
        let normalizer = Normalizer::new(generator, "{content}", 100);

        let err = normalizer.normalize("text").await.unwrap_err();
        assert!(matches!(err, NormalizeError::Parse(_)));
    }

    #[tokio::test]
    async fn test_json_array_is_validation_error() {
        let generator = CannedGenerator::replying("[\"Cataract\"]");
        let normalizer = Normalizer::new(generator, "{content}", 100);

        let err = normalizer.normalize("text").await.unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Validation(FieldError::NotAnObject("array"))
        ));
    }

    #[tokio::test]
    async fn test_llm_error_passes_through() {
        let generator = Arc::new(CannedGenerator {
            reply: Err("HTTP 503".to_string()),
            prompts: Mutex::new(Vec::new()),
        });
        let normalizer = Normalizer::new(generator, "{content}", 100);

        let err = normalizer.normalize("text").await.unwrap_err();
        assert!(matches!(err, NormalizeError::Llm(LlmError::Api(_))));
    }

    #[test]
    fn test_prompt_truncates_content() {
        let normalizer = Normalizer::new(CannedGenerator::replying("{}"), "<{content}>", 4);
        assert_eq!(normalizer.build_prompt("abcdefgh"), "<abcd>");
    }
}
