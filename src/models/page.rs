//! Recognized page structure returned by the OCR service.

use serde::{Deserialize, Serialize};

/// A single recognized word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// A recognized line of text, with its words in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<RecognizedWord>,
}

/// One page of OCR output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub lines: Vec<RecognizedLine>,
}

impl RecognizedLine {
    /// Words joined by single spaces. Falls back to the line text when the
    /// service returned no word breakdown.
    pub fn joined_words(&self) -> String {
        if self.words.is_empty() {
            return self.text.clone();
        }
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
