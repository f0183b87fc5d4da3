//! Prompts for structured-field extraction.

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the recognized form text.
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Full clinical extraction with diagnosis correction.
pub const CLINICAL_FIELDS_PROMPT: &str = r#"Parse the following text and create a JSON object with all the relevant information. Include fields such as "nature_of_illness", "relevant_critical_findings", "duration_of_ailment", "date_of_first_consultation", "past_history", "provisional_diagnosis", "icd_10_code", "proposed_treatment", and any other relevant fields you can extract. If a field is empty or not provided, include it with an empty string value.

After parsing, review the "provisional_diagnosis" field. If it doesn't make sense, seems incomplete or contains a spelling mistake, correct it based on the other information provided (especially "nature_of_illness", "relevant_critical_findings" and "past_history"), using medical knowledge to suggest a more appropriate provisional diagnosis. For example, if the nature of illness mentions "Cataract" and relevant findings include "RE Cataract Nuclear", but the provisional diagnosis is just "Nuclear", which doesn't make sense, change it to "RE cataract nuclear".

Text to parse:

{content}

Please return only the JSON object, without any additional formatting or explanation."#;

/// Diagnosis-only extraction.
pub const DIAGNOSIS_ONLY_PROMPT: &str = r#"The following text was recognized from a scanned medical form. Find the provisional diagnosis written on the form. Correct obvious OCR errors and spelling mistakes using the rest of the form as context, but do not invent a diagnosis that is not supported by the text.

Text to parse:

{content}

Return only a JSON object of the form {"provisional_diagnosis": "..."}, using an empty string if the form has no provisional diagnosis. No formatting or explanation."#;

/// Which built-in prompt to send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PromptRevision {
    /// Many clinical fields, with provisional-diagnosis correction
    #[default]
    Clinical,
    /// A single provisional_diagnosis key
    Diagnosis,
}

impl PromptRevision {
    pub fn template(&self) -> &'static str {
        match self {
            Self::Clinical => CLINICAL_FIELDS_PROMPT,
            Self::Diagnosis => DIAGNOSIS_ONLY_PROMPT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clinical => "clinical",
            Self::Diagnosis => "diagnosis",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clinical" | "full" => Some(Self::Clinical),
            "diagnosis" | "diagnosis-only" => Some(Self::Diagnosis),
            _ => None,
        }
    }
}
