//! Provisional-diagnosis lookup in recognized form text.

use std::sync::LazyLock;

use regex::Regex;

/// Returned when the form has no provisional diagnosis.
pub const NOT_FOUND: &str = "Not found";

/// "provisional diagnosis" label, optional colon, then the next non-blank text
/// up to the end of its line. The value may sit on the line after the label.
static PROVISIONAL_DIAGNOSIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)provisional\s+diagnosis\s*:?\s*([^\r\n]*)").unwrap()
});

/// Find the provisional diagnosis written on the form.
///
/// Returns the trimmed text following the first label, or [`NOT_FOUND`] when
/// the label is missing or only whitespace follows it.
pub fn extract_provisional_diagnosis(text: &str) -> String {
    PROVISIONAL_DIAGNOSIS
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_FOUND)
        .to_string()
}
