//! Flattening recognized pages into plain text.

use crate::models::RecognizedPage;

/// Text emitted for a page the service returned without any lines.
pub const NO_TEXT_PLACEHOLDER: &str = "No recognized text.";

/// Join recognized pages into newline-separated text, one line per OCR line.
pub fn recognized_text(pages: &[RecognizedPage]) -> String {
    let mut text = String::new();
    for page in pages {
        if page.lines.is_empty() {
            text.push_str(NO_TEXT_PLACEHOLDER);
            text.push('\n');
            continue;
        }
        for line in &page.lines {
            text.push_str(&line.joined_words());
            text.push('\n');
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecognizedLine, RecognizedWord};

    fn line(words: &[&str]) -> RecognizedLine {
        RecognizedLine {
            text: words.join(" "),
            words: words
                .iter()
                .map(|w| RecognizedWord {
                    text: w.to_string(),
                    confidence: Some(0.9),
                })
                .collect(),
        }
    }

    #[test]
    fn test_lines_joined_with_newlines() {
        let pages = vec![RecognizedPage {
            page: 1,
            lines: vec![
                line(&["Patient", "Name:", "R.", "Das"]),
                line(&["Provisional", "Diagnosis:", "Cataract"]),
            ],
        }];
        assert_eq!(
            recognized_text(&pages),
            "Patient Name: R. Das\nProvisional Diagnosis: Cataract\n"
        );
    }

    #[test]
    fn test_empty_page_placeholder() {
        let pages = vec![
            RecognizedPage {
                page: 1,
                lines: vec![],
            },
            RecognizedPage {
                page: 2,
                lines: vec![line(&["ok"])],
            },
        ];
        assert_eq!(recognized_text(&pages), "No recognized text.\nok\n");
        assert_eq!(recognized_text(&[]), "");
    }

    #[test]
    fn test_line_without_words_uses_text() {
        let pages = vec![RecognizedPage {
            page: 1,
            lines: vec![RecognizedLine {
                text: "ICD 10: H25.1".to_string(),
                words: vec![],
            }],
        }];
        assert_eq!(recognized_text(&pages), "ICD 10: H25.1\n");
    }
}
