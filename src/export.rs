//! Spreadsheet-compatible export of processing results.

use std::io::Write;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ProcessingResult;

/// Column headers for tabular exports.
pub const CSV_HEADERS: [&str; 4] = [
    "File Name",
    "Extracted Diagnosis",
    "Corrected Diagnosis",
    "Processing Status",
];

/// Worksheet name used in workbook exports.
pub const SHEET_NAME: &str = "Extraction Results";

/// Column widths for the workbook, in character units.
const XLSX_COLUMN_WIDTHS: [f64; 4] = [30.0, 40.0, 40.0, 18.0];

/// Export format options.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Json,
    Jsonl,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to build workbook: {0}")]
    Workbook(#[from] XlsxError),
}

/// Write results in the given format.
pub fn write_results<W: Write>(
    results: &[ProcessingResult],
    format: ExportFormat,
    mut writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, results)?;
            writeln!(writer)?;
        }
        ExportFormat::Jsonl => {
            for result in results {
                serde_json::to_writer(&mut writer, result)?;
                writeln!(writer)?;
            }
        }
        ExportFormat::Csv => {
            writeln!(writer, "{}", CSV_HEADERS.join(","))?;
            for result in results {
                writeln!(
                    writer,
                    "{},{},{},{}",
                    escape_csv(&result.file_name),
                    escape_csv(&result.extracted_diagnosis),
                    escape_csv(&result.corrected_diagnosis),
                    result.processing_status
                )?;
            }
        }
        ExportFormat::Xlsx => {
            writer.write_all(&workbook_bytes(results)?)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write results to a file, creating or truncating it.
pub fn export_to_path(
    results: &[ProcessingResult],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_results(results, format, std::io::BufWriter::new(file))
}

/// Build an `.xlsx` workbook with a bold header row and one row per result.
fn workbook_bytes(results: &[ProcessingResult]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, (title, width)) in CSV_HEADERS.iter().zip(XLSX_COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, width)?;
    }
    for (index, result) in results.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, result.file_name.as_str())?;
        sheet.write_string(row, 1, result.extracted_diagnosis.as_str())?;
        sheet.write_string(row, 2, result.corrected_diagnosis.as_str())?;
        sheet.write_string(row, 3, result.processing_status.as_str())?;
    }

    workbook.save_to_buffer()
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ProcessingResult> {
        vec![
            ProcessingResult::success(
                "form1.png",
                "Nuclear".to_string(),
                "RE cataract, nuclear".to_string(),
                None,
            ),
            ProcessingResult::failed("form2.png", "OCR job abc failed"),
        ]
    }

    #[test]
    fn test_csv_export() {
        let mut out = Vec::new();
        write_results(&sample(), ExportFormat::Csv, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "File Name,Extracted Diagnosis,Corrected Diagnosis,Processing Status",
                "form1.png,Nuclear,\"RE cataract, nuclear\",Success",
                "form2.png,Error occurred,Error occurred,Failed",
            ]
        );
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_jsonl_export_carries_error_message() {
        let mut out = Vec::new();
        write_results(&sample(), ExportFormat::Jsonl, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["processing_status"], "Success");
        assert!(rows[0].get("error_message").is_none());
        assert_eq!(rows[1]["error_message"], "OCR job abc failed");
    }

    #[test]
    fn test_json_export_round_trips() {
        let mut out = Vec::new();
        write_results(&sample(), ExportFormat::Json, &mut out).unwrap();
        let parsed: Vec<ProcessingResult> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/results.CSV")),
            Some(ExportFormat::Csv)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("r.ndjson")),
            Some(ExportFormat::Jsonl)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("r.xlsx")),
            Some(ExportFormat::Xlsx)
        );
        assert_eq!(ExportFormat::from_path(Path::new("r.xls")), None);
    }

    #[test]
    fn test_export_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        export_to_path(&sample(), ExportFormat::Csv, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("File Name,"));
    }

    #[test]
    fn test_xlsx_export_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        let format = ExportFormat::from_path(&path).unwrap();
        export_to_path(&sample(), format, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container
        assert!(bytes.starts_with(b"PK\x03\x04"));
        let as_text = String::from_utf8_lossy(&bytes);
        assert!(as_text.contains("xl/worksheets/sheet1.xml"));
    }

    #[test]
    fn test_xlsx_empty_results() {
        let mut out = Vec::new();
        write_results(&[], ExportFormat::Xlsx, &mut out).unwrap();
        assert!(out.starts_with(b"PK"));
    }
}
