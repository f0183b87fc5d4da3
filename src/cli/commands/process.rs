//! Batch processing command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use console::style;
use tracing::warn;

use medform::config::Config;
use medform::export::{export_to_path, ExportFormat};
use medform::llm::Normalizer;
use medform::models::{ProcessingResult, UploadedFile};
use medform::ocr::AzureReadClient;
use medform::services::BatchProcessor;

use super::ProcessArgs;
use crate::cli::icons;
use crate::cli::progress::BatchProgress;

/// File extensions picked up when a directory is given.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "pdf"];

/// Widest a table cell may get before it is cut short.
const MAX_CELL_WIDTH: usize = 40;

/// OCR every file and print or export the results.
pub async fn cmd_process(config: &Config, args: &ProcessArgs) -> anyhow::Result<()> {
    let paths = expand_paths(&args.paths)?;
    if paths.is_empty() {
        anyhow::bail!("No image files found");
    }

    for setting in config.missing_settings() {
        warn!("Missing setting: {}", setting);
        eprintln!("{} Missing setting: {}", icons::warn(), setting);
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = UploadedFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }

    let ocr = AzureReadClient::new(config.ocr.clone())?;
    let normalizer = Normalizer::from_config(config.llm.clone())?;
    let processor = BatchProcessor::new(Arc::new(ocr), normalizer, config.batch.clone());

    eprintln!(
        "{} Processing {} file(s) at {} per minute",
        icons::dim_arrow(),
        files.len(),
        config.batch.rate_per_minute
    );

    let progress = BatchProgress::new(files.len())?;
    let results = processor
        .process(&files, |fraction| progress.set_fraction(fraction))
        .await?;
    progress.finish();

    if !args.quiet {
        print_results_table(&results);
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        eprintln!(
            "{} {} of {} file(s) failed",
            icons::error(),
            failed,
            results.len()
        );
    } else {
        eprintln!("{} Processed {} file(s)", icons::success(), results.len());
    }

    if let Some(output) = args.output.clone().or_else(|| config.export_output()) {
        let format = args
            .format
            .or_else(|| ExportFormat::from_path(&output))
            .or(config.export.format)
            .unwrap_or_default();
        export_to_path(&results, format, &output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!(
            "{} Wrote {} results to {}",
            icons::success(),
            format.as_str(),
            output.display()
        );
    }

    Ok(())
}

/// Expand directories (non-recursively) to image files sorted by name.
/// Explicit files are kept as given, in argument order.
fn expand_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Failed to read directory {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_image_extension(p))
                .collect();
            found.sort();
            expanded.extend(found);
        } else if path.is_file() {
            expanded.push(path.clone());
        } else {
            anyhow::bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(expanded)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn print_results_table(results: &[ProcessingResult]) {
    let headers = [
        "File Name",
        "Extracted Diagnosis",
        "Corrected Diagnosis",
        "Status",
    ];
    let rows: Vec<[String; 3]> = results
        .iter()
        .map(|r| {
            [
                cell(&r.file_name),
                cell(&r.extracted_diagnosis),
                cell(&r.corrected_diagnosis),
            ]
        })
        .collect();

    let mut widths = [headers[0].len(), headers[1].len(), headers[2].len()];
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    println!();
    println!(
        "{}",
        style(format!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            headers[0],
            headers[1],
            headers[2],
            headers[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        ))
        .bold()
    );
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 6 + headers[3].len()));

    for (row, result) in rows.iter().zip(results) {
        let status = if result.is_success() {
            style(result.processing_status.as_str()).green()
        } else {
            style(result.processing_status.as_str()).red()
        };
        println!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            row[0],
            row[1],
            row[2],
            status,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        );
        if let Some(ref message) = result.error_message {
            println!("  {} {}", icons::dim_arrow(), style(message).dim());
        }
    }
    println!();
}

/// Single-line cell text, cut at [`MAX_CELL_WIDTH`] characters.
fn cell(value: &str) -> String {
    let flat = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    cut.push('…');
    cut
}
