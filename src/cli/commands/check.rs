//! Configuration and service availability report.

use console::style;

use medform::config::Config;
use medform::llm::{LlmClient, TextGenerator};
use medform::ocr::{AzureReadClient, OcrService};

use crate::cli::icons;

/// Show which settings are in effect and which are missing.
pub async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    println!("\n{}", style("medform configuration").bold());
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {}",
        "Config file:",
        config
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none (defaults + environment)".to_string())
    );

    let ocr = AzureReadClient::new(config.ocr.clone())?;
    println!("{:<20} {}", "OCR service:", ocr.name());
    println!(
        "{:<20} {}",
        "OCR endpoint:",
        config.ocr.endpoint.as_deref().unwrap_or("Not set")
    );
    println!("{:<20} {}s", "OCR max wait:", config.ocr.max_wait_secs);

    let llm = LlmClient::new(config.llm.clone())?;
    println!("{:<20} {}", "LLM provider:", config.llm.provider);
    println!("{:<20} {}", "LLM endpoint:", config.llm.endpoint());
    println!("{:<20} {}", "LLM model:", config.llm.model());
    println!(
        "{:<20} {}",
        "LLM API key:",
        if config.llm.api_key.is_some() {
            "Set"
        } else {
            "Not set"
        }
    );
    println!("{:<20} {}", "Prompt:", config.llm.prompt_revision.as_str());
    println!(
        "{:<20} {}/min ({})",
        "Rate limit:",
        config.batch.rate_per_minute,
        config.batch.pacing.as_str()
    );
    println!(
        "{:<20} {}",
        "Fallback:",
        config.batch.fallback.as_str()
    );
    println!();

    if ocr.is_available() {
        println!("{} {}", icons::success(), ocr.availability_hint());
    } else {
        println!("{} {}", icons::warn(), ocr.availability_hint());
    }

    if llm.is_available() {
        println!("{} {} is configured", icons::success(), llm.name());
    } else {
        println!(
            "{} {} needs an API key (LLM_API_KEY, GEMINI_API_KEY or [llm] api_key)",
            icons::warn(),
            llm.name()
        );
    }

    let missing = config.missing_settings();
    if missing.is_empty() {
        println!("{} Ready to process forms", icons::success());
    } else {
        for setting in &missing {
            println!("{} Missing: {}", icons::error(), setting);
        }
    }

    Ok(())
}
