//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod config_cmd;
mod extract;
mod process;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use medform::config::Config;
use medform::export::ExportFormat;
use medform::llm::{LlmProvider, PromptRevision};
use medform::rate_limit::PacingMode;
use medform::services::{ExtractedDiagnosisMode, FallbackPolicy};

#[derive(Parser)]
#[command(name = "medform")]
#[command(about = "Medical form OCR and provisional-diagnosis extraction")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// OCR form images and extract provisional diagnoses
    Process(ProcessArgs),

    /// Find the provisional diagnosis in recognized text
    Extract {
        /// Text file to read (stdin when omitted)
        file: Option<PathBuf>,
        /// Also ask the language model for structured fields
        #[arg(long)]
        normalize: bool,
    },

    /// Report configuration problems and service availability
    Check,

    /// Print the effective configuration (API keys masked)
    Config {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
pub struct ProcessArgs {
    /// Image files or directories of images
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Write results to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Export format (defaults to the output file's extension, then csv)
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,
    /// Files started per minute
    #[arg(short, long)]
    rate: Option<f64>,
    /// How to space requests
    #[arg(long, value_enum)]
    pacing: Option<PacingMode>,
    /// Corrected diagnosis to use when the language model fails
    #[arg(long, value_enum)]
    fallback: Option<FallbackPolicy>,
    /// What to put in the "Extracted Diagnosis" column
    #[arg(long, value_enum)]
    extracted: Option<ExtractedDiagnosisMode>,
    /// Language model provider
    #[arg(long, value_enum)]
    provider: Option<LlmProvider>,
    /// Language model name
    #[arg(long)]
    model: Option<String>,
    /// Built-in prompt to send
    #[arg(long, value_enum)]
    prompt_revision: Option<PromptRevision>,
    /// Give up on an OCR job after this many seconds
    #[arg(long)]
    max_wait: Option<u64>,
    /// Do not print the results table
    #[arg(short, long)]
    quiet: bool,
}

impl ProcessArgs {
    /// Apply command-line overrides on top of file and environment settings.
    fn apply_to(&self, config: &mut Config) {
        if let Some(rate) = self.rate {
            config.batch.rate_per_minute = rate;
        }
        if let Some(pacing) = self.pacing {
            config.batch.pacing = pacing;
        }
        if let Some(fallback) = self.fallback {
            config.batch.fallback = fallback;
        }
        if let Some(mode) = self.extracted {
            config.batch.extracted_mode = mode;
        }
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(ref model) = self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(revision) = self.prompt_revision {
            config.llm.prompt_revision = revision;
        }
        if let Some(secs) = self.max_wait {
            config.ocr.max_wait_secs = secs;
        }
    }
}

async fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::load().await),
    }
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref()).await?;

    match cli.command {
        Commands::Process(args) => {
            args.apply_to(&mut config);
            process::cmd_process(&config, &args).await
        }
        Commands::Extract { file, normalize } => {
            extract::cmd_extract(&config, file.as_deref(), normalize).await
        }
        Commands::Check => check::cmd_check(&config).await,
        Commands::Config { json } => config_cmd::cmd_config_show(&config, json),
    }
}
