//! Diagnosis extraction from plain text.

use std::path::Path;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use medform::config::Config;
use medform::llm::Normalizer;
use medform::services::extract_provisional_diagnosis;

/// Print the provisional diagnosis found in a text file or stdin.
pub async fn cmd_extract(config: &Config, file: Option<&Path>, normalize: bool) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            text
        }
    };

    println!("{}", extract_provisional_diagnosis(&text));

    if normalize {
        let normalizer = Normalizer::from_config(config.llm.clone())?;
        let fields = normalizer.normalize(&text).await?;
        println!("{}", serde_json::to_string_pretty(&fields)?);
    }

    Ok(())
}
