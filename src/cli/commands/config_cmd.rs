//! Configuration display command.

use medform::config::Config;

use crate::cli::icons;

/// Print the effective configuration with secrets masked.
pub fn cmd_config_show(config: &Config, json: bool) -> anyhow::Result<()> {
    if let Some(ref path) = config.source_path {
        eprintln!("{} Source: {}", icons::dim_arrow(), path.display());
    } else {
        eprintln!(
            "{} No config file found; showing defaults with environment overrides",
            icons::warn()
        );
    }

    let shown = config.redacted();
    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        let text = toml::to_string_pretty(&shown)?;
        if text.trim().is_empty() {
            println!("# all settings are at their defaults");
        } else {
            print!("{}", text);
        }
    }
    Ok(())
}
