use crate::cli::ConfigCommands;
use anyhow::Result;
use brief_server::BriefConfig;
use std::path::Path;

pub async fn run(cmd: ConfigCommands, config_path: &Path, effective: BriefConfig) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => validate(config_path),
        ConfigCommands::Show => show(&effective),
    }
}

fn validate(config_path: &Path) -> Result<()> {
    let config = BriefConfig::load(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", config_path.display(), e))?;

    let errors = config.validate();
    if !errors.is_empty() {
        let listed: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
        anyhow::bail!(
            "Validation errors in {}:\n{}",
            config_path.display(),
            listed.join("\n")
        );
    }

    println!("{} is valid.", config_path.display());
    if config.model.provider == "gemini" && config.model.resolved_api_key().is_none() {
        println!("note: no Gemini API key found; model calls will be disabled");
    }
    Ok(())
}

/// Print the effective configuration (file, defaults and flag overrides).
/// The API key is never printed.
fn show(config: &BriefConfig) -> Result<()> {
    let mut redacted = config.clone();
    redacted.model.api_key = None;
    match toml::to_string_pretty(&redacted) {
        Ok(s) => println!("{}", s),
        Err(e) => anyhow::bail!("Failed to serialize config: {}", e),
    }
    Ok(())
}
