use std::path::Path;

use carelog_core::SyncConfig;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::load_sync_config;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    path: String,
    exists: bool,
    #[serde(flatten)]
    config: &'a SyncConfig,
}

pub fn run_config(command: Option<ConfigCommands>, config_path: &Path) -> Result<(), CliError> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => run_config_show(config_path),
        ConfigCommands::Init { force } => {
            write_default_config(config_path, force)?;
            println!("Wrote default sync config to {}", config_path.display());
            Ok(())
        }
    }
}

pub fn run_config_show(config_path: &Path) -> Result<(), CliError> {
    let config = load_sync_config(config_path)?;
    let effective = EffectiveConfig {
        path: config_path.display().to_string(),
        exists: config_path.exists(),
        config: &config,
    };
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(())
}

/// Write `SyncConfig::default()` to `config_path`, creating parent dirs.
pub fn write_default_config(config_path: &Path, force: bool) -> Result<(), CliError> {
    if config_path.exists() && !force {
        return Err(CliError::ConfigExists(config_path.to_path_buf()));
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(&SyncConfig::default())?;
    std::fs::write(config_path, format!("{payload}\n"))?;
    tracing::info!("Initialized sync config at {}", config_path.display());
    Ok(())
}
