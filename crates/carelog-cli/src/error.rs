use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] carelog_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Care recipient scope cannot be empty")]
    EmptyScope,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Config file already exists at {}; pass --force to overwrite", .0.display())]
    ConfigExists(PathBuf),
}
