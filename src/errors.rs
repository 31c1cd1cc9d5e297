// src/errors.rs

//! Top-level error type returned by config loading and the analysis engine.

use thiserror::Error;

use crate::backend::GatewayError;
use crate::import::ImportError;
use crate::types::ItemKind;

#[derive(Error, Debug)]
pub enum BackstageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A backend call was rejected; the message is the backend's.
    #[error("Backend error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("No project loaded")]
    NoProject,

    #[error("Unknown {kind} item: {id}")]
    UnknownItem { kind: ItemKind, id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BackstageError>;
