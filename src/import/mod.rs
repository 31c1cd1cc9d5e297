// src/import/mod.rs

//! Import wizard: a strict step machine that drives one import at a time.
//!
//! - [`session`] holds the pure state ([`ImportSession`]) and its
//!   transitions. It performs no IO and is tested directly.
//! - [`controller`] wraps the session with the backend gateway and the
//!   import event topic ([`ImportController`]).

pub mod controller;
pub mod session;

use std::fmt;

use thiserror::Error;

pub use controller::ImportController;
pub use session::{EventDisposition, ImportSession};

/// Maximum title length, counted in characters of the trimmed title.
pub const MAX_TITLE_CHARS: usize = 255;

/// Log line written when execution starts.
pub const STARTING_IMPORT_LINE: &str = "Starting import...";

/// Error used when a failed completion carries no message.
pub const DEFAULT_FAILURE: &str = "Import failed";

/// Wizard step. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportStep {
    #[default]
    FileSelect,
    TitleEntry,
    Confirm,
    CollisionResolve,
    Executing,
    Result,
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportStep::FileSelect => "file-select",
            ImportStep::TitleEntry => "title-entry",
            ImportStep::Confirm => "confirm",
            ImportStep::CollisionResolve => "collision-resolve",
            ImportStep::Executing => "executing",
            ImportStep::Result => "result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportStatus {
    #[default]
    Idle,
    InProgress,
    Success,
    Failed,
}

/// Why an import operation was refused or ended badly.
///
/// `Display` output is what ends up in the session's `error` field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Title cannot exceed {MAX_TITLE_CHARS} characters")]
    TitleTooLong,

    #[error("{0}")]
    Gateway(String),

    #[error("Cannot {operation} from step {step}")]
    InvalidStep {
        operation: &'static str,
        step: ImportStep,
    },

    #[error("An import is already running")]
    AlreadyRunning,

    #[error("Import cancelled by user")]
    Cancelled,
}

impl From<crate::backend::GatewayError> for ImportError {
    fn from(err: crate::backend::GatewayError) -> Self {
        ImportError::Gateway(err.message().to_string())
    }
}

/// Trim and check a project title, returning the trimmed value.
pub fn validate_title(title: &str) -> Result<&str, ImportError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ImportError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(ImportError::TitleTooLong);
    }
    Ok(trimmed)
}

