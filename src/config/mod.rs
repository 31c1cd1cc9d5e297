// src/config/mod.rs

//! `Backstage.toml`: where the tools executable and projects live, which
//! screenplay files the import wizard accepts, and where each project keeps
//! its analysis index.
//!
//! [`model`] is the serde shape, [`loader`] reads it from disk and
//! [`validate`] turns a [`RawConfigFile`] into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, load_or_default};
pub use model::{AnalysisSection, BackendSection, ConfigFile, ImportSection, RawConfigFile};
