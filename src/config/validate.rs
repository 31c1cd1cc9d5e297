// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BackstageError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BackstageError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.backend, raw.import, raw.analysis))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_backend(cfg)?;
    validate_import(cfg)?;
    validate_analysis(cfg)?;
    Ok(())
}

fn validate_backend(cfg: &RawConfigFile) -> Result<()> {
    if cfg.backend.tools_path.trim().is_empty() {
        return Err(BackstageError::ConfigError(
            "[backend].tools_path must not be empty".to_string(),
        ));
    }
    if cfg.backend.projects_root.as_os_str().is_empty() {
        return Err(BackstageError::ConfigError(
            "[backend].projects_root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_import(cfg: &RawConfigFile) -> Result<()> {
    let import = &cfg.import;

    if import.allowed_extensions.is_empty() {
        return Err(BackstageError::ConfigError(
            "[import].allowed_extensions must list at least one extension".to_string(),
        ));
    }
    for ext in &import.allowed_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(BackstageError::ConfigError(format!(
                "[import].allowed_extensions entry '{}' must look like \".ext\"",
                ext
            )));
        }
    }

    let project_ext = import.project_extension.trim();
    if project_ext.is_empty() || project_ext.contains('.') {
        return Err(BackstageError::ConfigError(format!(
            "[import].project_extension must be a bare extension without dots (got '{}')",
            import.project_extension
        )));
    }

    if import.suggestion_count == 0 {
        return Err(BackstageError::ConfigError(
            "[import].suggestion_count must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_analysis(cfg: &RawConfigFile) -> Result<()> {
    let dir = &cfg.analysis.index_dir;
    if dir.as_os_str().is_empty() {
        return Err(BackstageError::ConfigError(
            "[analysis].index_dir must not be empty".to_string(),
        ));
    }
    if dir.is_absolute() {
        return Err(BackstageError::ConfigError(format!(
            "[analysis].index_dir must be relative to the project (got '{}')",
            dir.display()
        )));
    }
    Ok(())
}
