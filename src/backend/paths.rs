// src/backend/paths.rs

//! Server-side checks behind the import gateway: which files can be
//! imported, where a title lands on disk, and what to offer on a collision.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{GatewayError, GatewayResult};
use crate::fs::FileSystem;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("filename pattern is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Turn a project title into a filesystem-safe file stem.
///
/// Unsafe characters and whitespace runs become `_`, leading and trailing
/// underscores are trimmed, and an empty result falls back to `project`.
pub fn normalize_project_filename(title: &str) -> String {
    let normalized = UNSAFE_FILENAME_CHARS.replace_all(title, "_");
    let normalized = WHITESPACE_RUN.replace_all(&normalized, "_");
    let normalized = normalized.trim_matches('_');

    if normalized.is_empty() {
        "project".to_string()
    } else {
        normalized.to_string()
    }
}

/// Where a project titled `title` is written.
pub fn resolve_target_path(projects_root: &Path, title: &str, project_extension: &str) -> PathBuf {
    let stem = normalize_project_filename(title);
    projects_root.join(format!("{stem}.{project_extension}"))
}

/// Path as a UTF-8 string, which is what crosses the gateway.
pub fn path_to_string(path: &Path) -> GatewayResult<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| GatewayError::new("Invalid path encoding"))
}

/// Whether something already occupies the target path.
pub fn has_collision(fs: &dyn FileSystem, target: &Path) -> bool {
    fs.exists(target)
}

/// Up to `max` alternative names (`<stem>_1`, `<stem>_2`, ...) that do not
/// collide with an existing project. At most `max + 5` candidates are tried.
pub fn suggested_names(
    fs: &dyn FileSystem,
    projects_root: &Path,
    title: &str,
    project_extension: &str,
    max: usize,
) -> Vec<String> {
    let stem = normalize_project_filename(title);

    (1..=max + 5)
        .map(|i| format!("{stem}_{i}"))
        .filter(|candidate| {
            let path = projects_root.join(format!("{candidate}.{project_extension}"));
            !fs.exists(&path)
        })
        .take(max)
        .collect()
}

/// Accept only existing regular files with an allowed extension.
pub fn validate_import_file(
    fs: &dyn FileSystem,
    path: &str,
    allowed_extensions: &[String],
) -> GatewayResult<()> {
    if path.trim().is_empty() {
        return Err(GatewayError::new("File path cannot be empty"));
    }

    let file_path = Path::new(path);

    if !fs.exists(file_path) {
        return Err(GatewayError::new(format!("File not found: {path}")));
    }

    if fs.is_dir(file_path) {
        return Err(GatewayError::new(format!(
            "Please select a file, not a directory: {path}"
        )));
    }

    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    if !allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
    {
        return Err(GatewayError::new(format!(
            "Unsupported file type \"{}\". Allowed: {}",
            ext,
            allowed_extensions.join(", ")
        )));
    }

    Ok(())
}
