// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [backend]
/// tools_path = "/usr/local/bin/screen-tools"
/// projects_root = "~/Screenplays"
///
/// [import]
/// allowed_extensions = [".fountain", ".fdx"]
/// suggestion_count = 3
///
/// [analysis]
/// index_dir = "metadata/analysis"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub import: ImportSection,

    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// Validated configuration. Only constructed through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub backend: BackendSection,
    pub import: ImportSection,
    pub analysis: AnalysisSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        backend: BackendSection,
        import: ImportSection,
        analysis: AnalysisSection,
    ) -> Self {
        Self {
            backend,
            import,
            analysis,
        }
    }
}

/// `[backend]` section: where the one-shot tools executable lives and where
/// new projects are written.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// Executable invoked for parse, analyze and query operations.
    #[serde(default = "default_tools_path")]
    pub tools_path: String,

    /// Directory new projects are created in.
    #[serde(default = "default_projects_root")]
    pub projects_root: PathBuf,
}

fn default_tools_path() -> String {
    "screen-tools".to_string()
}

fn default_projects_root() -> PathBuf {
    PathBuf::from("projects")
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            tools_path: default_tools_path(),
            projects_root: default_projects_root(),
        }
    }
}

/// `[import]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportSection {
    /// Accepted input file extensions, including the leading dot.
    /// Matching is case-insensitive.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Extension (without dot) of project directories.
    #[serde(default = "default_project_extension")]
    pub project_extension: String,

    /// How many alternative names to offer on a collision.
    #[serde(default = "default_suggestion_count")]
    pub suggestion_count: usize,
}

fn default_allowed_extensions() -> Vec<String> {
    [".fountain", ".fdx", ".sbx", ".md"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_project_extension() -> String {
    "kspd".to_string()
}

fn default_suggestion_count() -> usize {
    5
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            project_extension: default_project_extension(),
            suggestion_count: default_suggestion_count(),
        }
    }
}

/// `[analysis]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSection {
    /// Directory, relative to a project, holding one `<item id>.json` per
    /// analyzed item.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("metadata").join("analysis")
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}
