// src/fs/mod.rs

//! Filesystem access used by import path checks and the analysis index scan.
//!
//! Everything that inspects project directories goes through [`FileSystem`]
//! so tests can swap in [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

pub use mock::MockFileSystem;

pub trait FileSystem: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Full paths of the direct children of `path`.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// The host filesystem.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("resolving {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .and_then(|entries| entries.map(|entry| entry.map(|e| e.path())).collect())
            .with_context(|| format!("listing {}", path.display()))
    }
}

/// Compare two project paths, resolving both through the filesystem when
/// possible and falling back to a literal comparison.
pub fn same_path(fs: &dyn FileSystem, a: &Path, b: &Path) -> bool {
    let a = fs.canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let b = fs.canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    a == b
}
