// src/backend/index.rs

//! Ground-truth index of analyzed items.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use super::{BoxFuture, GatewayResult};
use crate::fs::FileSystem;
use crate::types::{AnalysisIndex, ItemKind};

/// Answers "which items of this project have completed analysis".
///
/// There is no partial or streaming form: each call returns the full index.
pub trait IndexClient: Send + Sync {
    fn scan(&self, project: String) -> BoxFuture<'_, GatewayResult<AnalysisIndex>>;
}

/// Index backed by the project directory: one `<item id>.json` file per
/// analyzed item under `index_dir`, classified by id prefix.
#[derive(Debug, Clone)]
pub struct FsIndexClient {
    fs: Arc<dyn FileSystem>,
    index_dir: PathBuf,
}

impl FsIndexClient {
    pub fn new(fs: Arc<dyn FileSystem>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            index_dir: index_dir.into(),
        }
    }

    /// Synchronous scan; a missing directory is an empty index.
    pub fn scan_dir(&self, project: &Path) -> GatewayResult<AnalysisIndex> {
        let dir = project.join(&self.index_dir);
        let mut index = AnalysisIndex::default();

        if !self.fs.is_dir(&dir) {
            debug!(dir = %dir.display(), "analysis index directory missing; empty index");
            return Ok(index);
        }

        for entry in self.fs.read_dir(&dir)? {
            let Some(id) = analysis_file_id(&entry).filter(|_| self.fs.is_file(&entry)) else {
                continue;
            };
            match kind_for_id(id) {
                Some(kind) => index.insert(kind, id),
                None => trace!(file = %entry.display(), "ignoring index entry with unknown prefix"),
            }
        }

        Ok(index)
    }
}

impl IndexClient for FsIndexClient {
    fn scan(&self, project: String) -> BoxFuture<'_, GatewayResult<AnalysisIndex>> {
        Box::pin(async move { self.scan_dir(Path::new(&project)) })
    }
}

fn analysis_file_id(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(".json")
}

/// Classify an item id by its prefix (`scn_`, `chr_`, `loc_`).
pub fn kind_for_id(id: &str) -> Option<ItemKind> {
    ItemKind::ALL
        .into_iter()
        .find(|kind| id.starts_with(kind.index_prefix()))
}
