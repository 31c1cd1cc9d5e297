// src/backend/gateway.rs

//! Request/response seams to the backend.
//!
//! The controllers talk to these traits instead of a concrete transport.
//! Production code uses [`LocalBackend`](super::local::LocalBackend); tests
//! provide fakes that, for example, publish completion events on the bus as
//! soon as an import is started.

use super::{BoxFuture, GatewayError};
use crate::types::{AnalysisOutcome, CollisionInfo, DaemonStatus, ItemKind};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Single-shot import requests. Each call is independently failable.
pub trait ImportGateway: Send + Sync {
    /// Server-side check that `path` is an importable screenplay file.
    fn validate_import_file(&self, path: String) -> BoxFuture<'_, GatewayResult<()>>;

    /// `Some` when `title` resolves to an already existing project.
    fn check_import_collision(
        &self,
        title: String,
    ) -> BoxFuture<'_, GatewayResult<Option<CollisionInfo>>>;

    /// Canonical output path for `title`.
    fn resolve_import_path(&self, title: String) -> BoxFuture<'_, GatewayResult<String>>;

    /// Start the import and return its request id.
    ///
    /// Progress and completion are reported on the import event topic.
    fn start_import(&self, request: StartImport) -> BoxFuture<'_, GatewayResult<String>>;

    /// Advisory cancellation of a running import.
    fn cancel_import(&self, request_id: String) -> BoxFuture<'_, GatewayResult<()>>;
}

/// Parameters of [`ImportGateway::start_import`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartImport {
    pub file_path: String,
    pub title: String,
    pub output_path: String,
    pub overwrite: bool,
}

/// Single-shot analysis requests.
pub trait AnalysisGateway: Send + Sync {
    fn analyze_item(
        &self,
        project: String,
        kind: ItemKind,
        item_id: String,
    ) -> BoxFuture<'_, GatewayResult<AnalysisOutcome>>;

    fn analyze_all_of_kind(
        &self,
        project: String,
        kind: ItemKind,
    ) -> BoxFuture<'_, GatewayResult<AnalysisOutcome>>;

    /// Whether a daemon serving `project` is reachable.
    fn daemon_status(&self, project: String) -> BoxFuture<'_, GatewayResult<DaemonStatus>>;
}
