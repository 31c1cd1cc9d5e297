// src/backend/local/mod.rs

//! Backend that performs every request through one-shot invocations of the
//! tools executable.
//!
//! There is no daemon on this path: `daemon_status` always reports
//! `running = false`, analysis requests complete synchronously, and imports
//! run as a background child process whose output is streamed on the import
//! topic of the [`EventBus`].
//!
//! Running imports are tracked per request id with a cancel sender, so at
//! most one process exists per request and `cancel_import` can kill it.

pub mod runner;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use self::runner::{ImportJob, run_captured, run_import};
use super::catalog::ProjectCatalog;
use super::events::EventBus;
use super::gateway::{AnalysisGateway, GatewayResult, ImportGateway, StartImport};
use super::{BoxFuture, GatewayError, paths};
use crate::config::{ConfigFile, ImportSection};
use crate::fs::FileSystem;
use crate::import::validate_title;
use crate::types::{
    AnalysisOutcome, CollisionInfo, DaemonStatus, ItemKind, ItemSummary, ProjectItems,
};

type ActiveImports = Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>;

#[derive(Clone)]
pub struct LocalBackend {
    fs: Arc<dyn FileSystem>,
    bus: EventBus,
    tools_path: String,
    projects_root: std::path::PathBuf,
    import: ImportSection,
    active: ActiveImports,
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("tools_path", &self.tools_path)
            .field("projects_root", &self.projects_root)
            .field("active_imports", &lock(&self.active).len())
            .finish_non_exhaustive()
    }
}

impl LocalBackend {
    pub fn new(config: &ConfigFile, fs: Arc<dyn FileSystem>, bus: EventBus) -> Self {
        Self {
            fs,
            bus,
            tools_path: config.backend.tools_path.clone(),
            projects_root: config.backend.projects_root.clone(),
            import: config.import.clone(),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of import processes currently tracked.
    pub fn active_imports(&self) -> usize {
        lock(&self.active).len()
    }

    fn check_title(title: &str) -> GatewayResult<&str> {
        validate_title(title).map_err(|e| GatewayError::new(e.to_string()))
    }

    fn target_path(&self, title: &str) -> std::path::PathBuf {
        paths::resolve_target_path(&self.projects_root, title, &self.import.project_extension)
    }

    async fn query_json(&self, args: &[&str]) -> GatewayResult<Value> {
        let run = run_captured(&self.tools_path, args).await?;
        if !run.success {
            return Err(GatewayError::new(run.failure_message(&self.tools_path)));
        }
        serde_json::from_str(&run.stdout).map_err(|e| {
            GatewayError::new(format!("Failed to parse {} output: {e}", self.tools_path))
        })
    }

    async fn query_items(&self, project: &str, kind: ItemKind) -> GatewayResult<Vec<ItemSummary>> {
        let value = self
            .query_json(&["query", kind.section(), "--project", project, "--json"])
            .await?;
        parse_item_list(value, kind)
    }

    async fn run_analysis(&self, args: &[&str]) -> GatewayResult<AnalysisOutcome> {
        let run = run_captured(&self.tools_path, args).await?;
        if run.success {
            Ok(AnalysisOutcome::ok())
        } else {
            Ok(AnalysisOutcome::failed(run.failure_message(&self.tools_path)))
        }
    }
}

impl ImportGateway for LocalBackend {
    fn validate_import_file(&self, path: String) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            paths::validate_import_file(self.fs.as_ref(), &path, &self.import.allowed_extensions)
        })
    }

    fn check_import_collision(
        &self,
        title: String,
    ) -> BoxFuture<'_, GatewayResult<Option<CollisionInfo>>> {
        Box::pin(async move {
            let title = Self::check_title(&title)?;
            let target = self.target_path(title);

            if !paths::has_collision(self.fs.as_ref(), &target) {
                return Ok(None);
            }

            let suggested_names = paths::suggested_names(
                self.fs.as_ref(),
                &self.projects_root,
                title,
                &self.import.project_extension,
                self.import.suggestion_count,
            );
            debug!(target = %target.display(), ?suggested_names, "import target collides");

            Ok(Some(CollisionInfo {
                existing_path: paths::path_to_string(&target)?,
                suggested_names,
            }))
        })
    }

    fn resolve_import_path(&self, title: String) -> BoxFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            let title = Self::check_title(&title)?;
            paths::path_to_string(&self.target_path(title))
        })
    }

    fn start_import(&self, request: StartImport) -> BoxFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            paths::validate_import_file(
                self.fs.as_ref(),
                &request.file_path,
                &self.import.allowed_extensions,
            )?;
            Self::check_title(&request.title)?;

            if !request.overwrite
                && paths::has_collision(self.fs.as_ref(), Path::new(&request.output_path))
            {
                return Err(GatewayError::new(
                    "Project already exists at target path. Confirm overwrite or choose a different name.",
                ));
            }

            let request_id = Uuid::new_v4().to_string();
            let (cancel_tx, cancel_rx) = oneshot::channel();
            lock(&self.active).insert(request_id.clone(), cancel_tx);

            let job = ImportJob {
                request_id: request_id.clone(),
                tools_path: self.tools_path.clone(),
                input_path: request.file_path,
                output_path: request.output_path,
            };
            let channel = self.bus.import().clone();
            let active = Arc::clone(&self.active);

            tokio::spawn(async move {
                let rid = job.request_id.clone();
                run_import(job, channel, cancel_rx).await;
                lock(&active).remove(&rid);
            });

            info!(title = %request.title, request_id = %request_id, "import started");
            Ok(request_id)
        })
    }

    fn cancel_import(&self, request_id: String) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            let cancel = lock(&self.active).remove(&request_id);
            match cancel {
                Some(tx) => {
                    if tx.send(()).is_err() {
                        debug!(request_id = %request_id, "import already finished while cancelling");
                    }
                    Ok(())
                }
                None => Err(GatewayError::new(format!(
                    "No running import with request id {request_id}"
                ))),
            }
        })
    }
}

impl AnalysisGateway for LocalBackend {
    fn analyze_item(
        &self,
        project: String,
        kind: ItemKind,
        item_id: String,
    ) -> BoxFuture<'_, GatewayResult<AnalysisOutcome>> {
        Box::pin(async move {
            let operation = format!("analyze-{}", kind.singular());
            self.run_analysis(&[&operation, "--project", &project, "--id", &item_id])
                .await
        })
    }

    fn analyze_all_of_kind(
        &self,
        project: String,
        kind: ItemKind,
    ) -> BoxFuture<'_, GatewayResult<AnalysisOutcome>> {
        Box::pin(async move {
            self.run_analysis(&["analyze-all", "--project", &project, "--kind", kind.section()])
                .await
        })
    }

    fn daemon_status(&self, project: String) -> BoxFuture<'_, GatewayResult<DaemonStatus>> {
        Box::pin(async move {
            debug!(project = %project, "local backend has no daemon");
            Ok(DaemonStatus::default())
        })
    }
}

impl ProjectCatalog for LocalBackend {
    fn list_items(&self, project: String) -> BoxFuture<'_, GatewayResult<ProjectItems>> {
        Box::pin(async move {
            let mut items = ProjectItems::default();
            for kind in ItemKind::ALL {
                *items.of_mut(kind) = self.query_items(&project, kind).await?;
            }
            Ok(items)
        })
    }

    fn item_detail(
        &self,
        project: String,
        kind: ItemKind,
        item_id: String,
    ) -> BoxFuture<'_, GatewayResult<Value>> {
        Box::pin(async move {
            self.query_json(&[
                "query",
                kind.section(),
                "--project",
                &project,
                "--id",
                &item_id,
                "--json",
            ])
            .await
        })
    }
}

/// Accept either a bare JSON array or an object wrapping it under the
/// section name (or `items`).
pub fn parse_item_list(value: Value, kind: ItemKind) -> GatewayResult<Vec<ItemSummary>> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map
            .remove(kind.section())
            .or_else(|| map.remove("items"))
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => {
            return Err(GatewayError::new(format!(
                "Unexpected {} listing: {other}",
                kind.section()
            )));
        }
    };

    serde_json::from_value(list)
        .map_err(|e| GatewayError::new(format!("Invalid {} listing: {e}", kind.section())))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
