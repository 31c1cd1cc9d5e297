use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Value, json};
use tracing::debug;

use backstage::backend::{
    AnalysisGateway, BoxFuture, EventBus, GatewayError, GatewayResult, ImportEvent,
    ImportGateway, IndexClient, ProjectCatalog, StartImport,
};
use backstage::types::{
    AnalysisIndex, AnalysisOutcome, CollisionInfo, DaemonStatus, ItemKind, ProjectItems,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

// ---------------------------------------------------------------------------
// Import gateway
// ---------------------------------------------------------------------------

/// Calls received by [`FakeImportGateway`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportCall {
    Validate(String),
    CheckCollision(String),
    ResolvePath(String),
    Start(StartImport),
    Cancel(String),
}

/// Events published right after a successful `start_import`.
#[derive(Debug, Clone)]
struct AutoComplete {
    progress: Vec<String>,
    success: bool,
    project_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct ImportState {
    validate_error: Option<String>,
    collision: Option<CollisionInfo>,
    collision_error: Option<String>,
    resolve_error: Option<String>,
    start_error: Option<String>,
    cancel_error: Option<String>,
    auto_complete: Option<AutoComplete>,
    next_request: u64,
    last_request_id: Option<String>,
    calls: Vec<ImportCall>,
}

/// Scriptable [`ImportGateway`].
///
/// - every call is recorded;
/// - each call can be made to fail with a given message;
/// - `complete_on_start` publishes progress + completion on the bus as soon
///   as the start request returns its id, like a fast daemon would.
#[derive(Debug, Clone)]
pub struct FakeImportGateway {
    bus: EventBus,
    state: Arc<Mutex<ImportState>>,
}

impl FakeImportGateway {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            state: Arc::new(Mutex::new(ImportState::default())),
        }
    }

    pub fn fail_validation(&self, message: &str) {
        lock(&self.state).validate_error = Some(message.to_string());
    }

    pub fn with_collision(&self, collision: CollisionInfo) {
        lock(&self.state).collision = Some(collision);
    }

    pub fn clear_collision(&self) {
        lock(&self.state).collision = None;
    }

    pub fn fail_collision_check(&self, message: &str) {
        lock(&self.state).collision_error = Some(message.to_string());
    }

    pub fn fail_resolve(&self, message: &str) {
        lock(&self.state).resolve_error = Some(message.to_string());
    }

    pub fn fail_start(&self, message: &str) {
        lock(&self.state).start_error = Some(message.to_string());
    }

    pub fn fail_cancel(&self, message: &str) {
        lock(&self.state).cancel_error = Some(message.to_string());
    }

    pub fn complete_on_start(&self, progress: &[&str], success: bool, error: Option<&str>) {
        lock(&self.state).auto_complete = Some(AutoComplete {
            progress: progress.iter().map(|s| s.to_string()).collect(),
            success,
            project_id: success.then(|| "project-1".to_string()),
            error: error.map(str::to_string),
        });
    }

    pub fn calls(&self) -> Vec<ImportCall> {
        lock(&self.state).calls.clone()
    }

    pub fn cancel_calls(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| matches!(c, ImportCall::Cancel(_)))
            .count()
    }

    pub fn start_calls(&self) -> Vec<StartImport> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|c| match c {
                ImportCall::Start(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_request_id(&self) -> Option<String> {
        lock(&self.state).last_request_id.clone()
    }

    /// Canonical path the fake resolves every title to.
    pub fn resolved_path(title: &str) -> String {
        format!("/projects/{title}.kspd")
    }

    pub fn publish_progress(&self, request_id: &str, line: Option<&str>) -> bool {
        self.bus.import().publish(ImportEvent::Progress {
            request_id: request_id.to_string(),
            line: line.map(str::to_string),
        })
    }

    pub fn publish_completion(&self, request_id: &str, success: bool, error: Option<&str>) -> bool {
        self.bus.import().publish(ImportEvent::Completed {
            request_id: request_id.to_string(),
            success,
            project_id: success.then(|| "project-1".to_string()),
            error: error.map(str::to_string),
        })
    }

    fn record(&self, call: ImportCall) -> MutexGuard<'_, ImportState> {
        let mut state = lock(&self.state);
        state.calls.push(call);
        state
    }
}

fn scripted<T>(error: &Option<String>, ok: T) -> GatewayResult<T> {
    match error {
        Some(message) => Err(GatewayError::new(message.clone())),
        None => Ok(ok),
    }
}

impl ImportGateway for FakeImportGateway {
    fn validate_import_file(&self, path: String) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            let state = self.record(ImportCall::Validate(path));
            scripted(&state.validate_error, ())
        })
    }

    fn check_import_collision(
        &self,
        title: String,
    ) -> BoxFuture<'_, GatewayResult<Option<CollisionInfo>>> {
        Box::pin(async move {
            let state = self.record(ImportCall::CheckCollision(title));
            scripted(&state.collision_error, state.collision.clone())
        })
    }

    fn resolve_import_path(&self, title: String) -> BoxFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            let path = Self::resolved_path(&title);
            let state = self.record(ImportCall::ResolvePath(title));
            scripted(&state.resolve_error, path)
        })
    }

    fn start_import(&self, request: StartImport) -> BoxFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            let (request_id, auto) = {
                let mut state = self.record(ImportCall::Start(request));
                if let Some(message) = state.start_error.clone() {
                    return Err(GatewayError::new(message));
                }
                state.next_request += 1;
                let request_id = format!("req-{}", state.next_request);
                state.last_request_id = Some(request_id.clone());
                (request_id, state.auto_complete.clone())
            };

            if let Some(auto) = auto {
                for line in &auto.progress {
                    self.publish_progress(&request_id, Some(line));
                }
                self.bus.import().publish(ImportEvent::Completed {
                    request_id: request_id.clone(),
                    success: auto.success,
                    project_id: auto.project_id.clone(),
                    error: auto.error.clone(),
                });
            }

            debug!(request_id = %request_id, "fake import started");
            Ok(request_id)
        })
    }

    fn cancel_import(&self, request_id: String) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            let state = self.record(ImportCall::Cancel(request_id));
            scripted(&state.cancel_error, ())
        })
    }
}

// ---------------------------------------------------------------------------
// Ground-truth index
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct IndexState {
    index: AnalysisIndex,
    failure: Option<String>,
    scans: usize,
}

/// Shared in-memory [`IndexClient`].
#[derive(Debug, Clone, Default)]
pub struct FakeIndex {
    state: Arc<Mutex<IndexState>>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: ItemKind, id: &str) {
        lock(&self.state).index.insert(kind, id);
    }

    pub fn remove(&self, kind: ItemKind, id: &str) {
        lock(&self.state).index.ids_mut(kind).remove(id);
    }

    pub fn contains(&self, kind: ItemKind, id: &str) -> bool {
        lock(&self.state).index.contains(kind, id)
    }

    /// Make every subsequent scan fail (or succeed again with `None`).
    pub fn set_failure(&self, message: Option<&str>) {
        lock(&self.state).failure = message.map(str::to_string);
    }

    pub fn scans(&self) -> usize {
        lock(&self.state).scans
    }
}

impl IndexClient for FakeIndex {
    fn scan(&self, _project: String) -> BoxFuture<'_, GatewayResult<AnalysisIndex>> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.scans += 1;
            match &state.failure {
                Some(message) => Err(GatewayError::new(message.clone())),
                None => Ok(state.index.clone()),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Analysis backend + catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisCall {
    Item { kind: ItemKind, id: String },
    All { kind: ItemKind },
    DaemonStatus,
    ListItems,
    Detail { kind: ItemKind, id: String },
}

#[derive(Debug)]
struct AnalysisState {
    items: ProjectItems,
    list_error: Option<String>,
    daemon: Result<DaemonStatus, String>,
    item_outcomes: HashMap<String, Result<AnalysisOutcome, String>>,
    batch_outcome: Result<AnalysisOutcome, String>,
    writes_to: Option<FakeIndex>,
    skip_index: HashSet<String>,
    detail_revision: u64,
    calls: Vec<AnalysisCall>,
}

/// Scriptable [`AnalysisGateway`] + [`ProjectCatalog`].
///
/// By default every request succeeds and no daemon is running. With
/// [`writes_to`](Self::writes_to) a successful request records its items in
/// the given index, like the tools executable writing result files.
#[derive(Debug, Clone)]
pub struct FakeAnalysisBackend {
    state: Arc<Mutex<AnalysisState>>,
}

impl FakeAnalysisBackend {
    pub fn new(items: ProjectItems) -> Self {
        Self {
            state: Arc::new(Mutex::new(AnalysisState {
                items,
                list_error: None,
                daemon: Ok(DaemonStatus::default()),
                item_outcomes: HashMap::new(),
                batch_outcome: Ok(AnalysisOutcome::ok()),
                writes_to: None,
                skip_index: HashSet::new(),
                detail_revision: 0,
                calls: Vec::new(),
            })),
        }
    }

    pub fn with_daemon(&self, running: bool) {
        lock(&self.state).daemon = Ok(DaemonStatus {
            running,
            ..DaemonStatus::default()
        });
    }

    pub fn set_daemon_status(&self, status: DaemonStatus) {
        lock(&self.state).daemon = Ok(status);
    }

    pub fn fail_daemon_status(&self, message: &str) {
        lock(&self.state).daemon = Err(message.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        lock(&self.state).list_error = Some(message.to_string());
    }

    pub fn set_item_outcome(&self, id: &str, outcome: AnalysisOutcome) {
        lock(&self.state).item_outcomes.insert(id.to_string(), Ok(outcome));
    }

    pub fn fail_item_request(&self, id: &str, message: &str) {
        lock(&self.state)
            .item_outcomes
            .insert(id.to_string(), Err(message.to_string()));
    }

    pub fn set_batch_outcome(&self, outcome: AnalysisOutcome) {
        lock(&self.state).batch_outcome = Ok(outcome);
    }

    pub fn fail_batch_request(&self, message: &str) {
        lock(&self.state).batch_outcome = Err(message.to_string());
    }

    pub fn writes_to(&self, index: FakeIndex) {
        lock(&self.state).writes_to = Some(index);
    }

    /// Successful requests for `id` do not show up in the index.
    pub fn never_indexes(&self, id: &str) {
        lock(&self.state).skip_index.insert(id.to_string());
    }

    pub fn calls(&self) -> Vec<AnalysisCall> {
        lock(&self.state).calls.clone()
    }

    pub fn detail_calls(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| matches!(c, AnalysisCall::Detail { .. }))
            .count()
    }

    fn index_success(state: &AnalysisState, kind: ItemKind, ids: &[String]) {
        if let Some(index) = &state.writes_to {
            for id in ids.iter().filter(|id| !state.skip_index.contains(*id)) {
                index.insert(kind, id);
            }
        }
    }
}

fn outcome_of(result: &Result<AnalysisOutcome, String>) -> GatewayResult<AnalysisOutcome> {
    result.clone().map_err(GatewayError::new)
}

impl AnalysisGateway for FakeAnalysisBackend {
    fn analyze_item(
        &self,
        _project: String,
        kind: ItemKind,
        item_id: String,
    ) -> BoxFuture<'_, GatewayResult<AnalysisOutcome>> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(AnalysisCall::Item {
                kind,
                id: item_id.clone(),
            });
            let result = state
                .item_outcomes
                .get(&item_id)
                .map(outcome_of)
                .unwrap_or_else(|| Ok(AnalysisOutcome::ok()));

            if matches!(&result, Ok(outcome) if outcome.success) {
                Self::index_success(&state, kind, &[item_id]);
            }
            result
        })
    }

    fn analyze_all_of_kind(
        &self,
        _project: String,
        kind: ItemKind,
    ) -> BoxFuture<'_, GatewayResult<AnalysisOutcome>> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(AnalysisCall::All { kind });
            let result = outcome_of(&state.batch_outcome);

            if matches!(&result, Ok(outcome) if outcome.success) {
                let ids: Vec<String> = state.items.of(kind).iter().map(|i| i.id.clone()).collect();
                Self::index_success(&state, kind, &ids);
            }
            result
        })
    }

    fn daemon_status(&self, _project: String) -> BoxFuture<'_, GatewayResult<DaemonStatus>> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(AnalysisCall::DaemonStatus);
            state.daemon.clone().map_err(GatewayError::new)
        })
    }
}

impl ProjectCatalog for FakeAnalysisBackend {
    fn list_items(&self, _project: String) -> BoxFuture<'_, GatewayResult<ProjectItems>> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(AnalysisCall::ListItems);
            match &state.list_error {
                Some(message) => Err(GatewayError::new(message.clone())),
                None => Ok(state.items.clone()),
            }
        })
    }

    fn item_detail(
        &self,
        _project: String,
        kind: ItemKind,
        item_id: String,
    ) -> BoxFuture<'_, GatewayResult<Value>> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.calls.push(AnalysisCall::Detail {
                kind,
                id: item_id.clone(),
            });
            state.detail_revision += 1;
            Ok(json!({
                "id": item_id,
                "kind": kind.section(),
                "revision": state.detail_revision,
            }))
        })
    }
}
