// src/analysis/engine.rs

//! Async shell around the phase map.
//!
//! The engine owns the loaded project: its catalog, the phase of every item,
//! the cached daemon reachability and (when a daemon is present) the
//! analysis event subscription. All methods take `&mut self`; the caller's
//! loop serialises every mutation.
//!
//! Which path settles an attempt depends on reachability:
//! - daemon present: requests leave items `Analyzing`, pushed events finish
//!   them;
//! - daemon absent: the request's own return value is final, followed by a
//!   reconciliation pass against the index.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::event_handlers::{
    EngineCommand, EventStep, handle_completed, handle_progress, handle_started,
};
use super::state::PhaseMap;
use super::{AnalysisPhase, DEFAULT_BATCH_FAILURE, DEFAULT_ITEM_FAILURE};
use crate::backend::{
    AnalysisEvent, AnalysisGateway, EventBus, GatewayResult, IndexClient, ProjectCatalog,
    Subscription,
};
use crate::errors::{BackstageError, Result};
use crate::fs::{FileSystem, same_path};
use crate::types::{AnalysisIndex, AnalysisTarget, DaemonReachability, ItemKind, ProjectItems};

/// Open detail panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub kind: ItemKind,
    pub item_id: String,
    /// `None` until the detail request returns.
    pub detail: Option<Value>,
}

/// A catalog item joined with its phase, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWithState {
    pub id: String,
    pub title: String,
    pub phase: AnalysisPhase,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalysisProgress {
    pub analyzed: usize,
    pub total: usize,
}

pub struct AnalysisEngine<B, I>
where
    B: AnalysisGateway + ProjectCatalog,
    I: IndexClient,
{
    backend: B,
    index: I,
    bus: EventBus,
    fs: Arc<dyn FileSystem>,

    project: Option<String>,
    items: ProjectItems,
    states: PhaseMap,
    active_kind: ItemKind,
    detail: Option<DetailView>,

    reachability: DaemonReachability,
    needs_recheck: bool,
    live: bool,
    error: Option<String>,
    subscription: Option<Subscription<AnalysisEvent>>,
}

impl<B, I> AnalysisEngine<B, I>
where
    B: AnalysisGateway + ProjectCatalog,
    I: IndexClient,
{
    pub fn new(backend: B, index: I, bus: EventBus, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            backend,
            index,
            bus,
            fs,
            project: None,
            items: ProjectItems::default(),
            states: PhaseMap::new(),
            active_kind: ItemKind::default(),
            detail: None,
            reachability: DaemonReachability::Unknown,
            needs_recheck: false,
            live: false,
            error: None,
            subscription: None,
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn items(&self) -> &ProjectItems {
        &self.items
    }

    pub fn states(&self) -> &PhaseMap {
        &self.states
    }

    pub fn phase(&self, kind: ItemKind, id: &str) -> Option<AnalysisPhase> {
        self.states.phase(kind, id)
    }

    pub fn active_kind(&self) -> ItemKind {
        self.active_kind
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn reachability(&self) -> DaemonReachability {
        self.reachability
    }

    /// Whether the last daemon status query failed and will be retried
    /// before the next analyze request.
    pub fn needs_daemon_recheck(&self) -> bool {
        self.needs_recheck
    }

    /// At least one item of the active kind is `Analyzing`.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Collection-level error (catalog load or batch request).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Load a project, rebuilding every phase from the catalog and index.
    ///
    /// A failing catalog leaves the engine empty with the error recorded. A
    /// failing index is logged and every item starts `Pending`.
    pub async fn load_project(&mut self, path: &str) -> GatewayResult<()> {
        self.subscription = None;
        self.project = Some(path.to_string());
        self.items = ProjectItems::default();
        self.states = PhaseMap::new();
        self.detail = None;
        self.reachability = DaemonReachability::Unknown;
        self.needs_recheck = false;
        self.live = false;
        self.error = None;

        let items = match self.backend.list_items(path.to_string()).await {
            Ok(items) => items,
            Err(err) => {
                warn!(project = path, error = %err, "failed to load project items");
                self.error = Some(err.message().to_string());
                return Err(err);
            }
        };

        let index = match self.index.scan(path.to_string()).await {
            Ok(index) => index,
            Err(err) => {
                warn!(project = path, error = %err, "analysis index unavailable; all items pending");
                AnalysisIndex::default()
            }
        };

        self.states = PhaseMap::from_index(&items, &index);
        self.items = items;

        self.check_daemon().await;
        self.recompute_live_flag();

        info!(
            project = path,
            items = self.items.len(),
            daemon = ?self.reachability,
            "project loaded"
        );
        Ok(())
    }

    pub fn switch_kind(&mut self, kind: ItemKind) {
        self.active_kind = kind;
        self.detail = None;
        self.recompute_live_flag();
    }

    /// Open the detail view of an item of the active kind and fetch it.
    pub async fn select_item(&mut self, item_id: &str) -> Result<()> {
        self.require_project()?;
        let kind = self.active_kind;
        self.detail = Some(DetailView {
            kind,
            item_id: item_id.to_string(),
            detail: None,
        });
        self.fetch_detail(kind, item_id).await?;
        Ok(())
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Analyze one item of the active kind.
    ///
    /// Backend failures end in `Failed` on the item and are not returned as
    /// errors. Errors are only returned when no project is loaded or the
    /// item is unknown.
    pub async fn analyze_one(&mut self, item_id: &str) -> Result<()> {
        let project = self.require_project()?;
        let kind = self.active_kind;
        if self.states.get(kind, item_id).is_none() {
            return Err(BackstageError::UnknownItem {
                kind,
                id: item_id.to_string(),
            });
        }

        self.recheck_daemon().await;

        self.states.mark_analyzing(kind, item_id);
        self.recompute_live_flag();

        let result = self
            .backend
            .analyze_item(project, kind, item_id.to_string())
            .await;

        match result {
            Ok(outcome) if outcome.success => {
                if self.reachability.is_present() {
                    debug!(%kind, item = item_id, "analysis queued; waiting for daemon events");
                } else {
                    self.states.mark_finished(kind, item_id, true, None);
                    self.refresh().await;
                }
            }
            Ok(outcome) => {
                let error = outcome.error.as_deref().unwrap_or(DEFAULT_ITEM_FAILURE);
                warn!(%kind, item = item_id, error, "analysis reported failure");
                self.states.mark_finished(kind, item_id, false, Some(error));
            }
            Err(err) => {
                warn!(%kind, item = item_id, error = %err, "analysis request failed");
                self.states.mark_finished(kind, item_id, false, Some(err.message()));
            }
        }

        self.recompute_live_flag();
        Ok(())
    }

    /// Analyze every item of `kind` with one batch request.
    pub async fn analyze_all(&mut self, kind: ItemKind) -> Result<()> {
        let project = self.require_project()?;
        self.error = None;

        self.recheck_daemon().await;

        let previous = self.states.mark_kind_analyzing(kind);
        self.recompute_live_flag();
        info!(%kind, marked = previous.len(), "batch analysis requested");

        match self.backend.analyze_all_of_kind(project, kind).await {
            Ok(outcome) => {
                if !outcome.success {
                    self.error = Some(
                        outcome
                            .error
                            .clone()
                            .unwrap_or_else(|| DEFAULT_BATCH_FAILURE.to_string()),
                    );
                }
                if !self.reachability.is_present() {
                    self.states
                        .finish_kind(kind, outcome.success, outcome.error.as_deref());
                    self.refresh().await;
                }
            }
            Err(err) => {
                warn!(%kind, error = %err, "batch analysis request failed; rolling back");
                self.error = Some(err.message().to_string());
                self.states.restore(kind, previous);
            }
        }

        self.recompute_live_flag();
        Ok(())
    }

    pub fn on_started(&mut self, kind: ItemKind, target: &AnalysisTarget) -> EventStep {
        let step = handle_started(&mut self.states, kind, target);
        self.recompute_live_flag();
        step
    }

    pub fn on_progress(&mut self, kind: ItemKind, target: &AnalysisTarget) -> EventStep {
        let step = handle_progress(&mut self.states, kind, target);
        self.recompute_live_flag();
        step
    }

    pub async fn on_completed(
        &mut self,
        kind: ItemKind,
        target: &AnalysisTarget,
        success: bool,
        error: Option<&str>,
    ) -> EventStep {
        let open_detail = self
            .detail
            .as_ref()
            .map(|d| (d.kind, d.item_id.as_str()));
        let step = handle_completed(&mut self.states, kind, target, success, error, open_detail);
        self.run_commands(&step.commands).await;
        self.recompute_live_flag();
        step
    }

    /// Apply one pushed event. Events for another project are ignored; an
    /// event without a kind applies to the active kind.
    pub async fn handle_event(&mut self, event: AnalysisEvent) -> EventStep {
        if !self.is_current_project(event.project_path()) {
            debug!(
                event_project = ?event.project_path(),
                project = ?self.project,
                "ignoring analysis event for another project"
            );
            return EventStep::default();
        }

        match event {
            AnalysisEvent::Started { kind, target, .. } => {
                self.on_started(kind.unwrap_or(self.active_kind), &target)
            }
            AnalysisEvent::Progress {
                kind,
                target,
                completed,
                total,
                ..
            } => {
                debug!(?target, completed, total, "analysis progress");
                self.on_progress(kind.unwrap_or(self.active_kind), &target)
            }
            AnalysisEvent::Completed {
                kind,
                target,
                success,
                error,
                ..
            } => {
                let kind = kind.unwrap_or(self.active_kind);
                self.on_completed(kind, &target, success, error.as_deref())
                    .await
            }
        }
    }

    /// Wait for the next pushed event and apply it.
    ///
    /// `None` when there is no live subscription.
    pub async fn recv_event(&mut self) -> Option<EventStep> {
        let subscription = self.subscription.as_mut()?;
        let event = subscription.recv().await?;
        Some(self.handle_event(event).await)
    }

    /// Pump events until nothing of the active kind is `Analyzing` or the
    /// subscription goes away.
    pub async fn drive_until_idle(&mut self) {
        while self.live {
            if self.recv_event().await.is_none() {
                break;
            }
        }
    }

    /// Reconciliation pass against the index. Returns `false` when the index
    /// could not be read, in which case every phase is kept.
    pub async fn refresh(&mut self) -> bool {
        let Some(project) = self.project.clone() else {
            return false;
        };
        match self.index.scan(project).await {
            Ok(index) => {
                self.states.reconcile(&index);
                self.recompute_live_flag();
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to refresh analysis states");
                false
            }
        }
    }

    /// Analyzed/total for the active kind.
    pub fn progress(&self) -> AnalysisProgress {
        let (analyzed, total) = self.states.counts(self.active_kind);
        AnalysisProgress { analyzed, total }
    }

    /// Active-kind items in catalog order, with their phases.
    pub fn items_with_state(&self) -> Vec<ItemWithState> {
        let kind = self.active_kind;
        self.items
            .of(kind)
            .iter()
            .map(|item| {
                let state = self.states.get(kind, &item.id).cloned().unwrap_or_default();
                ItemWithState {
                    id: item.id.clone(),
                    title: item.title.clone(),
                    phase: state.phase,
                    error: state.error,
                }
            })
            .collect()
    }

    pub fn recompute_live_flag(&mut self) {
        self.live = self.states.any_analyzing(self.active_kind);
    }

    fn require_project(&self) -> Result<String> {
        self.project.clone().ok_or(BackstageError::NoProject)
    }

    fn is_current_project(&self, event_project: Option<&str>) -> bool {
        match (event_project, self.project.as_deref()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(event), Some(current)) => {
                same_path(self.fs.as_ref(), Path::new(event), Path::new(current))
            }
        }
    }

    async fn run_commands(&mut self, commands: &[EngineCommand]) {
        for command in commands {
            match command {
                EngineCommand::Reconcile => {
                    self.refresh().await;
                }
                EngineCommand::RefetchDetail { kind, item_id } => {
                    if let Err(err) = self.fetch_detail(*kind, item_id).await {
                        warn!(%kind, item = %item_id, error = %err, "failed to refresh detail");
                    }
                }
            }
        }
    }

    async fn fetch_detail(&mut self, kind: ItemKind, item_id: &str) -> GatewayResult<()> {
        let Some(project) = self.project.clone() else {
            return Ok(());
        };
        let value = self
            .backend
            .item_detail(project, kind, item_id.to_string())
            .await?;

        if let Some(view) = self.detail.as_mut()
            && view.kind == kind
            && view.item_id == item_id
        {
            view.detail = Some(value);
        }
        Ok(())
    }

    async fn check_daemon(&mut self) {
        let Some(project) = self.project.clone() else {
            return;
        };

        match self.backend.daemon_status(project.clone()).await {
            Ok(status) => {
                let serves_project = status.project_path.as_deref().is_none_or(|p| {
                    same_path(self.fs.as_ref(), Path::new(p), Path::new(&project))
                });
                self.reachability = if status.running && serves_project {
                    DaemonReachability::Present
                } else {
                    DaemonReachability::Absent
                };
                self.needs_recheck = false;
            }
            Err(err) => {
                warn!(error = %err, "daemon status unavailable; assuming no daemon");
                self.reachability = DaemonReachability::Absent;
                self.needs_recheck = true;
            }
        }

        if self.reachability.is_present() {
            if !self.is_subscribed() {
                self.subscription = Some(self.bus.analysis().subscribe());
            }
        } else {
            self.subscription = None;
        }
    }

    async fn recheck_daemon(&mut self) {
        if self.needs_recheck {
            debug!("rechecking daemon status");
            self.check_daemon().await;
        }
    }
}
