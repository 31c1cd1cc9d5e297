// src/analysis/event_handlers.rs

//! Pure handling of pushed analysis events.
//!
//! Each handler mutates the [`PhaseMap`] and returns the follow-up work the
//! engine has to perform (index reconciliation, detail refresh). No IO
//! happens here.

use tracing::debug;

use super::PhaseMap;
use crate::types::{AnalysisTarget, ItemKind};

/// Follow-up produced by an event handler, executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Run a reconciliation pass against the ground-truth index.
    Reconcile,
    /// Re-fetch the open detail view of this item.
    RefetchDetail { kind: ItemKind, item_id: String },
}

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStep {
    pub commands: Vec<EngineCommand>,
    /// Whether the event changed any phase.
    pub changed: bool,
}

impl EventStep {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Work has started on an item, or on a whole kind for the `all` target.
pub fn handle_started(states: &mut PhaseMap, kind: ItemKind, target: &AnalysisTarget) -> EventStep {
    let changed = match target {
        AnalysisTarget::Item(id) => states.mark_analyzing(kind, id),
        AnalysisTarget::All => !states.mark_kind_analyzing(kind).is_empty(),
    };
    EventStep {
        commands: Vec::new(),
        changed,
    }
}

/// Progress keeps an item in `Analyzing`. Batch progress carries no
/// per-item information.
pub fn handle_progress(states: &mut PhaseMap, kind: ItemKind, target: &AnalysisTarget) -> EventStep {
    match target {
        AnalysisTarget::Item(id) => {
            let already = states.phase(kind, id).is_some_and(|p| p.is_analyzing());
            let marked = states.mark_analyzing(kind, id);
            EventStep {
                commands: Vec::new(),
                changed: marked && !already,
            }
        }
        AnalysisTarget::All => EventStep::unchanged(),
    }
}

/// Completion of an item or of a batch.
///
/// `open_detail` is the item whose detail view is currently shown; a
/// successful completion for it asks for a refetch.
pub fn handle_completed(
    states: &mut PhaseMap,
    kind: ItemKind,
    target: &AnalysisTarget,
    success: bool,
    error: Option<&str>,
    open_detail: Option<(ItemKind, &str)>,
) -> EventStep {
    match target {
        AnalysisTarget::Item(id) => {
            if !states.mark_finished(kind, id, success, error) {
                debug!(%kind, item = %id, "completion for item not analyzing; ignored");
                return EventStep::unchanged();
            }

            let mut commands = Vec::new();
            if success {
                commands.push(EngineCommand::Reconcile);
                if open_detail == Some((kind, id.as_str())) {
                    commands.push(EngineCommand::RefetchDetail {
                        kind,
                        item_id: id.clone(),
                    });
                }
            }
            EventStep {
                commands,
                changed: true,
            }
        }
        AnalysisTarget::All => {
            let released = states.finish_kind(kind, success, error);
            debug!(%kind, released, success, "batch completion");

            let mut commands = vec![EngineCommand::Reconcile];
            if let Some((detail_kind, item_id)) = open_detail
                && detail_kind == kind
            {
                commands.push(EngineCommand::RefetchDetail {
                    kind,
                    item_id: item_id.to_string(),
                });
            }
            EventStep {
                commands,
                changed: released > 0,
            }
        }
    }
}
