// src/analysis/state.rs

//! Phase map for the loaded project.

use std::collections::BTreeMap;

use tracing::trace;

use super::{AnalysisPhase, DEFAULT_ITEM_FAILURE};
use crate::types::{AnalysisIndex, ItemKind, ProjectItems};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemState {
    pub phase: AnalysisPhase,
    /// Set only while `phase` is `Failed`.
    pub error: Option<String>,
}

impl ItemState {
    fn from_index(analyzed: bool) -> Self {
        Self {
            phase: if analyzed {
                AnalysisPhase::Analyzed
            } else {
                AnalysisPhase::Pending
            },
            error: None,
        }
    }
}

/// `(kind, item id) -> ItemState` for every catalog item.
///
/// Only items present when the map was built are tracked; updates naming
/// unknown items are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseMap {
    entries: BTreeMap<(ItemKind, String), ItemState>,
}

impl PhaseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial phases: `Analyzed` when the index lists the item, else `Pending`.
    pub fn from_index(items: &ProjectItems, index: &AnalysisIndex) -> Self {
        let mut entries = BTreeMap::new();
        for kind in ItemKind::ALL {
            for item in items.of(kind) {
                let analyzed = index.contains(kind, &item.id);
                entries.insert((kind, item.id.clone()), ItemState::from_index(analyzed));
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, kind: ItemKind, id: &str) -> Option<&ItemState> {
        self.entries.get(&(kind, id.to_string()))
    }

    pub fn phase(&self, kind: ItemKind, id: &str) -> Option<AnalysisPhase> {
        self.get(kind, id).map(|s| s.phase)
    }

    /// Entries of one kind, in id order.
    pub fn of_kind(&self, kind: ItemKind) -> impl Iterator<Item = (&str, &ItemState)> + '_ {
        self.entries
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|((_, id), state)| (id.as_str(), state))
    }

    /// Move an item to `Analyzing` and clear its error.
    ///
    /// Returns `false` for unknown items.
    pub fn mark_analyzing(&mut self, kind: ItemKind, id: &str) -> bool {
        let Some(state) = self.entries.get_mut(&(kind, id.to_string())) else {
            trace!(%kind, id, "ignoring analyzing mark for unknown item");
            return false;
        };
        state.phase = AnalysisPhase::Analyzing;
        state.error = None;
        true
    }

    /// Finish an attempt. Applies only to items currently `Analyzing`;
    /// anything else is a stale update and is ignored.
    pub fn mark_finished(
        &mut self,
        kind: ItemKind,
        id: &str,
        success: bool,
        error: Option<&str>,
    ) -> bool {
        let Some(state) = self.entries.get_mut(&(kind, id.to_string())) else {
            return false;
        };
        if !state.phase.is_analyzing() {
            trace!(%kind, id, phase = %state.phase, "ignoring stale completion");
            return false;
        }

        if success {
            state.phase = AnalysisPhase::Analyzed;
            state.error = None;
        } else {
            state.phase = AnalysisPhase::Failed;
            state.error = Some(
                error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or(DEFAULT_ITEM_FAILURE)
                    .to_string(),
            );
        }
        true
    }

    /// Mark every item of `kind` that is not `Analyzed` as `Analyzing`.
    ///
    /// Returns the prior state of each item that changed, for
    /// [`restore`](Self::restore).
    pub fn mark_kind_analyzing(&mut self, kind: ItemKind) -> Vec<(String, ItemState)> {
        let mut previous = Vec::new();
        for ((k, id), state) in self.entries.iter_mut() {
            if *k != kind {
                continue;
            }
            if matches!(state.phase, AnalysisPhase::Analyzed | AnalysisPhase::Analyzing) {
                continue;
            }
            previous.push((id.clone(), state.clone()));
            state.phase = AnalysisPhase::Analyzing;
            state.error = None;
        }
        previous
    }

    /// Put back states captured by [`mark_kind_analyzing`](Self::mark_kind_analyzing),
    /// for items that are still `Analyzing`.
    pub fn restore(&mut self, kind: ItemKind, previous: Vec<(String, ItemState)>) {
        for (id, prior) in previous {
            if let Some(state) = self.entries.get_mut(&(kind, id))
                && state.phase.is_analyzing()
            {
                *state = prior;
            }
        }
    }

    /// Finish every `Analyzing` item of `kind` with the same outcome.
    /// Returns how many items were released.
    pub fn finish_kind(&mut self, kind: ItemKind, success: bool, error: Option<&str>) -> usize {
        let ids: Vec<String> = self
            .of_kind(kind)
            .filter(|(_, state)| state.phase.is_analyzing())
            .map(|(id, _)| id.to_string())
            .collect();

        ids.iter()
            .filter(|id| self.mark_finished(kind, id, success, error))
            .count()
    }

    /// Reconciliation pass against the ground-truth index.
    ///
    /// `Analyzing` items are left alone; every other item becomes `Analyzed`
    /// when the index lists it and `Pending` otherwise, with its error
    /// cleared.
    pub fn reconcile(&mut self, index: &AnalysisIndex) {
        for ((kind, id), state) in self.entries.iter_mut() {
            if state.phase.is_analyzing() {
                continue;
            }
            *state = ItemState::from_index(index.contains(*kind, id));
        }
    }

    pub fn any_analyzing(&self, kind: ItemKind) -> bool {
        self.of_kind(kind).any(|(_, state)| state.phase.is_analyzing())
    }

    /// `(analyzed, total)` for one kind.
    pub fn counts(&self, kind: ItemKind) -> (usize, usize) {
        self.of_kind(kind).fold((0, 0), |(analyzed, total), (_, state)| {
            let done = usize::from(state.phase == AnalysisPhase::Analyzed);
            (analyzed + done, total + 1)
        })
    }
}
