// src/analysis/mod.rs

//! Analysis reconciliation.
//!
//! Per-item analysis phases for every scene, character and location of the
//! loaded project, kept consistent with three update sources:
//!
//! - optimistic marks made when a request is issued;
//! - pushed events from a daemon (when one is reachable);
//! - the ground-truth index, polled when no daemon will report back.
//!
//! Layout mirrors the import module: [`state`] and [`event_handlers`] are
//! pure, [`engine`] is the async shell that talks to the backend.

pub mod engine;
pub mod event_handlers;
pub mod state;

use std::fmt;

pub use engine::{AnalysisEngine, AnalysisProgress, DetailView, ItemWithState};
pub use event_handlers::{EngineCommand, EventStep};
pub use state::{ItemState, PhaseMap};

/// Error recorded when a failed analysis carries no message.
pub const DEFAULT_ITEM_FAILURE: &str = "Analysis failed";

/// Error recorded when a failed batch request carries no message.
pub const DEFAULT_BATCH_FAILURE: &str = "Batch analysis failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnalysisPhase {
    #[default]
    Pending,
    Analyzing,
    Analyzed,
    Failed,
}

impl AnalysisPhase {
    /// Transitions a single attempt may take.
    ///
    /// `Pending -> Analyzing -> {Analyzed, Failed}`, and a finished item may
    /// start again. Staying in `Analyzing` is allowed (repeated progress).
    pub fn can_transition_to(self, next: AnalysisPhase) -> bool {
        use AnalysisPhase::*;
        matches!(
            (self, next),
            (Pending | Analyzed | Failed | Analyzing, Analyzing) | (Analyzing, Analyzed | Failed)
        )
    }

    pub fn is_analyzing(self) -> bool {
        self == AnalysisPhase::Analyzing
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisPhase::Pending => "pending",
            AnalysisPhase::Analyzing => "analyzing",
            AnalysisPhase::Analyzed => "analyzed",
            AnalysisPhase::Failed => "failed",
        };
        f.pad(s)
    }
}
