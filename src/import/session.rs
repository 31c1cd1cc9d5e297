// src/import/session.rs

//! Pure import session state and its transitions.
//!
//! Nothing here touches the backend. [`ImportController`](super::ImportController)
//! performs the calls and feeds their results into these methods, which keeps
//! the step machine deterministic and directly testable.

use tracing::debug;

use super::{
    DEFAULT_FAILURE, ImportError, ImportStatus, ImportStep, STARTING_IMPORT_LINE,
};
use crate::backend::ImportEvent;
use crate::types::CollisionInfo;

/// What [`ImportSession::apply_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Progress for the running request; its line (if any) was logged.
    Progress,
    /// Terminal event for the running request; the session is at `Result`.
    Completed,
    /// Not for the running request (or nothing is running). Ignored.
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSession {
    step: ImportStep,
    status: ImportStatus,
    file_path: String,
    title: String,
    output_path: String,
    collision: Option<CollisionInfo>,
    request_id: Option<String>,
    log: Vec<String>,
    error: Option<String>,
    project_id: Option<String>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> ImportStep {
        self.step
    }

    pub fn status(&self) -> ImportStatus {
        self.status
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    pub fn collision(&self) -> Option<&CollisionInfo> {
        self.collision.as_ref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Project id reported by a successful completion.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn can_go_back(&self) -> bool {
        matches!(
            self.step,
            ImportStep::TitleEntry | ImportStep::Confirm | ImportStep::CollisionResolve
        )
    }

    pub fn is_importing(&self) -> bool {
        self.status == ImportStatus::InProgress
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, ImportStatus::Success | ImportStatus::Failed)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Record a step-local failure without moving.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub(crate) fn ensure_step(
        &self,
        operation: &'static str,
        allowed: &[ImportStep],
    ) -> Result<(), ImportError> {
        if self.is_importing() {
            return Err(ImportError::AlreadyRunning);
        }
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(ImportError::InvalidStep {
                operation,
                step: self.step,
            })
        }
    }

    /// FileSelect -> TitleEntry once the backend accepted the file.
    pub fn file_accepted(&mut self, path: impl Into<String>) {
        self.file_path = path.into();
        self.error = None;
        self.step = ImportStep::TitleEntry;
    }

    /// Store the (trimmed) title before the backend checks it.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// The title is free: remember the canonical output path and confirm.
    pub fn title_resolved(&mut self, output_path: impl Into<String>) {
        self.output_path = output_path.into();
        self.collision = None;
        self.step = ImportStep::Confirm;
    }

    /// The title resolves to an existing project.
    pub fn title_collides(&mut self, collision: CollisionInfo) {
        self.output_path = collision.existing_path.clone();
        self.collision = Some(collision);
        self.step = ImportStep::CollisionResolve;
    }

    /// Enter `Executing`, returning the effective output path.
    ///
    /// Rejected (with no change) outside Confirm/CollisionResolve or while an
    /// import is already in progress.
    pub fn begin_execution(&mut self, override_path: Option<&str>) -> Result<String, ImportError> {
        self.ensure_step(
            "confirm the import",
            &[ImportStep::Confirm, ImportStep::CollisionResolve],
        )?;

        let target = match override_path.map(str::trim) {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => self.output_path.clone(),
        };

        self.status = ImportStatus::InProgress;
        self.step = ImportStep::Executing;
        self.log = vec![STARTING_IMPORT_LINE.to_string()];
        self.collision = None;
        self.error = None;
        self.request_id = None;
        self.project_id = None;

        Ok(target)
    }

    /// The start request returned: remember its id and the path it writes to.
    pub fn execution_started(&mut self, request_id: impl Into<String>, output_path: impl Into<String>) {
        self.request_id = Some(request_id.into());
        self.output_path = output_path.into();
    }

    /// Terminal transition. Every path out of `Executing` ends here.
    pub fn finish(&mut self, success: bool, error: Option<String>, project_id: Option<String>) {
        if success {
            self.status = ImportStatus::Success;
            self.error = None;
            self.project_id = project_id;
        } else {
            self.status = ImportStatus::Failed;
            self.error = Some(
                error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
            );
        }
        self.step = ImportStep::Result;
        self.collision = None;
        self.request_id = None;
    }

    /// Settle the session as cancelled by the user.
    pub fn cancelled(&mut self) {
        self.finish(false, Some(ImportError::Cancelled.to_string()), None);
    }

    /// Apply a pushed import event.
    ///
    /// Only events carrying the running request's id are applied; anything
    /// else (late completions after cancel, events of a previous session) is
    /// stale.
    pub fn apply_event(&mut self, event: &ImportEvent) -> EventDisposition {
        let running = self.is_importing()
            && self.request_id.as_deref() == Some(event.request_id());
        if !running {
            debug!(
                request_id = event.request_id(),
                current = ?self.request_id,
                status = ?self.status,
                "dropping stale import event"
            );
            return EventDisposition::Stale;
        }

        match event {
            ImportEvent::Progress { line, .. } => {
                if let Some(line) = line.as_deref().filter(|l| !l.is_empty()) {
                    self.log.push(line.to_string());
                }
                EventDisposition::Progress
            }
            ImportEvent::Completed {
                success,
                project_id,
                error,
                ..
            } => {
                self.finish(*success, error.clone(), project_id.clone());
                EventDisposition::Completed
            }
        }
    }

    /// Step back one screen, clearing any error. Returns whether it moved.
    pub fn go_back(&mut self) -> bool {
        let previous = match self.step {
            ImportStep::TitleEntry => ImportStep::FileSelect,
            ImportStep::Confirm | ImportStep::CollisionResolve => ImportStep::TitleEntry,
            _ => return false,
        };
        self.error = None;
        self.collision = None;
        self.step = previous;
        true
    }
}
