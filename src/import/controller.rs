// src/import/controller.rs

//! Async shell around [`ImportSession`].
//!
//! The controller issues gateway calls, owns the import event subscription
//! and feeds results into the session. It takes `&mut self` everywhere, so
//! the caller's loop serialises every mutation.
//!
//! Subscription rules:
//! - subscribe before the start request, so no early event is lost;
//! - release the subscription on every exit from `Executing` (completion,
//!   failed start, cancel, close, reset).

use tracing::{debug, info, warn};

use super::session::{EventDisposition, ImportSession};
use super::{ImportError, ImportStatus, ImportStep, validate_title};
use crate::backend::{EventBus, ImportEvent, ImportGateway, StartImport, Subscription};

pub struct ImportController<G: ImportGateway> {
    gateway: G,
    bus: EventBus,
    session: ImportSession,
    is_open: bool,
    subscription: Option<Subscription<ImportEvent>>,
}

impl<G: ImportGateway> ImportController<G> {
    pub fn new(gateway: G, bus: EventBus) -> Self {
        Self {
            gateway,
            bus,
            session: ImportSession::new(),
            is_open: false,
            subscription: None,
        }
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Whether this controller currently holds the import topic.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn can_go_back(&self) -> bool {
        self.session.can_go_back()
    }

    pub fn is_importing(&self) -> bool {
        self.session.is_importing()
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    /// Open the wizard on a fresh session.
    pub async fn open(&mut self) {
        self.cancel_running().await;
        self.release_subscription();
        self.session.reset();
        self.is_open = true;
    }

    /// Close the wizard, cancelling a running import first.
    pub async fn close(&mut self) {
        self.cancel_running().await;
        self.release_subscription();
        self.session.reset();
        self.is_open = false;
    }

    pub fn reset(&mut self) {
        self.release_subscription();
        self.session.reset();
    }

    pub fn go_back(&mut self) -> bool {
        self.session.go_back()
    }

    /// Validate `path` on the backend and advance to title entry.
    pub async fn submit_file(&mut self, path: &str) -> Result<(), ImportError> {
        self.session.ensure_step("select a file", &[ImportStep::FileSelect])?;
        self.session.clear_error();

        match self.gateway.validate_import_file(path.to_string()).await {
            Ok(()) => {
                debug!(path, "import file accepted");
                self.session.file_accepted(path);
                Ok(())
            }
            Err(err) => self.fail_step(err.into()),
        }
    }

    /// Validate the title locally, then resolve it to an output path or a
    /// collision. Only accepted at `TitleEntry`; from `Confirm` or
    /// `CollisionResolve` the caller goes back first.
    pub async fn submit_title(&mut self, value: &str) -> Result<(), ImportError> {
        self.session.ensure_step("enter a title", &[ImportStep::TitleEntry])?;
        self.session.clear_error();

        let title = match validate_title(value) {
            Ok(title) => title.to_string(),
            Err(err) => return self.fail_step(err),
        };
        self.session.set_title(title.clone());

        let collision = match self.gateway.check_import_collision(title.clone()).await {
            Ok(collision) => collision,
            Err(err) => return self.fail_step(err.into()),
        };

        if let Some(collision) = collision {
            debug!(title = %title, existing = %collision.existing_path, "title collides");
            self.session.title_collides(collision);
            return Ok(());
        }

        match self.gateway.resolve_import_path(title).await {
            Ok(path) => {
                self.session.title_resolved(path);
                Ok(())
            }
            Err(err) => self.fail_step(err.into()),
        }
    }

    /// Start the import with the resolved path, or `override_path` when the
    /// user picked a different one.
    ///
    /// On success the session stays in `Executing` until a completion event
    /// arrives (see [`recv_event`](Self::recv_event)) or the user cancels.
    pub async fn confirm_and_execute(
        &mut self,
        override_path: Option<&str>,
        overwrite: bool,
    ) -> Result<(), ImportError> {
        let target = self.session.begin_execution(override_path)?;

        self.subscription = Some(self.bus.import().subscribe());

        let request = StartImport {
            file_path: self.session.file_path().to_string(),
            title: self.session.title().to_string(),
            output_path: target.clone(),
            overwrite,
        };

        match self.gateway.start_import(request).await {
            Ok(request_id) => {
                info!(request_id = %request_id, output = %target, "import running");
                self.session.execution_started(request_id, target);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "import start rejected");
                self.session.finish(false, Some(err.message().to_string()), None);
                self.release_subscription();
                Err(err.into())
            }
        }
    }

    /// Cancel the running import. The session always ends at `Result`
    /// with the cancellation error, whatever the backend says.
    pub async fn cancel(&mut self) {
        self.cancel_running().await;
        self.session.cancelled();
        self.release_subscription();
    }

    /// Apply one pushed event.
    pub fn handle_event(&mut self, event: &ImportEvent) -> EventDisposition {
        let disposition = self.session.apply_event(event);
        if disposition == EventDisposition::Completed {
            info!(status = ?self.session.status(), "import finished");
            self.release_subscription();
        }
        disposition
    }

    /// Wait for the next event on the subscription and apply it.
    ///
    /// `None` when there is no live subscription.
    pub async fn recv_event(&mut self) -> Option<EventDisposition> {
        let subscription = self.subscription.as_mut()?;
        let event = subscription.recv().await?;
        Some(self.handle_event(&event))
    }

    /// Pump events until the import leaves `Executing` or the subscription
    /// goes away.
    pub async fn drive_to_result(&mut self) -> ImportStatus {
        while self.session.is_importing() {
            if self.recv_event().await.is_none() {
                break;
            }
        }
        self.session.status()
    }

    fn fail_step(&mut self, err: ImportError) -> Result<(), ImportError> {
        self.session.set_error(err.to_string());
        Err(err)
    }

    async fn cancel_running(&mut self) {
        if !self.session.is_importing() {
            return;
        }
        let Some(request_id) = self.session.request_id().map(str::to_string) else {
            return;
        };
        if let Err(err) = self.gateway.cancel_import(request_id.clone()).await {
            debug!(request_id = %request_id, error = %err, "ignoring cancel failure");
        }
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
