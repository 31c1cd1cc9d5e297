// src/backend/events.rs

//! Push-event channel between the backend and the controllers.
//!
//! Each topic ([`ImportEvent`], [`AnalysisEvent`]) has a single subscriber
//! slot. Subscribing replaces whoever held the slot before, so an event is
//! never delivered twice. Publishing with no subscriber drops the event:
//! delivery is to current subscribers only.
//!
//! A [`Subscription`] is an owned handle. Dropping it (or calling
//! [`Subscription::unsubscribe`]) frees the slot.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::types::{AnalysisTarget, ItemKind};

/// Events published for a running import, keyed by request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    Progress {
        request_id: String,
        line: Option<String>,
    },
    Completed {
        request_id: String,
        success: bool,
        project_id: Option<String>,
        error: Option<String>,
    },
}

impl ImportEvent {
    pub fn request_id(&self) -> &str {
        match self {
            ImportEvent::Progress { request_id, .. } | ImportEvent::Completed { request_id, .. } => {
                request_id
            }
        }
    }
}

/// Events published by a daemon for analysis work, keyed by kind + target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    Started {
        kind: Option<ItemKind>,
        target: AnalysisTarget,
        project_path: Option<String>,
    },
    Progress {
        kind: Option<ItemKind>,
        target: AnalysisTarget,
        project_path: Option<String>,
        completed: usize,
        total: usize,
    },
    Completed {
        kind: Option<ItemKind>,
        target: AnalysisTarget,
        project_path: Option<String>,
        success: bool,
        error: Option<String>,
    },
}

impl AnalysisEvent {
    pub fn project_path(&self) -> Option<&str> {
        match self {
            AnalysisEvent::Started { project_path, .. }
            | AnalysisEvent::Progress { project_path, .. }
            | AnalysisEvent::Completed { project_path, .. } => project_path.as_deref(),
        }
    }
}

struct Slot<E> {
    id: u64,
    tx: mpsc::UnboundedSender<E>,
}

struct ChannelState<E> {
    slot: Option<Slot<E>>,
    next_id: u64,
}

/// Single-subscriber topic.
pub struct Channel<E> {
    name: &'static str,
    state: Arc<Mutex<ChannelState<E>>>,
}

impl<E> Clone for Channel<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: Send + 'static> fmt::Debug for Channel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribed", &self.has_subscriber())
            .finish()
    }
}

impl<E: Send + 'static> Channel<E> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(ChannelState {
                slot: None,
                next_id: 1,
            })),
        }
    }

    /// Take the subscriber slot, tearing down any previous subscription.
    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;

        if let Some(previous) = state.slot.replace(Slot { id, tx }) {
            debug!(
                topic = self.name,
                previous = previous.id,
                current = id,
                "replacing existing subscription"
            );
        }

        Subscription {
            id,
            rx,
            channel: self.clone(),
        }
    }

    /// Deliver an event to the current subscriber.
    ///
    /// Returns `false` when nobody is subscribed (the event is dropped).
    pub fn publish(&self, event: E) -> bool {
        let state = lock(&self.state);
        match state.slot.as_ref() {
            Some(slot) => slot.tx.send(event).is_ok(),
            None => {
                trace!(topic = self.name, "no subscriber; dropping event");
                false
            }
        }
    }

    pub fn has_subscriber(&self) -> bool {
        lock(&self.state).slot.is_some()
    }

    fn is_current(&self, id: u64) -> bool {
        lock(&self.state).slot.as_ref().is_some_and(|s| s.id == id)
    }

    fn release(&self, id: u64) {
        let mut state = lock(&self.state);
        if state.slot.as_ref().is_some_and(|s| s.id == id) {
            state.slot = None;
            debug!(topic = self.name, subscription = id, "subscription released");
        }
    }
}

/// Owned subscription handle. Dropping it unsubscribes.
pub struct Subscription<E: Send + 'static> {
    id: u64,
    rx: mpsc::UnboundedReceiver<E>,
    channel: Channel<E>,
}

impl<E: Send + 'static> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.channel.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<E: Send + 'static> Subscription<E> {
    /// Wait for the next event.
    ///
    /// Returns `None` once this subscription has been replaced by a newer
    /// subscriber; events still buffered for it are discarded.
    pub async fn recv(&mut self) -> Option<E> {
        if !self.is_active() {
            return None;
        }
        let event = self.rx.recv().await?;
        self.is_active().then_some(event)
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<E> {
        if !self.is_active() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Whether this handle still owns the topic's subscriber slot.
    pub fn is_active(&self) -> bool {
        self.channel.is_current(self.id)
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<E: Send + 'static> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.channel.release(self.id);
    }
}

/// All topics the backend publishes on. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    import: Channel<ImportEvent>,
    analysis: Channel<AnalysisEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            import: Channel::new("import"),
            analysis: Channel::new("analysis"),
        }
    }

    pub fn import(&self) -> &Channel<ImportEvent> {
        &self.import
    }

    pub fn analysis(&self) -> &Channel<AnalysisEvent> {
        &self.analysis
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
