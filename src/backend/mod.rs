// src/backend/mod.rs

//! Everything the controllers know about the out-of-process worker.
//!
//! - [`gateway`] holds the request/response traits (`ImportGateway`,
//!   `AnalysisGateway`).
//! - [`events`] is the push channel (`EventBus`, `Subscription`).
//! - [`index`] queries the ground-truth record of analyzed items.
//! - [`catalog`] lists project items and fetches item details.
//! - [`paths`] holds title normalisation, collision and file checks.
//! - [`local`] is the concrete backend that shells out to the tools
//!   executable, one process per request.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub mod catalog;
pub mod events;
pub mod gateway;
pub mod index;
pub mod local;
pub mod paths;

pub use catalog::ProjectCatalog;
pub use events::{AnalysisEvent, Channel, EventBus, ImportEvent, Subscription};
pub use gateway::{AnalysisGateway, GatewayResult, ImportGateway, StartImport};
pub use index::{FsIndexClient, IndexClient};
pub use local::LocalBackend;

/// Boxed future returned by the backend traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A rejected backend call. The message is shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        GatewayError::new(format!("{err:#}"))
    }
}

impl From<String> for GatewayError {
    fn from(message: String) -> Self {
        GatewayError::new(message)
    }
}

impl From<&str> for GatewayError {
    fn from(message: &str) -> Self {
        GatewayError::new(message)
    }
}
