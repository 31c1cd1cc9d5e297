// src/backend/catalog.rs

use serde_json::Value;

use super::{BoxFuture, GatewayResult};
use crate::types::{ItemKind, ProjectItems};

/// Read access to a project's items.
pub trait ProjectCatalog: Send + Sync {
    /// Every scene, character and location of the project.
    fn list_items(&self, project: String) -> BoxFuture<'_, GatewayResult<ProjectItems>>;

    /// Detail record of one item, including its analysis when present.
    fn item_detail(
        &self,
        project: String,
        kind: ItemKind,
        item_id: String,
    ) -> BoxFuture<'_, GatewayResult<Value>>;
}
