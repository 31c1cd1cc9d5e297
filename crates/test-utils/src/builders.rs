#![allow(dead_code)]

use std::path::PathBuf;

use backstage::config::{ConfigFile, RawConfigFile};
use backstage::types::{ItemKind, ItemSummary, ProjectItems};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn tools_path(mut self, path: &str) -> Self {
        self.config.backend.tools_path = path.to_string();
        self
    }

    pub fn projects_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.backend.projects_root = root.into();
        self
    }

    pub fn allowed_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.import.allowed_extensions =
            extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn suggestion_count(mut self, count: usize) -> Self {
        self.config.import.suggestion_count = count;
        self
    }

    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.analysis.index_dir = dir.into();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a project catalog.
#[derive(Default)]
pub struct ProjectItemsBuilder {
    items: ProjectItems,
}

impl ProjectItemsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, kind: ItemKind, id: &str, title: &str) -> Self {
        self.items.of_mut(kind).push(ItemSummary::new(id, title));
        self
    }

    pub fn scene(self, id: &str) -> Self {
        let title = format!("INT. {id} - DAY");
        self.item(ItemKind::Scene, id, &title)
    }

    pub fn character(self, id: &str) -> Self {
        let title = id.to_uppercase();
        self.item(ItemKind::Character, id, &title)
    }

    pub fn location(self, id: &str) -> Self {
        let title = id.to_uppercase();
        self.item(ItemKind::Location, id, &title)
    }

    pub fn build(self) -> ProjectItems {
        self.items
    }
}

/// Three scenes, two characters and one location.
pub fn sample_items() -> ProjectItems {
    ProjectItemsBuilder::new()
        .scene("scn_001")
        .scene("scn_002")
        .scene("scn_003")
        .character("chr_anna")
        .character("chr_ben")
        .location("loc_kitchen")
        .build()
}
