use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Kind of analysable item inside a project.
///
/// Item identifiers are only unique within their kind, so every lookup in
/// the analysis engine is keyed by `(kind, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Scene,
    Character,
    Location,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Scene, ItemKind::Character, ItemKind::Location];

    /// Section name as used by the catalog and batch requests.
    pub fn section(self) -> &'static str {
        match self {
            ItemKind::Scene => "scenes",
            ItemKind::Character => "characters",
            ItemKind::Location => "locations",
        }
    }

    /// Singular name used by per-item analyze operations.
    pub fn singular(self) -> &'static str {
        match self {
            ItemKind::Scene => "scene",
            ItemKind::Character => "character",
            ItemKind::Location => "location",
        }
    }

    /// File-name prefix of analysis results in the ground-truth index.
    pub fn index_prefix(self) -> &'static str {
        match self {
            ItemKind::Scene => "scn_",
            ItemKind::Character => "chr_",
            ItemKind::Location => "loc_",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scene" | "scenes" => Ok(ItemKind::Scene),
            "character" | "characters" => Ok(ItemKind::Character),
            "location" | "locations" => Ok(ItemKind::Location),
            other => Err(format!(
                "invalid item kind: {other} (expected \"scenes\", \"characters\" or \"locations\")"
            )),
        }
    }
}

/// Correlation target of an analysis event or request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    Item(String),
    /// Reserved "all" sentinel used by batch events.
    All,
}

impl AnalysisTarget {
    pub const ALL_SENTINEL: &'static str = "all";

    /// Parse a raw target id; empty ids and the sentinel both map to `All`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => AnalysisTarget::All,
            Some(id) if id == Self::ALL_SENTINEL => AnalysisTarget::All,
            Some(id) => AnalysisTarget::Item(id.to_string()),
        }
    }
}

/// Collision record returned when a title resolves to an existing project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionInfo {
    pub existing_path: String,
    pub suggested_names: Vec<String>,
}

/// Result payload of an analyze request whose call itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Per-kind sets of item ids the ground-truth index reports as analyzed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisIndex {
    pub scenes: BTreeSet<String>,
    pub characters: BTreeSet<String>,
    pub locations: BTreeSet<String>,
}

impl AnalysisIndex {
    pub fn ids(&self, kind: ItemKind) -> &BTreeSet<String> {
        match kind {
            ItemKind::Scene => &self.scenes,
            ItemKind::Character => &self.characters,
            ItemKind::Location => &self.locations,
        }
    }

    pub fn ids_mut(&mut self, kind: ItemKind) -> &mut BTreeSet<String> {
        match kind {
            ItemKind::Scene => &mut self.scenes,
            ItemKind::Character => &mut self.characters,
            ItemKind::Location => &mut self.locations,
        }
    }

    pub fn contains(&self, kind: ItemKind, id: &str) -> bool {
        self.ids(kind).contains(id)
    }

    pub fn insert(&mut self, kind: ItemKind, id: impl Into<String>) {
        self.ids_mut(kind).insert(id.into());
    }
}

/// Daemon status as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonStatus {
    /// True only when a daemon is running *for the requested project*.
    pub running: bool,
    pub project_path: Option<String>,
    pub busy: bool,
    pub queue_depth: usize,
}

/// Cached answer to "will completions arrive as push events?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DaemonReachability {
    #[default]
    Unknown,
    Present,
    Absent,
}

impl DaemonReachability {
    pub fn is_present(self) -> bool {
        self == DaemonReachability::Present
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemSummary {
    pub id: String,
    /// Display label (scene slugline, character or location name).
    #[serde(default, alias = "slugline", alias = "name")]
    pub title: String,
}

impl ItemSummary {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// All catalog entries of a project, partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectItems {
    pub scenes: Vec<ItemSummary>,
    pub characters: Vec<ItemSummary>,
    pub locations: Vec<ItemSummary>,
}

impl ProjectItems {
    pub fn of(&self, kind: ItemKind) -> &[ItemSummary] {
        match kind {
            ItemKind::Scene => &self.scenes,
            ItemKind::Character => &self.characters,
            ItemKind::Location => &self.locations,
        }
    }

    pub fn of_mut(&mut self, kind: ItemKind) -> &mut Vec<ItemSummary> {
        match kind {
            ItemKind::Scene => &mut self.scenes,
            ItemKind::Character => &mut self.characters,
            ItemKind::Location => &mut self.locations,
        }
    }

    pub fn contains(&self, kind: ItemKind, id: &str) -> bool {
        self.of(kind).iter().any(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len() + self.characters.len() + self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
