use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use crate::config::json;
use crate::error::{DockError, Result};
use crate::views::ViewConfig;

const LAYOUT_SUFFIX: &str = ".layout.json";

/// Persisted form of a layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    pub name: CompactString,

    /// Activities the layout is assigned to; empty means all of them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<CompactString>,

    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl LayoutData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Load/save collaborator for layouts
pub trait LayoutStore: Send {
    fn load_layout(&self, name: &str) -> Result<LayoutData>;

    fn save_layout(&mut self, layout: &LayoutData) -> Result<()>;

    /// Names of all stored layouts, sorted
    fn layout_names(&self) -> Vec<CompactString>;
}

/// Layouts as `<name>.layout.json` files in one directory
#[derive(Debug, Clone)]
pub struct JsonLayoutStore {
    dir: PathBuf,
}

impl JsonLayoutStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, LAYOUT_SUFFIX))
    }
}

impl LayoutStore for JsonLayoutStore {
    fn load_layout(&self, name: &str) -> Result<LayoutData> {
        let path = self.file(name);
        if !path.exists() {
            return Err(DockError::LayoutNotFound(name.into()));
        }

        let mut data: LayoutData = json::load(&path)?;
        // The file name is authoritative
        data.name = name.into();
        Ok(data)
    }

    fn save_layout(&mut self, layout: &LayoutData) -> Result<()> {
        let path = self.file(&layout.name);
        debug!("Saving layout to {:?}", path);
        json::save(&path, layout)
    }

    fn layout_names(&self) -> Vec<CompactString> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<CompactString> = entries
            .flatten()
            .filter_map(|entry| {
                let file_name = entry.file_name();
                file_name.to_str()?.strip_suffix(LAYOUT_SUFFIX).map(CompactString::from)
            })
            .collect();
        names.sort();
        names
    }
}

/// Layouts kept in memory, for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStore {
    layouts: BTreeMap<CompactString, LayoutData>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: LayoutData) -> Self {
        self.layouts.insert(layout.name.clone(), layout);
        self
    }

    pub fn get(&self, name: &str) -> Option<&LayoutData> {
        self.layouts.get(name)
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load_layout(&self, name: &str) -> Result<LayoutData> {
        self.layouts
            .get(name)
            .cloned()
            .ok_or_else(|| DockError::LayoutNotFound(name.into()))
    }

    fn save_layout(&mut self, layout: &LayoutData) -> Result<()> {
        self.layouts.insert(layout.name.clone(), layout.clone());
        Ok(())
    }

    fn layout_names(&self) -> Vec<CompactString> {
        self.layouts.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    #[test]
    fn test_json_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonLayoutStore::new(dir.path().join("layouts"));

        let mut layout = LayoutData::new("Work");
        layout.activities.push("office".into());
        layout.views.push(ViewConfig::new(7, Edge::Left).on_screen(1));
        store.save_layout(&layout).unwrap();
        store.save_layout(&LayoutData::new("Alpha")).unwrap();

        assert_eq!(store.load_layout("Work").unwrap(), layout);
        assert_eq!(store.layout_names(), vec!["Alpha", "Work"]);
    }

    #[test]
    fn test_missing_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLayoutStore::new(dir.path());

        assert!(matches!(store.load_layout("Nope"), Err(DockError::LayoutNotFound(_))));
        assert!(MemoryLayoutStore::new().load_layout("Nope").is_err());
    }
}
