use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::json;
use crate::error::Result;
use crate::types::MemoryUsage;

pub const DEFAULT_LAYOUT_NAME: &str = "My Layout";

/// Global dock settings (settings.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockSettings {
    #[serde(default)]
    pub memory_usage: MemoryUsage,

    /// Layout that is current in single-layout mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_layout: Option<CompactString>,

    /// Debounce for screen topology changes, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_tracker_interval: Option<u64>,

    /// Last layout used per activity in multiple-layouts mode
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub activity_layouts: BTreeMap<CompactString, CompactString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_disable_borders: Option<bool>,
}

impl DockSettings {
    pub fn load(path: &Path) -> Self {
        json::load_or_default(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        json::save(path, self)
    }

    pub fn single_layout(&self) -> &str {
        self.single_layout.as_deref().unwrap_or(DEFAULT_LAYOUT_NAME)
    }

    pub fn set_single_layout(&mut self, name: &str) {
        self.single_layout = Some(name.into());
    }

    /// Get screen tracker interval with default
    pub fn screen_tracker_interval(&self) -> Duration {
        Duration::from_millis(self.screen_tracker_interval.unwrap_or(2500))
    }

    pub fn set_screen_tracker_interval(&mut self, ms: u64) {
        self.screen_tracker_interval = Some(ms);
    }

    /// Interval used by view positioners to recheck their screen
    pub fn screen_resync_interval(&self) -> Duration {
        let tracker = self.screen_tracker_interval.unwrap_or(2500);
        Duration::from_millis(tracker.saturating_sub(500).max(1000))
    }

    pub fn can_disable_borders(&self) -> bool {
        self.can_disable_borders.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let settings: DockSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.memory_usage, MemoryUsage::Single);
        assert_eq!(settings.single_layout(), DEFAULT_LAYOUT_NAME);
        assert_eq!(settings.screen_tracker_interval(), Duration::from_millis(2500));
        assert_eq!(settings.screen_resync_interval(), Duration::from_millis(2000));
    }

    #[test]
    fn test_resync_interval_floor() {
        let mut settings = DockSettings::default();
        settings.set_screen_tracker_interval(800);
        assert_eq!(settings.screen_resync_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");

        let mut settings = DockSettings {
            memory_usage: MemoryUsage::Multiple,
            ..Default::default()
        };
        settings.set_single_layout("Work");
        settings.save_to(&path).unwrap();

        assert_eq!(DockSettings::load(&path), settings);
    }
}
