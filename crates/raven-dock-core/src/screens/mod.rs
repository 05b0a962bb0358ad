use ahash::AHashMap;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::config::json;
use crate::error::Result;
use crate::geometry::Rect;
use crate::types::ScreenId;

/// A connected screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub id: ScreenId,
    pub name: CompactString,
    pub geometry: Rect,
    /// Geometry minus areas reserved by other desktop components
    pub available_geometry: Rect,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy)]
struct Output {
    geometry: Rect,
    available_geometry: Rect,
}

/// On-disk screen pool (screens.json): id -> connector name
#[derive(Debug, Default, Serialize, Deserialize)]
struct ScreenPoolFile {
    #[serde(default)]
    screens: BTreeMap<ScreenId, CompactString>,
}

/// Registry of known screens.
///
/// Connector names get an id the first time they are seen and keep it for
/// the lifetime of the pool, connected or not. Views with an explicit
/// screen store that id, so they return to the same output when it is
/// plugged back in.
#[derive(Debug, Default)]
pub struct ScreenRegistry {
    ids: AHashMap<CompactString, ScreenId>,
    names: AHashMap<ScreenId, CompactString>,
    outputs: AHashMap<ScreenId, Output>,
    /// Connection order, used as the enumeration order of connected screens
    order: Vec<ScreenId>,
    primary: Option<ScreenId>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the id mapping saved by a previous session
    pub fn load(path: &Path) -> Self {
        let file: ScreenPoolFile = json::load_or_default(path);
        let mut registry = Self::new();

        for (id, name) in file.screens {
            registry.ids.insert(name.clone(), id);
            registry.names.insert(id, name);
        }

        debug!("Loaded {} known screens from {:?}", registry.names.len(), path);
        registry
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = ScreenPoolFile {
            screens: self
                .names
                .iter()
                .map(|(id, name)| (*id, name.clone()))
                .collect(),
        };
        json::save(path, &file)
    }

    pub fn id_for(&self, connector: &str) -> Option<ScreenId> {
        self.ids.get(connector).copied()
    }

    pub fn connector_for(&self, id: ScreenId) -> Option<&str> {
        self.names.get(&id).map(|name| name.as_str())
    }

    /// Id for a connector, allocating the lowest unused id for new names
    pub fn register_screen(&mut self, connector: &str) -> ScreenId {
        if let Some(id) = self.id_for(connector) {
            return id;
        }

        let id = self.first_available_id();
        self.ids.insert(connector.into(), id);
        self.names.insert(id, connector.into());
        debug!("Registered screen {} with id {}", connector, id);
        id
    }

    fn first_available_id(&self) -> ScreenId {
        (0..)
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or_default()
    }

    /// A screen was plugged in; returns its stable id
    pub fn connect(&mut self, connector: &str, geometry: Rect, available_geometry: Rect) -> ScreenId {
        let id = self.register_screen(connector);

        self.outputs.insert(
            id,
            Output {
                geometry,
                available_geometry,
            },
        );
        if !self.order.contains(&id) {
            self.order.push(id);
        }
        if self.primary.is_none() {
            self.primary = Some(id);
        }

        info!("Screen connected: {} (id {}) {}", connector, id, geometry);
        id
    }

    /// A screen was unplugged. The id stays reserved for the connector.
    pub fn disconnect(&mut self, connector: &str) -> Option<ScreenId> {
        let id = self.id_for(connector)?;
        self.outputs.remove(&id)?;
        self.order.retain(|other| *other != id);

        if self.primary == Some(id) {
            self.primary = self.order.first().copied();
        }

        info!("Screen disconnected: {} (id {})", connector, id);
        Some(id)
    }

    /// Update geometry of a connected screen; returns its id when something changed
    pub fn set_geometry(
        &mut self,
        connector: &str,
        geometry: Rect,
        available_geometry: Rect,
    ) -> Option<ScreenId> {
        let id = self.id_for(connector)?;
        let output = self.outputs.get_mut(&id)?;

        if output.geometry == geometry && output.available_geometry == available_geometry {
            return None;
        }

        output.geometry = geometry;
        output.available_geometry = available_geometry;
        Some(id)
    }

    /// Track the OS primary screen; returns true when the primary changed
    pub fn set_primary(&mut self, connector: &str) -> bool {
        let Some(id) = self.id_for(connector) else {
            return false;
        };
        if !self.outputs.contains_key(&id) || self.primary == Some(id) {
            return false;
        }

        info!("Primary screen changed to {} (id {})", connector, id);
        self.primary = Some(id);
        true
    }

    pub fn primary_id(&self) -> Option<ScreenId> {
        self.primary
    }

    pub fn is_connected(&self, id: ScreenId) -> bool {
        self.outputs.contains_key(&id)
    }

    pub fn geometry_for(&self, id: ScreenId) -> Option<Rect> {
        self.outputs.get(&id).map(|output| output.geometry)
    }

    pub fn available_geometry_for(&self, id: ScreenId) -> Option<Rect> {
        self.outputs.get(&id).map(|output| output.available_geometry)
    }

    pub fn screen(&self, id: ScreenId) -> Option<Screen> {
        let output = self.outputs.get(&id)?;
        Some(Screen {
            id,
            name: self.names.get(&id).cloned().unwrap_or_default(),
            geometry: output.geometry,
            available_geometry: output.available_geometry,
            is_primary: self.primary == Some(id),
        })
    }

    /// Connected screens in connection order
    pub fn connected(&self) -> impl Iterator<Item = Screen> + '_ {
        self.order.iter().filter_map(|id| self.screen(*id))
    }

    pub fn connected_count(&self) -> usize {
        self.order.len()
    }

    /// Bounding rect of all connected screens (the X11 root window)
    pub fn root_geometry(&self) -> Rect {
        self.outputs
            .values()
            .fold(Rect::default(), |acc, output| acc.united(&output.geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_hd() -> Rect {
        Rect::new(0, 0, 1920, 1080)
    }

    #[test]
    fn test_register_is_stable_by_name() {
        let mut screens = ScreenRegistry::new();
        let first = screens.register_screen("HDMI-1");
        screens.connect("HDMI-1", full_hd(), full_hd());
        screens.disconnect("HDMI-1");

        assert_eq!(screens.register_screen("HDMI-1"), first);
        assert_eq!(screens.connect("HDMI-1", full_hd(), full_hd()), first);
    }

    #[test]
    fn test_lowest_unused_id() {
        let mut screens = ScreenRegistry::new();
        assert_eq!(screens.register_screen("eDP-1"), 0);
        assert_eq!(screens.register_screen("HDMI-1"), 1);
        assert_eq!(screens.register_screen("DP-2"), 2);
        assert_eq!(screens.register_screen("eDP-1"), 0);
    }

    #[test]
    fn test_lookups_on_disconnected_screen() {
        let mut screens = ScreenRegistry::new();
        let id = screens.connect("HDMI-1", full_hd(), full_hd());
        screens.disconnect("HDMI-1");

        assert_eq!(screens.geometry_for(id), None);
        assert_eq!(screens.connector_for(id), Some("HDMI-1"));
        assert_eq!(screens.id_for("DP-9"), None);
        assert_eq!(screens.connector_for(42), None);
        assert!(screens.screen(id).is_none());
    }

    #[test]
    fn test_primary_tracking() {
        let mut screens = ScreenRegistry::new();
        let edp = screens.connect("eDP-1", full_hd(), full_hd());
        let hdmi = screens.connect("HDMI-1", Rect::new(1920, 0, 1280, 1024), Rect::new(1920, 0, 1280, 1024));

        assert_eq!(screens.primary_id(), Some(edp));
        assert!(screens.set_primary("HDMI-1"));
        assert!(!screens.set_primary("HDMI-1"));
        assert_eq!(screens.primary_id(), Some(hdmi));

        screens.disconnect("HDMI-1");
        assert_eq!(screens.primary_id(), Some(edp));
        assert_eq!(screens.root_geometry(), full_hd());
    }

    #[test]
    fn test_pool_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screens.json");

        let mut screens = ScreenRegistry::new();
        screens.register_screen("eDP-1");
        let hdmi = screens.register_screen("HDMI-1");
        screens.save(&path).unwrap();

        let restored = ScreenRegistry::load(&path);
        assert_eq!(restored.id_for("HDMI-1"), Some(hdmi));
        assert!(!restored.is_connected(hdmi));
    }
}
