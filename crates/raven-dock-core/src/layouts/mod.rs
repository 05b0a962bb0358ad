//! Layouts: named sets of views, swapped per session or per activity.

mod store;

pub use store::{JsonLayoutStore, LayoutData, LayoutStore, MemoryLayoutStore};

use compact_str::CompactString;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DockError, Result};
use crate::types::{MemoryUsage, ViewId};
use crate::views::{View, ViewConfig, ViewRegistry};

/// A loaded layout and the views it owns
#[derive(Debug)]
pub struct Layout {
    name: CompactString,
    activities: Vec<CompactString>,
    pub views: ViewRegistry,
}

impl Layout {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            activities: Vec::new(),
            views: ViewRegistry::new(),
        }
    }

    pub fn from_data(data: LayoutData, resync_interval: Duration) -> Self {
        let mut views = ViewRegistry::new();
        for config in data.views {
            if views.insert(View::new(config, resync_interval)).is_some() {
                warn!("Layout '{}' lists a view twice", data.name);
            }
        }

        Self {
            name: data.name,
            activities: data.activities,
            views,
        }
    }

    pub fn to_data(&self) -> LayoutData {
        LayoutData {
            name: self.name.clone(),
            activities: self.activities.clone(),
            views: self.views.iter().map(View::to_config).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activities(&self) -> &[CompactString] {
        &self.activities
    }

    /// A layout without activities is used for all of them
    pub fn is_shared(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn has_activity(&self, activity: &str) -> bool {
        self.activities.iter().any(|a| a == activity)
    }
}

/// Owns every loaded layout and decides which of them are current
pub struct LayoutRegistry {
    memory_usage: MemoryUsage,
    layouts: Vec<Layout>,
    single_current: Option<CompactString>,
    current_activity: Option<CompactString>,
    store: Box<dyn LayoutStore>,
    resync_interval: Duration,
}

impl LayoutRegistry {
    pub fn new(store: Box<dyn LayoutStore>, memory_usage: MemoryUsage, resync_interval: Duration) -> Self {
        Self {
            memory_usage,
            layouts: Vec::new(),
            single_current: None,
            current_activity: None,
            store,
            resync_interval,
        }
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        self.memory_usage
    }

    pub fn store(&self) -> &dyn LayoutStore {
        self.store.as_ref()
    }

    pub fn current_activity(&self) -> Option<&str> {
        self.current_activity.as_deref()
    }

    /// Returns true when the activity changed
    pub fn set_current_activity(&mut self, activity: &str) -> bool {
        if self.current_activity.as_deref() == Some(activity) {
            return false;
        }
        self.current_activity = Some(activity.into());
        true
    }

    pub fn set_resync_interval(&mut self, interval: Duration) {
        self.resync_interval = interval;
        for layout in &mut self.layouts {
            for view in layout.views.iter_mut() {
                view.positioner.set_resync_interval(interval);
            }
        }
    }

    // Loading

    pub fn is_loaded(&self, name: &str) -> bool {
        self.layout(name).is_some()
    }

    pub fn load(&mut self, name: &str) -> Result<()> {
        if self.is_loaded(name) {
            return Ok(());
        }

        let data = self.store.load_layout(name)?;
        let layout = Layout::from_data(data, self.resync_interval);
        info!("Loaded layout '{}' with {} views", name, layout.views.len());
        self.layouts.push(layout);
        Ok(())
    }

    /// Load a layout, creating an empty one when it doesn't exist yet
    pub fn load_or_create(&mut self, name: &str) -> Result<()> {
        match self.load(name) {
            Err(DockError::LayoutNotFound(_)) => {
                info!("Creating layout '{}'", name);
                let layout = Layout::new(name);
                self.store.save_layout(&layout.to_data())?;
                self.layouts.push(layout);
                Ok(())
            }
            other => other,
        }
    }

    /// Load every stored layout (multiple-layouts mode)
    pub fn load_all(&mut self) -> Result<()> {
        for name in self.store.layout_names() {
            self.load(&name)?;
        }
        Ok(())
    }

    /// Save and drop a layout. The caller releases its views first.
    pub fn unload(&mut self, name: &str) -> Result<Option<Layout>> {
        let Some(index) = self.layouts.iter().position(|l| l.name() == name) else {
            return Ok(None);
        };

        self.store.save_layout(&self.layouts[index].to_data())?;
        debug!("Unloaded layout '{}'", name);
        Ok(Some(self.layouts.remove(index)))
    }

    pub fn save(&mut self, name: &str) -> Result<()> {
        let layout = self
            .layout(name)
            .ok_or_else(|| DockError::LayoutNotFound(name.into()))?;
        let data = layout.to_data();
        self.store.save_layout(&data)
    }

    pub fn save_all(&mut self) -> Result<()> {
        for layout in &self.layouts {
            self.store.save_layout(&layout.to_data())?;
        }
        Ok(())
    }

    // Lookup

    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name() == name)
    }

    pub fn layout_mut(&mut self, name: &str) -> Option<&mut Layout> {
        self.layouts.iter_mut().find(|l| l.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Layout> {
        self.layouts.iter_mut()
    }

    /// Names of the loaded layouts, in load order
    pub fn names(&self) -> Vec<CompactString> {
        self.layouts.iter().map(|l| l.name.clone()).collect()
    }

    /// The one layout shown right now.
    ///
    /// With several layouts, the first one assigned to the current activity
    /// wins, then the first shared one.
    pub fn current_layout(&self) -> Option<&Layout> {
        match self.memory_usage {
            MemoryUsage::Single => self.single_current.as_deref().and_then(|name| self.layout(name)),
            MemoryUsage::Multiple => {
                let assigned = self
                    .current_activity
                    .as_deref()
                    .and_then(|activity| self.layouts.iter().find(|l| l.has_activity(activity)));
                assigned.or_else(|| self.layouts.iter().find(|l| l.is_shared()))
            }
        }
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current_layout().is_some_and(|l| l.name() == name)
    }

    pub fn current_names(&self) -> Vec<CompactString> {
        self.current_layout().map(|l| l.name.clone()).into_iter().collect()
    }

    /// Make `name` current.
    ///
    /// In single-layout mode the previous layout is saved and unloaded and
    /// returned so the caller can release its views. In multiple-layouts
    /// mode the layout takes over the current activity. A layout that
    /// can't be loaded leaves everything as it was.
    pub fn switch_to(&mut self, name: &str) -> Result<Vec<Layout>> {
        self.load(name)?;

        match self.memory_usage {
            MemoryUsage::Single => {
                self.single_current = Some(name.into());

                let others: Vec<CompactString> = self
                    .layouts
                    .iter()
                    .filter(|l| l.name() != name)
                    .map(|l| l.name.clone())
                    .collect();

                let mut unloaded = Vec::with_capacity(others.len());
                for other in others {
                    if let Some(layout) = self.unload(&other)? {
                        unloaded.push(layout);
                    }
                }
                info!("Switched to layout '{}'", name);
                Ok(unloaded)
            }
            MemoryUsage::Multiple => {
                // A shared layout stands in for the activity by going first
                if let Some(index) = self.layouts.iter().position(|l| l.name() == name && l.is_shared()) {
                    let layout = self.layouts.remove(index);
                    self.layouts.insert(0, layout);
                }

                if let Some(activity) = self.current_activity.clone() {
                    for layout in &mut self.layouts {
                        if layout.name() == name {
                            if !layout.is_shared() && !layout.has_activity(&activity) {
                                layout.activities.push(activity.clone());
                            }
                        } else {
                            layout.activities.retain(|a| *a != activity);
                        }
                    }
                }
                info!("Layout '{}' assigned to activity {:?}", name, self.current_activity);
                Ok(Vec::new())
            }
        }
    }

    // Views

    /// Name of the layout owning a view
    pub fn find_view(&self, id: ViewId) -> Option<&str> {
        self.layouts
            .iter()
            .find(|l| l.views.contains(id))
            .map(|l| l.name())
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.layouts.iter().find_map(|l| l.views.get(id))
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.layouts.iter_mut().find_map(|l| l.views.get_mut(id))
    }

    /// Add a view to a loaded layout; false when the layout isn't loaded
    /// or the id is taken
    pub fn add_view(&mut self, layout: &str, config: ViewConfig) -> bool {
        if self.find_view(config.id).is_some() {
            return false;
        }
        let interval = self.resync_interval;
        match self.layout_mut(layout) {
            Some(layout) => {
                layout.views.insert(View::new(config, interval));
                true
            }
            None => false,
        }
    }

    pub fn remove_view(&mut self, id: ViewId) -> Option<View> {
        self.layouts.iter_mut().find_map(|l| l.views.remove(id))
    }

    /// Move a view to another layout, loading it when needed
    pub fn move_view(&mut self, id: ViewId, to: &str) -> Result<bool> {
        match self.find_view(id) {
            None => return Ok(false),
            Some(from) if from == to => return Ok(false),
            Some(_) => {}
        }

        self.load(to)?;
        let Some(view) = self.remove_view(id) else {
            return Ok(false);
        };
        if let Some(target) = self.layout_mut(to) {
            target.views.insert(view);
        }
        info!("Moved view {} to layout '{}'", id, to);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Edge;

    fn layout(name: &str, activities: &[&str], views: &[ViewId]) -> LayoutData {
        LayoutData {
            name: name.into(),
            activities: activities.iter().map(|a| CompactString::from(*a)).collect(),
            views: views.iter().map(|id| ViewConfig::new(*id, Edge::Bottom)).collect(),
        }
    }

    fn registry(mode: MemoryUsage, layouts: Vec<LayoutData>) -> LayoutRegistry {
        let store = layouts
            .into_iter()
            .fold(MemoryLayoutStore::new(), |store, data| store.with_layout(data));
        LayoutRegistry::new(Box::new(store), mode, Duration::from_millis(2000))
    }

    #[test]
    fn test_single_switch_unloads_previous() {
        let mut layouts = registry(MemoryUsage::Single, vec![layout("A", &[], &[1]), layout("B", &[], &[2])]);
        assert!(layouts.switch_to("A").unwrap().is_empty());
        assert!(layouts.is_current("A"));

        let unloaded = layouts.switch_to("B").unwrap();
        assert_eq!(unloaded.len(), 1);
        assert_eq!(unloaded[0].name(), "A");
        assert!(layouts.is_current("B"));
        assert!(!layouts.is_loaded("A"));
        assert_eq!(layouts.find_view(2), Some("B"));
    }

    #[test]
    fn test_failed_switch_keeps_current() {
        let mut layouts = registry(MemoryUsage::Single, vec![layout("A", &[], &[1])]);
        layouts.switch_to("A").unwrap();

        assert!(layouts.switch_to("Missing").is_err());
        assert_eq!(layouts.current_names(), vec!["A"]);
    }

    #[test]
    fn test_multiple_layouts_follow_activity() {
        let mut layouts = registry(
            MemoryUsage::Multiple,
            vec![layout("Work", &["office"], &[1]), layout("Shared", &[], &[2])],
        );
        layouts.load_all().unwrap();

        layouts.set_current_activity("office");
        assert_eq!(layouts.current_names(), vec!["Work"]);

        layouts.set_current_activity("home");
        assert!(layouts.is_current("Shared"));
        assert!(!layouts.is_current("Work"));

        layouts.switch_to("Work").unwrap();
        assert!(layouts.is_current("Work"));
        assert!(!layouts.is_current("Shared"));
        assert_eq!(layouts.layout("Work").unwrap().activities(), &["office", "home"]);
    }

    #[test]
    fn test_one_current_layout_per_activity() {
        let mut layouts = registry(
            MemoryUsage::Multiple,
            vec![
                layout("Alpha", &[], &[1]),
                layout("Beta", &[], &[2]),
                layout("Work", &["office"], &[3]),
                layout("Office", &["office"], &[4]),
            ],
        );
        layouts.load_all().unwrap();
        let shared = layouts.current_names();
        assert_eq!(shared.len(), 1);
        assert!(layouts.layout(&shared[0]).unwrap().is_shared());

        layouts.set_current_activity("office");
        assert_eq!(layouts.current_names().len(), 1);

        layouts.set_current_activity("home");
        layouts.switch_to("Beta").unwrap();
        assert_eq!(layouts.current_names(), vec!["Beta"]);
        assert!(!layouts.is_current("Alpha"));
        assert!(layouts.layout("Beta").unwrap().is_shared());
    }

    #[test]
    fn test_move_view_between_layouts() {
        let mut layouts = registry(MemoryUsage::Multiple, vec![layout("A", &[], &[1, 2]), layout("B", &[], &[])]);
        layouts.load("A").unwrap();

        assert!(layouts.move_view(1, "B").unwrap());
        assert_eq!(layouts.find_view(1), Some("B"));
        assert!(!layouts.move_view(1, "B").unwrap());
        assert!(!layouts.move_view(9, "A").unwrap());
        assert_eq!(layouts.layout("A").unwrap().views.ids(), &[2]);
    }

    #[test]
    fn test_unload_saves_runtime_changes() {
        let mut layouts = registry(MemoryUsage::Single, vec![layout("A", &[], &[1])]);
        layouts.switch_to("A").unwrap();
        layouts.view_mut(1).unwrap().set_edge(Edge::Left);
        layouts.unload("A").unwrap();

        let saved = layouts.store().load_layout("A").unwrap();
        assert_eq!(saved.views[0].edge, Edge::Left);
    }

    #[test]
    fn test_load_or_create() {
        let mut layouts = registry(MemoryUsage::Single, Vec::new());
        layouts.load_or_create("My Layout").unwrap();

        assert!(layouts.is_loaded("My Layout"));
        assert_eq!(layouts.store().layout_names(), vec!["My Layout"]);
    }
}
