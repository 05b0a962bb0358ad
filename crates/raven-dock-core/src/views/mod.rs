use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::available::Occupant;
use crate::geometry::Rect;
use crate::positioner::Positioner;
use crate::types::{Alignment, Edge, FormFactor, ScreenId, ViewId, VisibilityMode, WindowId};
use crate::visibility::{ViewState, VisibilityManager, VisibilitySettings};

fn default_true() -> bool {
    true
}

fn default_max_length() -> f64 {
    1.0
}

fn default_normal_thickness() -> i32 {
    48
}

fn default_max_thickness() -> i32 {
    72
}

/// Persisted configuration of a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Id of the containment the view renders
    pub id: ViewId,

    /// Follow the primary screen instead of `screen`
    #[serde(default = "default_true")]
    pub on_primary: bool,

    /// Explicit screen, remembered while that screen is disconnected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenId>,

    #[serde(default)]
    pub edge: Edge,

    #[serde(default)]
    pub alignment: Alignment,

    /// Fraction of the screen length the view may use
    #[serde(default = "default_max_length")]
    pub max_length: f64,

    /// Fraction of the screen length to shift the view by
    #[serde(default)]
    pub offset: f64,

    #[serde(default = "default_normal_thickness")]
    pub normal_thickness: i32,

    /// Window thickness including room for zoom and shadows
    #[serde(default = "default_max_thickness")]
    pub max_thickness: i32,

    #[serde(default)]
    pub behaves_as_panel: bool,

    #[serde(default)]
    pub screen_edge_margin: i32,

    #[serde(default)]
    pub inner_shadow: i32,

    /// The view shows a task manager
    #[serde(default)]
    pub has_tasks: bool,

    #[serde(default)]
    pub visibility: VisibilitySettings,
}

impl ViewConfig {
    pub fn new(id: ViewId, edge: Edge) -> Self {
        Self {
            id,
            on_primary: true,
            screen: None,
            edge,
            alignment: Alignment::default(),
            max_length: default_max_length(),
            offset: 0.0,
            normal_thickness: default_normal_thickness(),
            max_thickness: default_max_thickness(),
            behaves_as_panel: false,
            screen_edge_margin: 0,
            inner_shadow: 0,
            has_tasks: false,
            visibility: VisibilitySettings::default(),
        }
    }

    pub fn form_factor(&self) -> FormFactor {
        self.edge.form_factor()
    }

    /// Pin the view to an explicit screen
    pub fn on_screen(mut self, screen: ScreenId) -> Self {
        self.on_primary = false;
        self.screen = Some(screen);
        self
    }

    pub fn with_mode(mut self, mode: VisibilityMode) -> Self {
        self.visibility.mode = mode;
        self
    }
}

/// A dock or panel window placed on a screen edge
#[derive(Debug)]
pub struct View {
    config: ViewConfig,
    geometry: Rect,
    window_id: Option<WindowId>,
    in_edit_mode: bool,
    pub positioner: Positioner,
    pub visibility: VisibilityManager,
}

impl View {
    pub fn new(config: ViewConfig, resync_interval: Duration) -> Self {
        let remembered = if config.on_primary { None } else { config.screen };

        Self {
            positioner: Positioner::new(remembered, resync_interval),
            visibility: VisibilityManager::new(&config.visibility),
            config,
            geometry: Rect::default(),
            window_id: None,
            in_edit_mode: false,
        }
    }

    pub fn id(&self) -> ViewId {
        self.config.id
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn edge(&self) -> Edge {
        self.config.edge
    }

    pub fn on_primary(&self) -> bool {
        self.config.on_primary
    }

    pub fn has_tasks(&self) -> bool {
        self.config.has_tasks
    }

    /// Screen the view is placed on, if any
    pub fn screen(&self) -> Option<ScreenId> {
        self.positioner.current_screen()
    }

    pub fn is_mapped(&self) -> bool {
        self.screen().is_some()
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Rect) {
        self.geometry = geometry;
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.window_id
    }

    /// Record the view's window; returns the previous one
    pub fn set_window_id(&mut self, window: WindowId) -> Option<WindowId> {
        self.window_id.replace(window)
    }

    pub fn in_edit_mode(&self) -> bool {
        self.in_edit_mode
    }

    pub fn set_in_edit_mode(&mut self, editing: bool) -> bool {
        std::mem::replace(&mut self.in_edit_mode, editing) != editing
    }

    pub fn set_edge(&mut self, edge: Edge) {
        self.config.edge = edge;
    }

    pub fn set_on_primary(&mut self, on_primary: bool) {
        self.config.on_primary = on_primary;
    }

    /// Stop following the primary screen and stick to `screen`
    pub fn pin_to_screen(&mut self, screen: ScreenId) {
        self.config.on_primary = false;
        self.config.screen = Some(screen);
        self.positioner.remember_screen(screen);
    }

    /// Explicit screen the view wants, connected or not
    pub fn explicit_screen(&self) -> Option<ScreenId> {
        self.positioner.remembered_screen().or(self.config.screen)
    }

    pub fn occupant(&self) -> Occupant {
        Occupant {
            edge: self.config.edge,
            alignment: self.config.alignment,
            mode: self.visibility.mode(),
            behaves_as_panel: self.config.behaves_as_panel,
            geometry: self.geometry,
            max_length: self.config.max_length,
            offset: self.config.offset,
            normal_thickness: self.config.normal_thickness,
            screen_edge_margin: self.config.screen_edge_margin,
        }
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            id: self.config.id,
            geometry: self.geometry,
            edge: self.config.edge,
            normal_thickness: self.config.normal_thickness,
            behaves_as_panel: self.config.behaves_as_panel,
            screen_edge_margin: self.config.screen_edge_margin,
            in_edit_mode: self.in_edit_mode,
            is_mapped: self.is_mapped(),
        }
    }

    /// Configuration to persist, including runtime changes
    pub fn to_config(&self) -> ViewConfig {
        let mut config = self.config.clone();
        let mode = self.visibility.mode();

        config.visibility = self.visibility.settings();
        if !mode.is_valid() {
            config.visibility.mode = self.config.visibility.mode;
        }
        if !config.on_primary {
            config.screen = self.explicit_screen();
        }
        config
    }
}

/// Views of one layout, in creation order
#[derive(Debug, Default)]
pub struct ViewRegistry {
    items: AHashMap<ViewId, View>,
    order: Vec<ViewId>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view; an existing view with the same id is replaced in place
    pub fn insert(&mut self, view: View) -> Option<View> {
        let id = view.id();
        let previous = self.items.insert(id, view);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    pub fn remove(&mut self, id: ViewId) -> Option<View> {
        let view = self.items.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(view)
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn ids(&self) -> &[ViewId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.items.values_mut()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Views placed on a screen
    pub fn on_screen(&self, screen: ScreenId) -> impl Iterator<Item = &View> {
        self.iter().filter(move |view| view.screen() == Some(screen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resync() -> Duration {
        Duration::from_millis(2000)
    }

    #[test]
    fn test_config_defaults() {
        let config: ViewConfig = serde_json::from_str(r#"{"id": 4, "edge": "left"}"#).unwrap();
        assert!(config.on_primary);
        assert_eq!(config.max_length, 1.0);
        assert_eq!(config.form_factor(), FormFactor::Vertical);
        assert_eq!(config.visibility.mode, VisibilityMode::DodgeActive);
        assert_eq!(config.visibility.timer_hide, 700);
    }

    #[test]
    fn test_registry_keeps_order() {
        let mut views = ViewRegistry::new();
        views.insert(View::new(ViewConfig::new(3, Edge::Bottom), resync()));
        views.insert(View::new(ViewConfig::new(1, Edge::Top), resync()));
        views.insert(View::new(ViewConfig::new(2, Edge::Left), resync()));
        views.remove(1);

        let ids: Vec<ViewId> = views.iter().map(View::id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(views.len(), 2);
        assert!(views.remove(1).is_none());
    }

    #[test]
    fn test_unplaced_view_keeps_explicit_screen() {
        let view = View::new(ViewConfig::new(5, Edge::Top).on_screen(2), resync());
        assert!(!view.is_mapped());
        assert_eq!(view.explicit_screen(), Some(2));
        assert_eq!(view.to_config().screen, Some(2));
        assert_eq!(view.to_config().visibility.mode, VisibilityMode::DodgeActive);
    }
}
