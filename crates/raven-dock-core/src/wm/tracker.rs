use ahash::{AHashMap, AHashSet};

use crate::geometry::Rect;
use crate::types::WindowId;

/// A client window as reported by the window system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub geometry: Rect,
    pub is_maximized: bool,
    pub is_minimized: bool,
}

impl WindowInfo {
    pub fn new(id: WindowId, geometry: Rect) -> Self {
        Self {
            id,
            geometry,
            is_maximized: false,
            is_minimized: false,
        }
    }

    pub fn maximized(mut self) -> Self {
        self.is_maximized = true;
        self
    }

    pub fn minimized(mut self) -> Self {
        self.is_minimized = true;
        self
    }
}

/// Window state as seen from one view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerFlags {
    pub active_window_touching: bool,
    pub active_window_maximized: bool,
    pub exists_window_touching: bool,
}

/// Tracks client windows so dodge modes can react to them.
///
/// Windows registered as ignored (the dock's own views and ghost windows)
/// never count, nor do minimized windows.
#[derive(Debug, Default)]
pub struct WindowTracker {
    windows: AHashMap<WindowId, WindowInfo>,
    active: Option<WindowId>,
    ignored: AHashSet<WindowId>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a window
    pub fn update_window(&mut self, info: WindowInfo) {
        self.windows.insert(info.id, info);
    }

    pub fn remove_window(&mut self, id: WindowId) {
        self.windows.remove(&id);
        if self.active == Some(id) {
            self.active = None;
        }
    }

    pub fn set_active_window(&mut self, id: Option<WindowId>) {
        self.active = id;
    }

    pub fn active_window(&self) -> Option<&WindowInfo> {
        self.active
            .and_then(|id| self.windows.get(&id))
            .filter(|info| self.is_tracked(info))
    }

    pub fn register_ignored(&mut self, id: WindowId) {
        self.ignored.insert(id);
    }

    pub fn unregister_ignored(&mut self, id: WindowId) {
        self.ignored.remove(&id);
    }

    pub fn is_ignored(&self, id: WindowId) -> bool {
        self.ignored.contains(&id)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    fn is_tracked(&self, info: &WindowInfo) -> bool {
        !info.is_minimized && !self.ignored.contains(&info.id)
    }

    /// Flags for a view occupying `area` on a screen with `screen_geometry`
    pub fn flags_for(&self, area: Rect, screen_geometry: Rect) -> TrackerFlags {
        let active = self.active_window();

        TrackerFlags {
            active_window_touching: active.is_some_and(|info| info.geometry.intersects(&area)),
            active_window_maximized: active.is_some_and(|info| {
                info.is_maximized && screen_geometry.contains_point(info.geometry.center())
            }),
            exists_window_touching: self
                .windows
                .values()
                .any(|info| self.is_tracked(info) && info.geometry.intersects(&area)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);
    const DOCK_AREA: Rect = Rect::new(0, 1040, 1920, 40);

    #[test]
    fn test_active_window_touching() {
        let mut tracker = WindowTracker::new();
        tracker.update_window(WindowInfo::new(1, Rect::new(100, 500, 800, 560)));
        tracker.update_window(WindowInfo::new(2, Rect::new(100, 100, 400, 300)));

        tracker.set_active_window(Some(2));
        let flags = tracker.flags_for(DOCK_AREA, SCREEN);
        assert!(!flags.active_window_touching);
        assert!(flags.exists_window_touching);

        tracker.set_active_window(Some(1));
        assert!(tracker.flags_for(DOCK_AREA, SCREEN).active_window_touching);
    }

    #[test]
    fn test_maximized_on_other_screen() {
        let mut tracker = WindowTracker::new();
        tracker.update_window(WindowInfo::new(7, Rect::new(1920, 0, 1280, 1024)).maximized());
        tracker.set_active_window(Some(7));

        assert!(!tracker.flags_for(DOCK_AREA, SCREEN).active_window_maximized);
        assert!(tracker
            .flags_for(Rect::new(1920, 984, 1280, 40), Rect::new(1920, 0, 1280, 1024))
            .active_window_maximized);
    }

    #[test]
    fn test_ignored_and_minimized_windows_dont_count() {
        let mut tracker = WindowTracker::new();
        tracker.update_window(WindowInfo::new(1, DOCK_AREA));
        tracker.update_window(WindowInfo::new(2, SCREEN).minimized());
        tracker.register_ignored(1);
        tracker.set_active_window(Some(1));

        assert_eq!(tracker.flags_for(DOCK_AREA, SCREEN), TrackerFlags::default());

        tracker.remove_window(1);
        assert!(tracker.active_window().is_none());
    }
}
