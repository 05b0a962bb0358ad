use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::types::{Edge, MemoryUsage, ScreenId, ViewId, VisibilityMode};

/// Snapshot of the engine state, served to `raven-dock status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockStatus {
    pub backend: CompactString,
    pub memory_usage: MemoryUsage,
    pub activity: Option<CompactString>,
    /// Panels may drop their borders next to maximized windows
    pub can_disable_borders: bool,
    pub loaded_layouts: Vec<CompactString>,
    pub current_layouts: Vec<CompactString>,
    pub screens: Vec<ScreenStatus>,
    pub views: Vec<ViewStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenStatus {
    pub id: ScreenId,
    pub name: CompactString,
    pub geometry: Rect,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStatus {
    pub id: ViewId,
    pub layout: CompactString,
    pub screen: Option<ScreenId>,
    pub edge: Edge,
    pub mode: VisibilityMode,
    pub is_hidden: bool,
    pub geometry: Rect,
    pub struts: Option<Rect>,
}
