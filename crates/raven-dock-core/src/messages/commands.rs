use compact_str::CompactString;

use crate::geometry::{Point, Rect};
use crate::types::{ScreenId, ViewId, VisibilityMode};
use crate::wm::WmRequest;

/// Commands FROM the coordinator TO the rendering side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockCommand {
    /// Show the view's window on a screen
    MapView {
        view: ViewId,
        screen: ScreenId,
    },

    UnmapView {
        view: ViewId,
    },

    SetGeometry {
        view: ViewId,
        geometry: Rect,
    },

    /// Move the window while sliding, without changing its size
    MoveTo {
        view: ViewId,
        origin: Point,
    },

    SetHidden {
        view: ViewId,
        hidden: bool,
    },

    SetBorders {
        view: ViewId,
        force_top: bool,
        force_bottom: bool,
    },

    /// Slide out and answer with `DockEvent::SlideOutFinished`
    SlideOut {
        view: ViewId,
    },

    SlideIn {
        view: ViewId,
    },

    VisibilityModeChanged {
        view: ViewId,
        mode: VisibilityMode,
    },

    LayoutsChanged {
        current: Vec<CompactString>,
    },

    PrimaryScreenChanged(ScreenId),

    /// Window-system work queued by the backend
    Window(WmRequest),
}

impl DockCommand {
    /// View the command is about, if any
    pub fn view(&self) -> Option<ViewId> {
        match self {
            Self::MapView { view, .. }
            | Self::UnmapView { view }
            | Self::SetGeometry { view, .. }
            | Self::MoveTo { view, .. }
            | Self::SetHidden { view, .. }
            | Self::SetBorders { view, .. }
            | Self::SlideOut { view }
            | Self::SlideIn { view }
            | Self::VisibilityModeChanged { view, .. } => Some(*view),
            Self::LayoutsChanged { .. } | Self::PrimaryScreenChanged(_) | Self::Window(_) => None,
        }
    }
}
