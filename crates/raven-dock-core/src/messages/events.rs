use compact_str::CompactString;

use crate::config::DockSettings;
use crate::geometry::Rect;
use crate::types::{Edge, ScreenId, ViewId, VisibilityMode, WindowId};
use crate::views::ViewConfig;
use crate::wm::WindowInfo;

/// Events INTO the coordinator, from the window system, the rendering
/// side and the control socket
#[derive(Debug, Clone, PartialEq)]
pub enum DockEvent {
    // =========== Screens ===========

    ScreenAdded {
        name: CompactString,
        geometry: Rect,
        available_geometry: Rect,
    },

    ScreenRemoved {
        name: CompactString,
    },

    ScreenGeometryChanged {
        name: CompactString,
        geometry: Rect,
        available_geometry: Rect,
    },

    PrimaryScreenChanged {
        name: CompactString,
    },

    // =========== Workspace ===========

    ActivityChanged(CompactString),

    /// Virtual desktop changed
    DesktopChanged,

    // =========== Client windows ===========

    /// A window appeared or changed geometry/state
    WindowChanged(WindowInfo),

    WindowRemoved(WindowId),

    ActiveWindowChanged(Option<WindowId>),

    // =========== View windows ===========

    /// The rendering side created the window of a view
    ViewWindowCreated {
        view: ViewId,
        window: WindowId,
    },

    /// Geometry the window system actually gave a view
    ViewGeometryReported {
        view: ViewId,
        geometry: Rect,
    },

    MouseEntered(ViewId),
    MouseLeft(ViewId),
    DragEntered(ViewId),
    DragLeft(ViewId),

    /// Mouse reached the ghost edge window of a hidden view
    GhostMouseEntered(ViewId),
    GhostMouseLeft(ViewId),
    GhostDragEntered(ViewId),

    // =========== Sliding ===========

    SlideOffsetChanged {
        view: ViewId,
        offset: i32,
    },

    SlideAnimationChanged {
        view: ViewId,
        active: bool,
    },

    /// Acknowledges a `DockCommand::SlideOut`
    SlideOutFinished(ViewId),

    /// A vertical view joins a top/bottom view instead of avoiding it
    StickedEdgesChanged {
        view: ViewId,
        top: bool,
        bottom: bool,
    },

    // =========== Visibility ===========

    SetVisibilityMode {
        view: ViewId,
        mode: VisibilityMode,
    },

    SetHideTimer {
        view: ViewId,
        ms: u64,
    },

    /// Toggle the view on a screen edge of the current layout
    ToggleHiddenState {
        screen: ScreenId,
        edge: Edge,
    },

    SetEditMode {
        view: ViewId,
        editing: bool,
    },

    BlockHiding {
        view: ViewId,
        reason: CompactString,
    },

    UnblockHiding {
        view: ViewId,
        reason: CompactString,
    },

    // =========== Layouts and views ===========

    SwitchLayout(CompactString),

    AddView {
        layout: CompactString,
        config: ViewConfig,
    },

    RemoveView(ViewId),

    MoveViewToLayout {
        view: ViewId,
        layout: CompactString,
    },

    SetViewEdge {
        view: ViewId,
        edge: Edge,
    },

    /// `None` makes the view follow the primary screen
    SetViewScreen {
        view: ViewId,
        screen: Option<ScreenId>,
    },

    // =========== Control ===========

    /// Recompute the geometry of every view
    SyncGeometry,

    SettingsReloaded(DockSettings),

    SaveAll,
}

impl DockEvent {
    /// Events that only change window tracking state
    pub fn is_window_event(&self) -> bool {
        matches!(
            self,
            Self::WindowChanged(_) | Self::WindowRemoved(_) | Self::ActiveWindowChanged(_)
        )
    }
}
