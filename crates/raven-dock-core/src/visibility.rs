//! Show/hide state machine of a single view.
//!
//! The manager never owns the view: every call gets a [`VisibilityContext`]
//! with the window system and a copy of the view state it needs. Changes
//! are queued as [`VisibilitySignal`]s for the coordinator to forward.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::geometry::Rect;
use crate::timer::{earliest, Timer};
use crate::types::{Edge, ViewId, VisibilityMode, WindowId};
use crate::wm::{TrackerFlags, WindowSystem};

/// Lower intervals keep an edge-activated view from ever showing
pub const HIDE_MINIMUM_INTERVAL: u64 = 50;

const DEFAULT_TIMER_SHOW: u64 = 0;
const DEFAULT_TIMER_HIDE: u64 = 700;
/// Time a sidebar gives its window to settle after edit mode ends
const SIDEBAR_TOGGLE_DELAY: u64 = 100;

/// Block reason used by [`VisibilityManager::toggle_hidden_state`]
pub const TOGGLE_BLOCK: &str = "toggle-hidden-state";

fn default_timer_hide() -> u64 {
    DEFAULT_TIMER_HIDE
}

fn default_true() -> bool {
    true
}

/// Persisted visibility settings of a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySettings {
    #[serde(default)]
    pub mode: VisibilityMode,

    #[serde(default)]
    pub timer_show: u64,

    #[serde(default = "default_timer_hide")]
    pub timer_hide: u64,

    #[serde(default)]
    pub raise_on_desktop_change: bool,

    #[serde(default)]
    pub raise_on_activity_change: bool,

    #[serde(default = "default_true")]
    pub enable_kwin_edges: bool,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            mode: VisibilityMode::default(),
            timer_show: DEFAULT_TIMER_SHOW,
            timer_hide: DEFAULT_TIMER_HIDE,
            raise_on_desktop_change: false,
            raise_on_activity_change: false,
            enable_kwin_edges: true,
        }
    }
}

/// View state the visibility manager reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub id: ViewId,
    /// Current window geometry
    pub geometry: Rect,
    pub edge: Edge,
    pub normal_thickness: i32,
    pub behaves_as_panel: bool,
    pub screen_edge_margin: i32,
    pub in_edit_mode: bool,
    /// The view has a screen and a containment
    pub is_mapped: bool,
}

pub struct VisibilityContext<'a> {
    pub wm: &'a mut dyn WindowSystem,
    pub view: ViewState,
    /// Single-layout mode, or the view's layout is current and not mid-move
    pub in_current_layout: bool,
    pub now: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilitySignal {
    ModeChanged(VisibilityMode),
    IsHiddenChanged(bool),
    IsBelowLayerChanged(bool),
    ContainsMouseChanged(bool),
    HidingBlockedChanged(bool),
    StrutsChanged(Option<Rect>),
    SupportsKWinEdgesChanged(bool),
}

#[derive(Debug)]
pub struct VisibilityManager {
    mode: VisibilityMode,
    is_hidden: bool,
    is_below_layer: bool,
    contains_mouse: bool,
    drag_enter: bool,
    hide_now: bool,
    raise_temporarily: bool,
    block_hiding: SmallVec<[CompactString; 2]>,
    published_struts: Option<Rect>,

    timer_show: Timer,
    timer_hide: Timer,
    timer_raise_temporarily: Timer,
    timer_sidebar_toggle: Timer,

    tracker: TrackerFlags,
    ghost_window: Option<WindowId>,
    ghost_contains_mouse: bool,

    raise_on_desktop_change: bool,
    raise_on_activity_change: bool,
    enable_kwin_edges: bool,

    signals: Vec<VisibilitySignal>,
}

impl VisibilityManager {
    /// New manager in the `None` mode; the owner sets the stored mode once
    /// the view is placed.
    pub fn new(settings: &VisibilitySettings) -> Self {
        Self {
            mode: VisibilityMode::None,
            is_hidden: false,
            is_below_layer: false,
            contains_mouse: false,
            drag_enter: false,
            hide_now: false,
            raise_temporarily: false,
            block_hiding: SmallVec::new(),
            published_struts: None,
            timer_show: Timer::from_millis(settings.timer_show),
            timer_hide: Timer::from_millis(settings.timer_hide.max(HIDE_MINIMUM_INTERVAL)),
            timer_raise_temporarily: Timer::from_millis(0),
            timer_sidebar_toggle: Timer::from_millis(SIDEBAR_TOGGLE_DELAY),
            tracker: TrackerFlags::default(),
            ghost_window: None,
            ghost_contains_mouse: false,
            raise_on_desktop_change: settings.raise_on_desktop_change,
            raise_on_activity_change: settings.raise_on_activity_change,
            enable_kwin_edges: settings.enable_kwin_edges,
            signals: Vec::new(),
        }
    }

    pub fn mode(&self) -> VisibilityMode {
        self.mode
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn is_below_layer(&self) -> bool {
        self.is_below_layer
    }

    pub fn contains_mouse(&self) -> bool {
        self.contains_mouse
    }

    pub fn hiding_is_blocked(&self) -> bool {
        !self.block_hiding.is_empty()
    }

    pub fn blocked_by(&self) -> impl Iterator<Item = &str> {
        self.block_hiding.iter().map(|reason| reason.as_str())
    }

    pub fn published_struts(&self) -> Option<Rect> {
        self.published_struts
    }

    pub fn supports_kwin_edges(&self) -> bool {
        self.ghost_window.is_some()
    }

    pub fn ghost_window(&self) -> Option<WindowId> {
        self.ghost_window
    }

    pub fn is_show_pending(&self) -> bool {
        self.timer_show.is_active()
    }

    pub fn is_hide_pending(&self) -> bool {
        self.timer_hide.is_active()
    }

    pub fn timer_show(&self) -> Duration {
        self.timer_show.interval()
    }

    pub fn timer_hide(&self) -> Duration {
        self.timer_hide.interval()
    }

    pub fn set_timer_show(&mut self, ms: u64) {
        self.timer_show.set_interval(Duration::from_millis(ms));
    }

    pub fn set_timer_hide(&mut self, ms: u64) {
        self.timer_hide
            .set_interval(Duration::from_millis(ms.max(HIDE_MINIMUM_INTERVAL)));
    }

    pub fn set_raise_on_desktop(&mut self, enable: bool) {
        self.raise_on_desktop_change = enable;
    }

    pub fn set_raise_on_activity(&mut self, enable: bool) {
        self.raise_on_activity_change = enable;
    }

    /// Settings as they should be persisted
    pub fn settings(&self) -> VisibilitySettings {
        VisibilitySettings {
            mode: self.mode,
            timer_show: self.timer_show.interval().as_millis() as u64,
            timer_hide: self.timer_hide.interval().as_millis() as u64,
            raise_on_desktop_change: self.raise_on_desktop_change,
            raise_on_activity_change: self.raise_on_activity_change,
            enable_kwin_edges: self.enable_kwin_edges,
        }
    }

    pub fn take_signals(&mut self) -> Vec<VisibilitySignal> {
        std::mem::take(&mut self.signals)
    }

    /// Switch visibility mode.
    ///
    /// # Panics
    ///
    /// `None` and `NormalWindow` are not modes a view can be in.
    pub fn set_mode(&mut self, mode: VisibilityMode, ctx: &mut VisibilityContext) {
        assert!(
            mode.is_valid(),
            "visibility mode '{}' can't be set on view {}",
            mode.name(),
            ctx.view.id
        );

        if self.mode == mode {
            return;
        }

        debug!("View {} visibility {} -> {}", ctx.view.id, self.mode.name(), mode.name());

        let previous = self.mode;
        self.published_struts = None;

        if previous == VisibilityMode::AlwaysVisible {
            ctx.wm.remove_view_struts(ctx.view.id);
            self.signals.push(VisibilitySignal::StrutsChanged(None));
        }

        self.timer_show.stop();
        self.timer_hide.stop();
        self.timer_sidebar_toggle.stop();
        self.mode = mode;

        self.init_view_flags(ctx);

        match mode {
            VisibilityMode::AlwaysVisible => {
                if ctx.view.is_mapped {
                    self.refresh_struts(ctx, false);
                }
                self.raise_view(true, ctx);
            }
            VisibilityMode::AutoHide | VisibilityMode::WindowsCanCover => {
                self.raise_view(self.contains_mouse, ctx);
            }
            VisibilityMode::DodgeActive
            | VisibilityMode::DodgeMaximized
            | VisibilityMode::DodgeAllWindows => self.dodge(ctx),
            VisibilityMode::SideBar => self.toggle_hidden_state(ctx),
            _ => {}
        }

        self.update_kwin_edges_support(ctx);
        self.signals.push(VisibilitySignal::ModeChanged(mode));
    }

    /// Edit mode keeps covered views on the front layer
    pub fn in_edit_mode_changed(&mut self, ctx: &mut VisibilityContext) {
        self.init_view_flags(ctx);

        if self.mode != VisibilityMode::SideBar {
            return;
        }
        if ctx.view.in_edit_mode {
            self.timer_sidebar_toggle.stop();
        } else {
            self.timer_sidebar_toggle.start_at(ctx.now);
        }
    }

    fn init_view_flags(&mut self, ctx: &mut VisibilityContext) {
        let covered = matches!(
            self.mode,
            VisibilityMode::WindowsCanCover | VisibilityMode::WindowsAlwaysCover
        );

        if covered && !ctx.view.in_edit_mode {
            self.set_view_on_back_layer(ctx);
        } else {
            self.set_view_on_front_layer(ctx);
        }
    }

    fn set_view_on_back_layer(&mut self, ctx: &mut VisibilityContext) {
        ctx.wm.set_view_layer(ctx.view.id, false);
        self.set_is_below_layer(true, ctx);
    }

    fn set_view_on_front_layer(&mut self, ctx: &mut VisibilityContext) {
        ctx.wm.set_view_layer(ctx.view.id, true);
        self.set_is_below_layer(false, ctx);
    }

    fn set_is_below_layer(&mut self, below: bool, ctx: &mut VisibilityContext) {
        if self.is_below_layer == below {
            return;
        }

        self.is_below_layer = below;
        self.update_ghost_window_state(ctx);
        self.signals.push(VisibilitySignal::IsBelowLayerChanged(below));
    }

    fn set_is_hidden(&mut self, hidden: bool, ctx: &mut VisibilityContext) {
        if self.is_hidden == hidden {
            return;
        }

        if hidden && self.hiding_is_blocked() {
            warn!("View {}: hiding is blocked, ignoring update", ctx.view.id);
            return;
        }

        self.is_hidden = hidden;
        self.update_ghost_window_state(ctx);
        self.signals.push(VisibilitySignal::IsHiddenChanged(hidden));
    }

    fn must_be_shown(&mut self, ctx: &mut VisibilityContext) {
        if self.mode == VisibilityMode::WindowsCanCover {
            self.set_view_on_front_layer(ctx);
        } else {
            self.set_is_hidden(false, ctx);
        }
    }

    fn must_be_hidden(&mut self, ctx: &mut VisibilityContext) {
        if self.mode == VisibilityMode::WindowsCanCover {
            self.set_view_on_back_layer(ctx);
        } else {
            self.set_is_hidden(true, ctx);
        }
    }

    // Struts

    /// Strut area for the current window geometry
    pub fn acceptable_struts(view: &ViewState) -> Rect {
        let margin = if view.behaves_as_panel {
            view.screen_edge_margin
        } else {
            0
        };
        let shown = view.normal_thickness + margin;
        let g = view.geometry;

        match view.edge {
            Edge::Top => Rect::new(g.x, g.y, g.width, shown),
            Edge::Bottom => Rect::new(g.x, g.bottom() - shown, g.width, shown),
            Edge::Left => Rect::new(g.x, g.y, shown, g.height),
            Edge::Right => Rect::new(g.right() - shown, g.y, shown, g.height),
        }
    }

    /// Publish or withdraw struts of an always-visible view.
    ///
    /// `force` republishes unchanged struts, for events after which the
    /// window manager may have dropped them.
    pub fn refresh_struts(&mut self, ctx: &mut VisibilityContext, force: bool) {
        if self.mode != VisibilityMode::AlwaysVisible {
            return;
        }

        if ctx.in_current_layout && ctx.view.is_mapped {
            let computed = Self::acceptable_struts(&ctx.view);

            if self.published_struts != Some(computed) || force {
                self.published_struts = Some(computed);
                ctx.wm.set_view_struts(ctx.view.id, computed, ctx.view.edge);
                self.signals.push(VisibilitySignal::StrutsChanged(Some(computed)));
            }
        } else if self.published_struts.take().is_some() || force {
            ctx.wm.remove_view_struts(ctx.view.id);
            self.signals.push(VisibilitySignal::StrutsChanged(None));
        }
    }

    // Raising and hiding

    fn raise_view(&mut self, raise: bool, ctx: &mut VisibilityContext) {
        if self.hiding_is_blocked() || self.mode == VisibilityMode::SideBar {
            return;
        }

        if raise {
            self.timer_hide.stop();

            if !self.timer_show.is_active() {
                self.timer_show.start_at(ctx.now);
            }
        } else if !self.drag_enter {
            self.timer_show.stop();

            if self.hide_now {
                self.hide_now = false;
                self.must_be_hidden(ctx);
            } else if !self.timer_hide.is_active() {
                self.timer_hide.start_at(ctx.now);
            }
        }
    }

    fn raise_view_temporarily(&mut self, ctx: &mut VisibilityContext) {
        if self.raise_temporarily {
            return;
        }

        self.raise_temporarily = true;
        self.timer_hide.stop();
        self.timer_show.stop();

        if self.is_hidden {
            self.must_be_shown(ctx);
        }

        let hide = self.timer_hide.interval().as_millis() as u64;
        self.timer_raise_temporarily.set_interval(Duration::from_millis((2 * hide).clamp(1800, 3000)));
        self.timer_raise_temporarily.start_at(ctx.now);
    }

    /// Re-evaluate shown/hidden for the current mode
    pub fn update_hidden_state(&mut self, ctx: &mut VisibilityContext) {
        if self.drag_enter {
            return;
        }

        match self.mode {
            VisibilityMode::AutoHide | VisibilityMode::WindowsCanCover => {
                self.raise_view(self.contains_mouse, ctx);
            }
            VisibilityMode::DodgeActive
            | VisibilityMode::DodgeMaximized
            | VisibilityMode::DodgeAllWindows => self.dodge(ctx),
            _ => {}
        }
    }

    fn dodge(&mut self, ctx: &mut VisibilityContext) {
        if self.raise_temporarily {
            return;
        }

        // Never report "not raised" while the mouse is inside
        if self.contains_mouse {
            self.raise_view(true, ctx);
            return;
        }

        let dodging = match self.mode {
            VisibilityMode::DodgeActive => self.tracker.active_window_touching,
            VisibilityMode::DodgeMaximized => self.tracker.active_window_maximized,
            VisibilityMode::DodgeAllWindows => {
                self.tracker.active_window_touching || self.tracker.exists_window_touching
            }
            _ => return,
        };

        self.raise_view(!dodging, ctx);
    }

    // Inputs

    pub fn set_contains_mouse(&mut self, contains: bool, ctx: &mut VisibilityContext) {
        if !contains {
            self.drag_enter = false;
        }

        if self.contains_mouse == contains {
            return;
        }

        self.contains_mouse = contains;
        self.signals.push(VisibilitySignal::ContainsMouseChanged(contains));

        match self.mode {
            VisibilityMode::AutoHide => self.raise_view(contains, ctx),
            VisibilityMode::DodgeActive
            | VisibilityMode::DodgeMaximized
            | VisibilityMode::DodgeAllWindows => self.dodge(ctx),
            VisibilityMode::WindowsCanCover => {
                if contains {
                    self.must_be_shown(ctx);
                } else {
                    self.raise_view(false, ctx);
                }
            }
            _ => {}
        }
    }

    /// New window tracker state for the view's screen
    pub fn set_tracker_flags(&mut self, flags: TrackerFlags, ctx: &mut VisibilityContext) {
        let previous = std::mem::replace(&mut self.tracker, flags);

        let changed = match self.mode {
            VisibilityMode::DodgeActive => {
                previous.active_window_touching != flags.active_window_touching
            }
            VisibilityMode::DodgeMaximized => {
                previous.active_window_maximized != flags.active_window_maximized
            }
            VisibilityMode::DodgeAllWindows => {
                previous.active_window_touching != flags.active_window_touching
                    || previous.exists_window_touching != flags.exists_window_touching
            }
            _ => false,
        };

        if changed {
            self.dodge(ctx);
        }
    }

    pub fn drag_entered(&mut self, ctx: &mut VisibilityContext) {
        self.drag_enter = true;

        if self.is_hidden && self.mode != VisibilityMode::SideBar {
            self.must_be_shown(ctx);
        }
    }

    /// Drag left the view or was dropped on it
    pub fn drag_left(&mut self, ctx: &mut VisibilityContext) {
        self.drag_enter = false;
        self.update_hidden_state(ctx);
    }

    pub fn desktop_changed(&mut self, ctx: &mut VisibilityContext) {
        if self.reacts_to_workspace_changes() && self.raise_on_desktop_change {
            self.raise_view_temporarily(ctx);
        }
    }

    pub fn activity_changed(&mut self, ctx: &mut VisibilityContext) {
        if self.reacts_to_workspace_changes() {
            if self.raise_on_activity_change {
                self.raise_view_temporarily(ctx);
            } else {
                self.update_hidden_state(ctx);
            }
        }

        if let Some(ghost) = self.ghost_window {
            let active = ctx.in_current_layout && self.is_hidden;
            ctx.wm.set_active_edge(ghost, active);
        }

        self.refresh_struts(ctx, true);
    }

    fn reacts_to_workspace_changes(&self) -> bool {
        !matches!(
            self.mode,
            VisibilityMode::AlwaysVisible | VisibilityMode::WindowsGoBelow
        )
    }

    // Hiding blocks

    pub fn add_block_hiding_event(&mut self, reason: &str, ctx: &mut VisibilityContext) {
        if reason.is_empty() || self.block_hiding.iter().any(|r| r == reason) {
            return;
        }

        let was_blocked = self.hiding_is_blocked();
        self.block_hiding.push(reason.into());

        if !was_blocked {
            self.hiding_is_blocked_changed(ctx);
        }
    }

    pub fn remove_block_hiding_event(&mut self, reason: &str, ctx: &mut VisibilityContext) {
        let Some(index) = self.block_hiding.iter().position(|r| r == reason) else {
            return;
        };

        self.block_hiding.remove(index);

        if !self.hiding_is_blocked() {
            self.hiding_is_blocked_changed(ctx);
        }
    }

    fn hiding_is_blocked_changed(&mut self, ctx: &mut VisibilityContext) {
        let blocked = self.hiding_is_blocked();
        self.signals.push(VisibilitySignal::HidingBlockedChanged(blocked));

        if blocked {
            self.timer_hide.stop();

            if self.is_hidden {
                self.must_be_shown(ctx);
            }
        } else {
            self.update_hidden_state(ctx);
        }
    }

    /// Sidebars flip between shown and hidden; other modes toggle a block
    pub fn toggle_hidden_state(&mut self, ctx: &mut VisibilityContext) {
        if ctx.view.in_edit_mode {
            return;
        }

        if self.mode == VisibilityMode::SideBar {
            self.remove_block_hiding_event(TOGGLE_BLOCK, ctx);

            if self.is_hidden {
                self.must_be_shown(ctx);
            } else {
                self.must_be_hidden(ctx);
            }
        } else if self.block_hiding.iter().any(|r| r == TOGGLE_BLOCK) {
            self.remove_block_hiding_event(TOGGLE_BLOCK, ctx);
        } else {
            self.add_block_hiding_event(TOGGLE_BLOCK, ctx);
        }
    }

    // Screen edge ghost window

    pub fn set_enable_kwin_edges(&mut self, enable: bool, ctx: &mut VisibilityContext) {
        if self.enable_kwin_edges == enable {
            return;
        }

        self.enable_kwin_edges = enable;
        self.update_kwin_edges_support(ctx);
    }

    /// Create or drop the ghost window the current mode needs
    pub fn update_kwin_edges_support(&mut self, ctx: &mut VisibilityContext) {
        let wanted = match self.mode {
            VisibilityMode::AutoHide
            | VisibilityMode::DodgeActive
            | VisibilityMode::DodgeMaximized
            | VisibilityMode::DodgeAllWindows => {
                self.enable_kwin_edges || ctx.view.behaves_as_panel
            }
            VisibilityMode::WindowsCanCover => true,
            _ => false,
        };

        match (wanted, self.ghost_window) {
            (true, None) => {
                self.ghost_window = Some(ctx.wm.create_ghost_window(ctx.view.id));
                self.signals.push(VisibilitySignal::SupportsKWinEdgesChanged(true));
                self.update_ghost_window_state(ctx);
            }
            (false, Some(ghost)) => {
                ctx.wm.destroy_ghost_window(ghost);
                self.ghost_window = None;
                self.ghost_contains_mouse = false;
                self.signals.push(VisibilitySignal::SupportsKWinEdgesChanged(false));
            }
            _ => {}
        }
    }

    pub fn update_ghost_window_state(&mut self, ctx: &mut VisibilityContext) {
        let Some(ghost) = self.ghost_window else {
            return;
        };

        let active = if !ctx.in_current_layout {
            false
        } else if self.mode == VisibilityMode::WindowsCanCover {
            self.is_below_layer && !self.contains_mouse
        } else {
            self.is_hidden && !(self.contains_mouse || self.ghost_contains_mouse)
        };

        ctx.wm.set_active_edge(ghost, active);
    }

    pub fn ghost_contains_mouse_changed(&mut self, contains: bool, ctx: &mut VisibilityContext) {
        if self.ghost_window.is_none() {
            return;
        }

        self.ghost_contains_mouse = contains;

        if contains {
            self.raise_view(true, ctx);
        } else {
            self.timer_show.stop();
            self.update_ghost_window_state(ctx);
        }
    }

    pub fn ghost_drag_entered(&mut self, ctx: &mut VisibilityContext) {
        if self.is_hidden {
            self.must_be_shown(ctx);
        }
    }

    // Timers

    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.timer_hide.deadline(),
            self.timer_raise_temporarily.deadline(),
            self.timer_sidebar_toggle.deadline(),
        ]
        .into_iter()
        .fold(self.timer_show.deadline(), earliest)
    }

    /// Run expired timers
    pub fn poll_timers(&mut self, ctx: &mut VisibilityContext) {
        let now = ctx.now;

        if self.timer_show.fire_if_due(now) && (self.is_hidden || self.is_below_layer) {
            self.must_be_shown(ctx);
        }

        if self.timer_hide.fire_if_due(now)
            && !self.hiding_is_blocked()
            && !self.is_hidden
            && !self.is_below_layer
            && !self.drag_enter
        {
            self.must_be_hidden(ctx);
        }

        if self.timer_raise_temporarily.fire_if_due(now) {
            self.raise_temporarily = false;
            self.hide_now = true;
            self.update_hidden_state(ctx);
        }

        if self.timer_sidebar_toggle.fire_if_due(now) && self.mode == VisibilityMode::SideBar {
            self.toggle_hidden_state(ctx);
        }
    }

    /// Publish the current mode again after the view was mapped back
    pub fn restore(&mut self, ctx: &mut VisibilityContext) {
        self.init_view_flags(ctx);
        self.refresh_struts(ctx, true);
        self.update_kwin_edges_support(ctx);
        self.update_hidden_state(ctx);
    }

    /// Withdraw everything published for the view (unmapped or destroyed)
    pub fn release(&mut self, view: ViewId, wm: &mut dyn WindowSystem) {
        self.timer_show.stop();
        self.timer_hide.stop();
        self.timer_raise_temporarily.stop();
        self.timer_sidebar_toggle.stop();
        self.raise_temporarily = false;

        if self.published_struts.take().is_some() {
            self.signals.push(VisibilitySignal::StrutsChanged(None));
        }
        wm.remove_view_struts(view);

        if let Some(ghost) = self.ghost_window.take() {
            wm.destroy_ghost_window(ghost);
            self.ghost_contains_mouse = false;
            self.signals.push(VisibilitySignal::SupportsKWinEdgesChanged(false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::{WindowTracker, WmRequest};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        SetStruts(Rect),
        RemoveStruts,
        Layer(bool),
        ActiveEdge(bool),
        CreateGhost,
        DestroyGhost,
    }

    #[derive(Default)]
    struct RecordingWm {
        calls: Vec<Call>,
        tracker: WindowTracker,
    }

    impl WindowSystem for RecordingWm {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn set_view_struts(&mut self, _view: ViewId, rect: Rect, _edge: Edge) {
            self.calls.push(Call::SetStruts(rect));
        }
        fn remove_view_struts(&mut self, _view: ViewId) {
            self.calls.push(Call::RemoveStruts);
        }
        fn set_active_edge(&mut self, _ghost: WindowId, active: bool) {
            self.calls.push(Call::ActiveEdge(active));
        }
        fn register_ignored_window(&mut self, _id: WindowId) {}
        fn unregister_ignored_window(&mut self, _id: WindowId) {}
        fn set_view_layer(&mut self, _view: ViewId, front: bool) {
            self.calls.push(Call::Layer(front));
        }
        fn create_ghost_window(&mut self, _view: ViewId) -> WindowId {
            self.calls.push(Call::CreateGhost);
            900
        }
        fn destroy_ghost_window(&mut self, _ghost: WindowId) {
            self.calls.push(Call::DestroyGhost);
        }
        fn tracker(&self) -> &WindowTracker {
            &self.tracker
        }
        fn tracker_mut(&mut self) -> &mut WindowTracker {
            &mut self.tracker
        }
        fn take_requests(&mut self) -> Vec<WmRequest> {
            Vec::new()
        }
    }

    fn view_state() -> ViewState {
        ViewState {
            id: 1,
            geometry: Rect::new(0, 1016, 1920, 64),
            edge: Edge::Bottom,
            normal_thickness: 40,
            behaves_as_panel: false,
            screen_edge_margin: 0,
            in_edit_mode: false,
            is_mapped: true,
        }
    }

    fn ctx(wm: &mut RecordingWm, now: Instant) -> VisibilityContext<'_> {
        VisibilityContext {
            wm,
            view: view_state(),
            in_current_layout: true,
            now,
        }
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_auto_hide_hides_after_timer() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AutoHide, &mut ctx(&mut wm, now));
        assert!(vm.is_hide_pending());

        vm.poll_timers(&mut ctx(&mut wm, now + ms(699)));
        assert!(!vm.is_hidden());

        vm.poll_timers(&mut ctx(&mut wm, now + ms(700)));
        assert!(vm.is_hidden());
    }

    #[test]
    fn test_mouse_enter_cancels_pending_hide() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AutoHide, &mut ctx(&mut wm, now));
        vm.set_contains_mouse(true, &mut ctx(&mut wm, now + ms(300)));

        assert!(!vm.is_hide_pending());
        assert!(vm.is_show_pending());

        // Long after the original hide deadline, with no leave in between
        vm.poll_timers(&mut ctx(&mut wm, now + ms(5000)));
        assert!(!vm.is_hidden());
        assert!(!vm.is_hide_pending());
    }

    #[test]
    fn test_leaving_always_visible_removes_struts_once() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AlwaysVisible, &mut ctx(&mut wm, now));
        assert_eq!(vm.published_struts(), Some(Rect::new(0, 1040, 1920, 40)));
        wm.calls.clear();

        vm.set_mode(VisibilityMode::DodgeActive, &mut ctx(&mut wm, now));

        let removals = wm.calls.iter().filter(|c| **c == Call::RemoveStruts).count();
        assert_eq!(removals, 1);
        assert_eq!(wm.calls[0], Call::RemoveStruts);
        assert!(vm.published_struts().is_none());
    }

    #[test]
    fn test_struts_withdrawn_outside_current_layout() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AlwaysVisible, &mut ctx(&mut wm, now));
        vm.refresh_struts(&mut ctx(&mut wm, now), false);
        assert_eq!(wm.calls.iter().filter(|c| matches!(c, Call::SetStruts(_))).count(), 1);

        let mut other = ctx(&mut wm, now);
        other.in_current_layout = false;
        vm.refresh_struts(&mut other, false);

        assert_eq!(wm.calls.last(), Some(&Call::RemoveStruts));
        assert!(vm.published_struts().is_none());
    }

    #[test]
    #[should_panic]
    fn test_none_mode_is_rejected() {
        let mut wm = RecordingWm::default();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());
        vm.set_mode(VisibilityMode::None, &mut ctx(&mut wm, Instant::now()));
    }

    #[test]
    fn test_block_keeps_view_shown() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AutoHide, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(700)));
        assert!(vm.is_hidden());

        vm.add_block_hiding_event("menu", &mut ctx(&mut wm, now + ms(800)));
        assert!(!vm.is_hidden());
        assert!(vm.hiding_is_blocked());

        // Unblocking re-evaluates right away and schedules the hide
        vm.remove_block_hiding_event("menu", &mut ctx(&mut wm, now + ms(900)));
        assert!(vm.is_hide_pending());
        vm.poll_timers(&mut ctx(&mut wm, now + ms(1600)));
        assert!(vm.is_hidden());
    }

    #[test]
    fn test_dodge_active_follows_tracker() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::DodgeActive, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now));
        assert!(!vm.is_hidden());

        let touching = TrackerFlags {
            active_window_touching: true,
            ..Default::default()
        };
        vm.set_tracker_flags(touching, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(700)));
        assert!(vm.is_hidden());

        // Mouse inside wins over the tracker
        vm.set_contains_mouse(true, &mut ctx(&mut wm, now + ms(800)));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(800)));
        assert!(!vm.is_hidden());
    }

    #[test]
    fn test_dodge_maximized_ignores_touching() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::DodgeMaximized, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now));

        let touching = TrackerFlags {
            active_window_touching: true,
            exists_window_touching: true,
            ..Default::default()
        };
        vm.set_tracker_flags(touching, &mut ctx(&mut wm, now));
        assert!(!vm.is_hide_pending());
    }

    #[test]
    fn test_sidebar_toggles_only_explicitly() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::SideBar, &mut ctx(&mut wm, now));
        assert!(vm.is_hidden());

        vm.set_contains_mouse(true, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(5000)));
        assert!(vm.is_hidden());

        vm.toggle_hidden_state(&mut ctx(&mut wm, now));
        assert!(!vm.is_hidden());
    }

    #[test]
    fn test_sidebar_toggles_after_leaving_edit_mode() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());
        vm.set_mode(VisibilityMode::SideBar, &mut ctx(&mut wm, now));
        assert!(vm.is_hidden());

        vm.in_edit_mode_changed(&mut ctx(&mut wm, now));
        assert!(vm.is_hidden());
        assert_eq!(vm.next_deadline(), Some(now + ms(100)));

        vm.poll_timers(&mut ctx(&mut wm, now + ms(99)));
        assert!(vm.is_hidden());
        vm.poll_timers(&mut ctx(&mut wm, now + ms(100)));
        assert!(!vm.is_hidden());
        assert_eq!(vm.next_deadline(), None);
    }

    #[test]
    fn test_toggle_blocks_other_modes() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AutoHide, &mut ctx(&mut wm, now));
        vm.toggle_hidden_state(&mut ctx(&mut wm, now));
        assert_eq!(vm.blocked_by().collect::<Vec<_>>(), vec![TOGGLE_BLOCK]);

        vm.toggle_hidden_state(&mut ctx(&mut wm, now));
        assert!(!vm.hiding_is_blocked());
    }

    #[test]
    fn test_windows_can_cover_uses_layers() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::WindowsCanCover, &mut ctx(&mut wm, now));
        assert!(vm.is_below_layer());
        assert!(vm.supports_kwin_edges());
        assert_eq!(wm.calls.last(), Some(&Call::ActiveEdge(true)));

        vm.set_contains_mouse(true, &mut ctx(&mut wm, now));
        assert!(!vm.is_below_layer());

        vm.set_contains_mouse(false, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(700)));
        assert!(vm.is_below_layer());
        assert!(!vm.is_hidden());
    }

    #[test]
    fn test_hide_timer_floor() {
        let settings = VisibilitySettings {
            timer_hide: 10,
            ..Default::default()
        };
        let mut vm = VisibilityManager::new(&settings);
        assert_eq!(vm.timer_hide(), ms(HIDE_MINIMUM_INTERVAL));

        vm.set_timer_hide(20);
        assert_eq!(vm.timer_hide(), ms(50));
    }

    #[test]
    fn test_raise_on_desktop_change() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let settings = VisibilitySettings {
            raise_on_desktop_change: true,
            ..Default::default()
        };
        let mut vm = VisibilityManager::new(&settings);

        vm.set_mode(VisibilityMode::AutoHide, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(700)));
        assert!(vm.is_hidden());

        vm.desktop_changed(&mut ctx(&mut wm, now + ms(1000)));
        assert!(!vm.is_hidden());

        // clamp(2 * 700, 1800, 3000) later the view hides right away
        vm.poll_timers(&mut ctx(&mut wm, now + ms(2799)));
        assert!(!vm.is_hidden());
        vm.poll_timers(&mut ctx(&mut wm, now + ms(2800)));
        assert!(vm.is_hidden());
    }

    #[test]
    fn test_drag_keeps_view_shown() {
        let mut wm = RecordingWm::default();
        let now = Instant::now();
        let mut vm = VisibilityManager::new(&VisibilitySettings::default());

        vm.set_mode(VisibilityMode::AutoHide, &mut ctx(&mut wm, now));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(700)));
        vm.drag_entered(&mut ctx(&mut wm, now + ms(800)));
        assert!(!vm.is_hidden());

        vm.drag_left(&mut ctx(&mut wm, now + ms(900)));
        vm.poll_timers(&mut ctx(&mut wm, now + ms(1600)));
        assert!(vm.is_hidden());
    }
}
