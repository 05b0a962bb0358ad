//! Top-level orchestration.
//!
//! The coordinator owns the screen registry, the layouts (and through them
//! every view) and the window-system backend. Events come in through
//! [`Coordinator::handle_event`], timers are driven by
//! [`Coordinator::poll_timers`], and whatever the rendering side has to do
//! is collected with [`Coordinator::take_commands`].

use ahash::AHashSet;
use compact_str::CompactString;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::available::{AvailableRegionCalculator, Occupant, RegionCriteria};
use crate::config::{ConfigPaths, DockSettings, DEFAULT_LAYOUT_NAME};
use crate::error::Result;
use crate::geometry::{Rect, Region};
use crate::layouts::{JsonLayoutStore, LayoutRegistry};
use crate::messages::{DockCommand, DockEvent, DockStatus, ScreenStatus, ViewStatus};
use crate::positioner::{PendingChange, PositionerSignal};
use crate::screens::ScreenRegistry;
use crate::timer::{earliest, Timer};
use crate::types::{Edge, MemoryUsage, ScreenId, ViewId, VisibilityMode};
use crate::views::View;
use crate::visibility::{VisibilityContext, VisibilityManager, VisibilitySignal};
use crate::wm::{Backend, WindowSystem};

pub struct Coordinator<W: WindowSystem = Backend> {
    settings: DockSettings,
    /// Where settings and the screen pool are saved; `None` keeps them in memory
    paths: Option<ConfigPaths>,
    screens: ScreenRegistry,
    layouts: LayoutRegistry,
    wm: W,
    /// Debounces screen topology changes before views are redistributed
    views_sync_timer: Timer,
    commands: Vec<DockCommand>,
}

impl<W: WindowSystem> Coordinator<W> {
    pub fn new(settings: DockSettings, screens: ScreenRegistry, layouts: LayoutRegistry, wm: W) -> Self {
        Self {
            views_sync_timer: Timer::new(settings.screen_tracker_interval()),
            settings,
            paths: None,
            screens,
            layouts,
            wm,
            commands: Vec::new(),
        }
    }

    /// Load settings, the screen pool and the layouts from disk
    pub fn load(paths: ConfigPaths, wm: W) -> Result<Self> {
        let settings = DockSettings::load(&paths.settings);
        let screens = ScreenRegistry::load(&paths.screens);
        let store = JsonLayoutStore::new(paths.layouts_dir.clone());
        let mut layouts = LayoutRegistry::new(
            Box::new(store),
            settings.memory_usage,
            settings.screen_resync_interval(),
        );

        match settings.memory_usage {
            MemoryUsage::Single => {
                let name = CompactString::from(settings.single_layout());
                layouts.load_or_create(&name)?;
                layouts.switch_to(&name)?;
            }
            MemoryUsage::Multiple => {
                layouts.load_all()?;
                if layouts.iter().next().is_none() {
                    layouts.load_or_create(DEFAULT_LAYOUT_NAME)?;
                }
            }
        }

        let mut coordinator = Self::new(settings, screens, layouts, wm);
        coordinator.paths = Some(paths);
        Ok(coordinator)
    }

    /// Place the views on the screens known so far
    pub fn start(&mut self, now: Instant) {
        info!(
            "Starting with {} screens and layouts {:?}",
            self.screens.connected_count(),
            self.layouts.current_names()
        );
        self.wm.set_root_geometry(self.screens.root_geometry());
        self.sync_views_to_screens(now);
        self.commands.push(DockCommand::LayoutsChanged {
            current: self.layouts.current_names(),
        });
    }

    pub fn settings(&self) -> &DockSettings {
        &self.settings
    }

    pub fn screens(&self) -> &ScreenRegistry {
        &self.screens
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    pub fn wm(&self) -> &W {
        &self.wm
    }

    pub fn wm_mut(&mut self) -> &mut W {
        &mut self.wm
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.layouts.view(id)
    }

    /// Screen a view is placed on
    pub fn screen_for_view(&self, id: ViewId) -> Option<ScreenId> {
        self.layouts.view(id).and_then(View::screen)
    }

    fn view_ids(&self) -> Vec<ViewId> {
        self.layouts
            .iter()
            .flat_map(|l| l.views.ids().iter().copied())
            .collect()
    }

    fn mapped_view_ids(&self) -> Vec<ViewId> {
        self.layouts
            .iter()
            .flat_map(|l| l.views.iter())
            .filter(|v| v.is_mapped())
            .map(View::id)
            .collect()
    }

    // Events

    pub fn handle_event(&mut self, event: DockEvent, now: Instant) {
        if !event.is_window_event() {
            debug!("Handling {:?}", event);
        }

        match event {
            DockEvent::ScreenAdded {
                name,
                geometry,
                available_geometry,
            } => {
                let id = self.screens.connect(&name, geometry, available_geometry);
                info!("Screen {} ({}) added at {}", id, name, geometry);
                self.topology_changed(now);
            }
            DockEvent::ScreenRemoved { name } => {
                if let Some(id) = self.screens.disconnect(&name) {
                    info!("Screen {} ({}) removed", id, name);
                    let stranded: Vec<ViewId> = self
                        .view_ids()
                        .into_iter()
                        .filter(|view| self.screen_for_view(*view) == Some(id))
                        .collect();
                    for view in stranded {
                        self.unmap_view(view, now);
                    }
                    self.topology_changed(now);
                }
            }
            DockEvent::ScreenGeometryChanged {
                name,
                geometry,
                available_geometry,
            } => {
                if let Some(id) = self.screens.set_geometry(&name, geometry, available_geometry) {
                    self.wm.set_root_geometry(self.screens.root_geometry());
                    for view in self.view_ids() {
                        if self.screen_for_view(view) == Some(id) {
                            self.sync_view_geometry(view, now);
                        }
                    }
                }
            }
            DockEvent::PrimaryScreenChanged { name } => {
                if self.screens.set_primary(&name) {
                    if let Some(id) = self.screens.primary_id() {
                        info!("Primary screen is now {} ({})", id, name);
                        self.commands.push(DockCommand::PrimaryScreenChanged(id));
                    }
                    self.topology_changed(now);
                }
            }

            DockEvent::ActivityChanged(activity) => self.activity_changed(&activity, now),
            DockEvent::DesktopChanged => {
                for view in self.mapped_view_ids() {
                    self.with_visibility(view, now, |vm, ctx| vm.desktop_changed(ctx));
                }
            }

            DockEvent::WindowChanged(info) => {
                self.wm.tracker_mut().update_window(info);
                self.refresh_tracker_flags(now);
            }
            DockEvent::WindowRemoved(window) => {
                self.wm.tracker_mut().remove_window(window);
                self.refresh_tracker_flags(now);
            }
            DockEvent::ActiveWindowChanged(window) => {
                self.wm.tracker_mut().set_active_window(window);
                self.refresh_tracker_flags(now);
            }

            DockEvent::ViewWindowCreated { view, window } => {
                let Some(v) = self.layouts.view_mut(view) else {
                    return;
                };
                if let Some(previous) = v.set_window_id(window).filter(|p| *p != window) {
                    self.wm.unregister_ignored_window(previous);
                }
                self.wm.register_ignored_window(window);
                self.refresh_tracker_flags(now);
            }
            DockEvent::ViewGeometryReported { view, geometry } => {
                let on_screen = self
                    .screens
                    .connected()
                    .find(|s| s.geometry.contains_point(geometry.center()))
                    .map(|s| s.id);
                if let Some(v) = self.layouts.view_mut(view) {
                    if let Some(screen) = on_screen.filter(|_| v.is_mapped()) {
                        v.positioner.window_moved_to_screen(screen);
                    }
                    v.positioner.validate_geometry(geometry, now);
                }
            }
            DockEvent::MouseEntered(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.set_contains_mouse(true, ctx));
            }
            DockEvent::MouseLeft(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.set_contains_mouse(false, ctx));
            }
            DockEvent::DragEntered(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.drag_entered(ctx));
            }
            DockEvent::DragLeft(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.drag_left(ctx));
            }
            DockEvent::GhostMouseEntered(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.ghost_contains_mouse_changed(true, ctx));
            }
            DockEvent::GhostMouseLeft(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.ghost_contains_mouse_changed(false, ctx));
            }
            DockEvent::GhostDragEntered(view) => {
                self.with_visibility(view, now, |vm, ctx| vm.ghost_drag_entered(ctx));
            }

            DockEvent::SlideOffsetChanged { view, offset } => self.set_slide_offset(view, offset, now),
            DockEvent::SlideAnimationChanged { view, active } => {
                if let Some(v) = self.layouts.view_mut(view) {
                    v.positioner.set_in_slide_animation(active);
                    if !active {
                        self.sync_view_geometry(view, now);
                    }
                }
            }
            DockEvent::SlideOutFinished(view) => self.slide_out_finished(view, now),
            DockEvent::StickedEdgesChanged { view, top, bottom } => {
                if let Some(v) = self.layouts.view_mut(view) {
                    let top_changed = v.positioner.set_sticked_on_top_edge(top);
                    let bottom_changed = v.positioner.set_sticked_on_bottom_edge(bottom);
                    if top_changed || bottom_changed {
                        self.sync_view_geometry(view, now);
                    }
                }
            }

            DockEvent::SetVisibilityMode { view, mode } => {
                if !mode.is_valid() {
                    warn!("Refusing visibility mode '{}' for view {}", mode.name(), view);
                    return;
                }
                self.with_visibility(view, now, |vm, ctx| vm.set_mode(mode, ctx));
                self.visibility_mode_changed(view, now);
            }
            DockEvent::SetHideTimer { view, ms } => {
                if let Some(v) = self.layouts.view_mut(view) {
                    v.visibility.set_timer_hide(ms);
                }
            }
            DockEvent::ToggleHiddenState { screen, edge } => self.toggle_hidden_state(screen, edge, now),
            DockEvent::SetEditMode { view, editing } => {
                let changed = self
                    .layouts
                    .view_mut(view)
                    .is_some_and(|v| v.set_in_edit_mode(editing));
                if changed {
                    self.with_visibility(view, now, |vm, ctx| vm.in_edit_mode_changed(ctx));
                }
            }
            DockEvent::BlockHiding { view, reason } => {
                self.with_visibility(view, now, |vm, ctx| vm.add_block_hiding_event(&reason, ctx));
            }
            DockEvent::UnblockHiding { view, reason } => {
                self.with_visibility(view, now, |vm, ctx| vm.remove_block_hiding_event(&reason, ctx));
            }

            DockEvent::SwitchLayout(name) => self.switch_layout(&name, now),
            DockEvent::AddView { layout, config } => {
                let id = config.id;
                if self.layouts.add_view(&layout, config) {
                    info!("View {} added to layout '{}'", id, layout);
                    self.sync_views_to_screens(now);
                } else {
                    warn!("Can't add view {} to layout '{}'", id, layout);
                }
            }
            DockEvent::RemoveView(view) => self.remove_view(view, now),
            DockEvent::MoveViewToLayout { view, layout } => {
                if self.layouts.find_view(view).is_some_and(|current| current != layout.as_str()) {
                    self.request_change(view, PendingChange::Layout(layout), now);
                }
            }
            DockEvent::SetViewEdge { view, edge } => self.set_view_edge(view, edge, now),
            DockEvent::SetViewScreen { view, screen } => self.set_view_screen(view, screen, now),

            DockEvent::SyncGeometry => {
                for view in self.view_ids() {
                    self.sync_view_geometry(view, now);
                }
            }
            DockEvent::SettingsReloaded(settings) => self.apply_settings(settings, now),
            DockEvent::SaveAll => {
                if let Err(e) = self.save_all() {
                    warn!("Failed to save: {}", e);
                }
            }
        }
    }

    /// Run the visibility manager of a view with a context built for it
    fn with_visibility<F>(&mut self, id: ViewId, now: Instant, f: F)
    where
        F: FnOnce(&mut VisibilityManager, &mut VisibilityContext),
    {
        let in_current_layout = self.in_current_layout(id);
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };

        let mut ctx = VisibilityContext {
            wm: &mut self.wm,
            view: view.state(),
            in_current_layout,
            now,
        };
        f(&mut view.visibility, &mut ctx);
    }

    fn in_current_layout(&self, id: ViewId) -> bool {
        let Some(layout) = self.layouts.find_view(id) else {
            return false;
        };

        match self.layouts.memory_usage() {
            MemoryUsage::Single => true,
            MemoryUsage::Multiple => {
                let moving = self
                    .layouts
                    .view(id)
                    .is_some_and(|v| v.positioner.in_location_animation());
                self.layouts.is_current(layout) && !moving
            }
        }
    }

    // Screens and placement

    fn topology_changed(&mut self, now: Instant) {
        self.wm.set_root_geometry(self.screens.root_geometry());

        for view in self.view_ids() {
            if let Some(v) = self.layouts.view_mut(view) {
                v.positioner.screen_changed(now);
            }
        }
        self.views_sync_timer.start_at(now);
        self.save_screens();
    }

    /// Bind every view of the loaded layouts to a screen.
    ///
    /// Views with an explicit, connected screen go first, then views that
    /// follow the primary screen. Task managers whose screen is missing
    /// fall back to the primary screen without forgetting their own.
    /// Only one view per screen edge is placed per layout; the rest are
    /// unmapped.
    pub fn sync_views_to_screens(&mut self, now: Instant) {
        let primary = self.screens.primary_id();
        let mut placements: Vec<(ViewId, ScreenId, bool)> = Vec::new();
        let mut unplaced: Vec<ViewId> = Vec::new();

        for layout in self.layouts.iter() {
            let mut taken: AHashSet<(ScreenId, Edge)> = AHashSet::new();
            let mut placed: AHashSet<ViewId> = AHashSet::new();

            for view in layout.views.iter().filter(|v| !v.on_primary()) {
                let screen = view.explicit_screen().filter(|s| self.screens.is_connected(*s));
                if let Some(screen) = screen {
                    if taken.insert((screen, view.edge())) {
                        placements.push((view.id(), screen, true));
                        placed.insert(view.id());
                    }
                }
            }

            if let Some(primary) = primary {
                for view in layout.views.iter().filter(|v| v.on_primary()) {
                    if taken.insert((primary, view.edge())) {
                        placements.push((view.id(), primary, false));
                        placed.insert(view.id());
                    }
                }

                let fallbacks: Vec<&View> = layout
                    .views
                    .iter()
                    .filter(|v| !v.on_primary() && v.has_tasks() && !placed.contains(&v.id()))
                    .collect();
                for view in fallbacks {
                    if taken.insert((primary, view.edge())) {
                        debug!("View {} falls back to the primary screen", view.id());
                        placements.push((view.id(), primary, false));
                        placed.insert(view.id());
                    }
                }
            }

            unplaced.extend(layout.views.iter().map(View::id).filter(|id| !placed.contains(id)));
        }

        for view in unplaced {
            self.unmap_view(view, now);
        }
        for (view, screen, remember) in placements {
            self.map_view(view, screen, remember, now);
        }
    }

    fn map_view(&mut self, id: ViewId, screen: ScreenId, remember: bool, now: Instant) {
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };

        let was_mapped = view.is_mapped();
        let moved = view.positioner.set_screen_to_follow(screen, remember);
        if was_mapped && !moved {
            return;
        }

        let configured = view.config().visibility.mode;
        self.sync_view_geometry(id, now);
        if was_mapped {
            return;
        }

        info!("View {} mapped on screen {}", id, screen);
        let mode = if configured.is_valid() {
            configured
        } else {
            warn!("View {} has no usable visibility mode, using the default", id);
            VisibilityMode::default()
        };
        self.with_visibility(id, now, |vm, ctx| {
            if vm.mode().is_valid() {
                vm.restore(ctx);
            } else {
                vm.set_mode(mode, ctx);
            }
        });
        self.update_view_tracker_flags(id, now);

        // The first sync ran before the view had a mode and did not occupy space
        self.visibility_mode_changed(id, now);
    }

    /// Horizontal views only take space from vertical ones in some modes
    fn visibility_mode_changed(&mut self, id: ViewId, now: Instant) {
        let Some(view) = self.layouts.view(id) else {
            return;
        };
        if view.edge().is_vertical() {
            return;
        }
        if let Some(screen) = view.screen() {
            self.free_region_changed(screen, now);
        }
    }

    fn unmap_view(&mut self, id: ViewId, now: Instant) {
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };
        if !view.is_mapped() {
            return;
        }

        let screen = view.screen();
        let horizontal = !view.edge().is_vertical();
        view.visibility.release(id, &mut self.wm);
        view.positioner.unset_screen();
        self.commands.push(DockCommand::UnmapView { view: id });
        info!("View {} unmapped", id);

        if let Some(screen) = screen.filter(|_| horizontal) {
            self.free_region_changed(screen, now);
        }
    }

    /// Edges of a screen no view occupies, in `layout` or the current layouts
    pub fn free_edges(&self, screen: ScreenId, layout: Option<&str>) -> Vec<Edge> {
        let used: Vec<Edge> = self.views_on_screen(screen, layout).map(View::edge).collect();
        Edge::ALL.into_iter().filter(|edge| !used.contains(edge)).collect()
    }

    fn views_on_screen<'a>(&'a self, screen: ScreenId, layout: Option<&'a str>) -> impl Iterator<Item = &'a View> + 'a {
        self.layouts
            .iter()
            .filter(move |l| match layout {
                Some(name) => l.name() == name,
                None => self.layouts.is_current(l.name()),
            })
            .flat_map(move |l| l.views.on_screen(screen))
    }

    fn occupants(&self, screen: ScreenId, layout: Option<&str>) -> Vec<Occupant> {
        self.views_on_screen(screen, layout).map(View::occupant).collect()
    }

    /// Free rect of a screen, for `layout` or all current layouts
    pub fn available_screen_rect(&self, screen: ScreenId, layout: Option<&str>, criteria: &RegionCriteria) -> Rect {
        let Some(info) = self.screens.screen(screen) else {
            return Rect::default();
        };
        let occupants = self.occupants(screen, layout);
        AvailableRegionCalculator::new(&info).rect(occupants.iter(), criteria)
    }

    /// Free region of a screen, for `layout` or all current layouts
    pub fn available_screen_region(&self, screen: ScreenId, layout: Option<&str>, criteria: &RegionCriteria) -> Region {
        let Some(info) = self.screens.screen(screen) else {
            return Region::new();
        };
        let occupants = self.occupants(screen, layout);
        AvailableRegionCalculator::new(&info).region(occupants.iter(), criteria)
    }

    /// Recompute the geometry of one view and republish what depends on it
    pub fn sync_view_geometry(&mut self, id: ViewId, now: Instant) {
        let Some(view) = self.layouts.view(id) else {
            return;
        };
        if !view.positioner.can_sync() {
            return;
        }
        let Some(screen) = view.positioner.screen_to_follow().and_then(|s| self.screens.screen(s)) else {
            debug!("View {} follows a screen that is gone", id);
            return;
        };

        let config = view.config().clone();
        let region = if config.edge.is_vertical() {
            let criteria = view.positioner.free_region_criteria();
            let layout = self.layouts.find_view(id);
            Some(self.available_screen_region(screen.id, layout, &criteria))
        } else {
            None
        };

        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };
        let Some(geometry) = view.positioner.sync_geometry(&config, &screen, region.as_ref(), now) else {
            return;
        };
        if geometry == view.geometry() {
            return;
        }

        view.set_geometry(geometry);
        self.with_visibility(id, now, |vm, ctx| vm.refresh_struts(ctx, false));
        self.update_view_tracker_flags(id, now);

        if !config.edge.is_vertical() {
            self.free_region_changed(screen.id, now);
        }
    }

    /// Vertical views fit around the horizontal ones of their screen
    fn free_region_changed(&mut self, screen: ScreenId, now: Instant) {
        let vertical: Vec<ViewId> = self
            .layouts
            .iter()
            .flat_map(|l| l.views.on_screen(screen))
            .filter(|v| v.edge().is_vertical())
            .map(View::id)
            .collect();

        for view in vertical {
            self.sync_view_geometry(view, now);
        }
    }

    // Window tracking

    fn update_view_tracker_flags(&mut self, id: ViewId, now: Instant) {
        let Some(view) = self.layouts.view(id) else {
            return;
        };
        let Some(screen) = view.screen().and_then(|s| self.screens.geometry_for(s)) else {
            return;
        };

        let flags = self.wm.tracker().flags_for(view.geometry(), screen);
        self.with_visibility(id, now, |vm, ctx| vm.set_tracker_flags(flags, ctx));
    }

    fn refresh_tracker_flags(&mut self, now: Instant) {
        for view in self.view_ids() {
            self.update_view_tracker_flags(view, now);
        }
    }

    // Visibility

    fn toggle_hidden_state(&mut self, screen: ScreenId, edge: Edge, now: Instant) {
        let target = self
            .views_on_screen(screen, None)
            .find(|v| v.edge() == edge)
            .map(View::id);

        match target {
            Some(view) => self.with_visibility(view, now, |vm, ctx| vm.toggle_hidden_state(ctx)),
            None => debug!("No view on the {} edge of screen {}", edge.name(), screen),
        }
    }

    fn activity_changed(&mut self, activity: &str, now: Instant) {
        if !self.layouts.set_current_activity(activity) {
            return;
        }

        info!("Activity changed to {}", activity);
        for view in self.mapped_view_ids() {
            self.with_visibility(view, now, |vm, ctx| vm.activity_changed(ctx));
        }
        self.commands.push(DockCommand::LayoutsChanged {
            current: self.layouts.current_names(),
        });
    }

    /// Struts and ghost edges after the set of current layouts changed
    fn current_layouts_changed(&mut self, now: Instant) {
        for view in self.view_ids() {
            self.with_visibility(view, now, |vm, ctx| {
                vm.refresh_struts(ctx, false);
                vm.update_ghost_window_state(ctx);
            });
        }
    }

    // Sliding and location changes

    fn set_slide_offset(&mut self, id: ViewId, offset: i32, now: Instant) {
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };
        let Some(screen) = view.screen().and_then(|s| self.screens.geometry_for(s)) else {
            return;
        };

        let edge = view.edge();
        if let Some(origin) = view.positioner.set_slide_offset(offset, edge, screen) {
            self.commands.push(DockCommand::MoveTo { view: id, origin });
        }
        if offset == 0 {
            self.sync_view_geometry(id, now);
        }
    }

    fn set_view_edge(&mut self, id: ViewId, edge: Edge, now: Instant) {
        let Some(view) = self.layouts.view(id) else {
            return;
        };
        if view.edge() == edge {
            return;
        }

        if let Some(screen) = view.screen() {
            let layout = self.layouts.find_view(id);
            if !self.free_edges(screen, layout).contains(&edge) {
                warn!("The {} edge of screen {} is taken", edge.name(), screen);
                return;
            }
        }
        self.request_change(id, PendingChange::Edge(edge), now);
    }

    fn set_view_screen(&mut self, id: ViewId, screen: Option<ScreenId>, now: Instant) {
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };

        let Some(screen) = screen else {
            if !view.on_primary() {
                view.set_on_primary(true);
                self.sync_views_to_screens(now);
            }
            return;
        };

        if !view.on_primary() && view.screen() == Some(screen) {
            return;
        }
        if !self.screens.is_connected(screen) {
            warn!("Screen {} is not connected", screen);
            return;
        }

        let edge = view.edge();
        let layout = self.layouts.find_view(id);
        if !self.free_edges(screen, layout).contains(&edge) {
            warn!("The {} edge of screen {} is taken", edge.name(), screen);
            return;
        }
        self.request_change(id, PendingChange::Screen(screen), now);
    }

    /// Mapped views slide out first; the change is applied on the ack
    fn request_change(&mut self, id: ViewId, change: PendingChange, now: Instant) {
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };

        if !view.is_mapped() {
            self.apply_change(id, change, now);
        } else if !view.positioner.hide_for_change(change) {
            warn!("View {} is busy with another location change", id);
        }
    }

    fn slide_out_finished(&mut self, id: ViewId, now: Instant) {
        let Some(view) = self.layouts.view_mut(id) else {
            return;
        };
        let Some(change) = view.positioner.slide_out_finished() else {
            debug!("View {} finished sliding without a pending change", id);
            return;
        };

        view.positioner.reset_slide();
        self.apply_change(id, change, now);

        if let Some(view) = self.layouts.view_mut(id) {
            view.positioner.change_applied();
        }
        self.with_visibility(id, now, |vm, ctx| {
            vm.refresh_struts(ctx, false);
            vm.update_ghost_window_state(ctx);
        });
    }

    fn apply_change(&mut self, id: ViewId, change: PendingChange, now: Instant) {
        match change {
            PendingChange::Edge(edge) => {
                if let Some(view) = self.layouts.view_mut(id) {
                    info!("View {} moves to the {} edge", id, edge.name());
                    view.set_edge(edge);
                }
            }
            PendingChange::Screen(screen) => {
                if let Some(view) = self.layouts.view_mut(id) {
                    info!("View {} moves to screen {}", id, screen);
                    view.pin_to_screen(screen);
                }
            }
            PendingChange::Layout(name) => match self.layouts.move_view(id, &name) {
                Ok(true) => {
                    let single = self.layouts.memory_usage() == MemoryUsage::Single;
                    if single && !self.layouts.is_current(&name) {
                        self.unmap_view(id, now);
                        if let Err(e) = self.layouts.unload(&name) {
                            warn!("Failed to unload layout '{}': {}", name, e);
                        }
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to move view {} to layout '{}': {}", id, name, e),
            },
        }

        self.sync_views_to_screens(now);
        self.sync_view_geometry(id, now);
    }

    // Layouts and views

    pub fn switch_layout(&mut self, name: &str, now: Instant) {
        let unloaded = match self.layouts.switch_to(name) {
            Ok(unloaded) => unloaded,
            Err(e) => {
                warn!("Failed to switch to layout '{}': {}", name, e);
                return;
            }
        };

        for mut layout in unloaded {
            for id in layout.views.ids().to_vec() {
                let Some(view) = layout.views.get_mut(id) else {
                    continue;
                };
                if view.is_mapped() {
                    view.visibility.release(id, &mut self.wm);
                    self.commands.push(DockCommand::UnmapView { view: id });
                }
                if let Some(window) = view.window_id() {
                    self.wm.unregister_ignored_window(window);
                }
            }
        }

        match self.layouts.memory_usage() {
            MemoryUsage::Single => self.settings.set_single_layout(name),
            MemoryUsage::Multiple => {
                if let Some(activity) = self.layouts.current_activity() {
                    self.settings.activity_layouts.insert(activity.into(), name.into());
                }
            }
        }
        self.save_settings();

        self.commands.push(DockCommand::LayoutsChanged {
            current: self.layouts.current_names(),
        });
        self.current_layouts_changed(now);
        self.sync_views_to_screens(now);
    }

    fn remove_view(&mut self, id: ViewId, now: Instant) {
        self.unmap_view(id, now);

        let Some(view) = self.layouts.remove_view(id) else {
            return;
        };
        if let Some(window) = view.window_id() {
            self.wm.unregister_ignored_window(window);
        }
        info!("View {} removed", id);
        self.sync_views_to_screens(now);
    }

    // Settings and persistence

    fn apply_settings(&mut self, settings: DockSettings, now: Instant) {
        if settings.screen_tracker_interval() != self.settings.screen_tracker_interval() {
            self.views_sync_timer.set_interval(settings.screen_tracker_interval());
            self.layouts.set_resync_interval(settings.screen_resync_interval());
        }

        if settings.memory_usage != self.layouts.memory_usage() {
            warn!("Memory usage {:?} takes effect after a restart", settings.memory_usage);
        }

        let switch_to = (self.layouts.memory_usage() == MemoryUsage::Single
            && settings.single_layout() != self.settings.single_layout())
        .then(|| CompactString::from(settings.single_layout()));

        self.settings = settings;
        if let Some(name) = switch_to {
            self.switch_layout(&name, now);
        }
    }

    pub fn save_all(&mut self) -> Result<()> {
        self.layouts.save_all()?;
        if let Some(paths) = &self.paths {
            self.settings.save_to(&paths.settings)?;
            self.screens.save(&paths.screens)?;
        }
        Ok(())
    }

    fn save_settings(&self) {
        if let Some(paths) = &self.paths {
            if let Err(e) = self.settings.save_to(&paths.settings) {
                warn!("Failed to save settings: {}", e);
            }
        }
    }

    fn save_screens(&self) {
        if let Some(paths) = &self.paths {
            if let Err(e) = self.screens.save(&paths.screens) {
                warn!("Failed to save screen pool: {}", e);
            }
        }
    }

    // Timers

    pub fn next_deadline(&self) -> Option<Instant> {
        self.layouts
            .iter()
            .flat_map(|l| l.views.iter())
            .fold(self.views_sync_timer.deadline(), |deadline, view| {
                earliest(
                    deadline,
                    earliest(view.positioner.next_deadline(), view.visibility.next_deadline()),
                )
            })
    }

    pub fn poll_timers(&mut self, now: Instant) {
        if self.views_sync_timer.fire_if_due(now) {
            debug!("Screens settled, syncing views");
            self.sync_views_to_screens(now);
        }

        for id in self.view_ids() {
            let Some(view) = self.layouts.view_mut(id) else {
                continue;
            };

            let wake = view.positioner.poll_timers(now);
            if wake.reconsider_screen {
                let on_primary = view.on_primary();
                view.positioner.reconsider_screen(on_primary, &self.screens);
            }
            if wake.needs_sync() {
                self.sync_view_geometry(id, now);
            }

            self.with_visibility(id, now, |vm, ctx| vm.poll_timers(ctx));
        }
    }

    // Output

    /// Drain everything the rendering side has to carry out
    pub fn take_commands(&mut self) -> Vec<DockCommand> {
        let mut commands = std::mem::take(&mut self.commands);

        for id in self.view_ids() {
            let Some(view) = self.layouts.view_mut(id) else {
                continue;
            };

            for signal in view.positioner.take_signals() {
                let command = match signal {
                    PositionerSignal::GeometryChanged(geometry) => DockCommand::SetGeometry { view: id, geometry },
                    PositionerSignal::BordersChanged {
                        force_top,
                        force_bottom,
                    } => DockCommand::SetBorders {
                        view: id,
                        force_top,
                        force_bottom,
                    },
                    PositionerSignal::ScreenChanged(Some(screen)) => DockCommand::MapView { view: id, screen },
                    PositionerSignal::HideForSlideOut => DockCommand::SlideOut { view: id },
                    PositionerSignal::ShowAfterChange => DockCommand::SlideIn { view: id },
                    PositionerSignal::ScreenChanged(None) | PositionerSignal::InLocationAnimationChanged(_) => {
                        continue
                    }
                };
                commands.push(command);
            }

            for signal in view.visibility.take_signals() {
                let command = match signal {
                    VisibilitySignal::IsHiddenChanged(hidden) => DockCommand::SetHidden { view: id, hidden },
                    VisibilitySignal::ModeChanged(mode) => DockCommand::VisibilityModeChanged { view: id, mode },
                    VisibilitySignal::IsBelowLayerChanged(_)
                    | VisibilitySignal::ContainsMouseChanged(_)
                    | VisibilitySignal::HidingBlockedChanged(_)
                    | VisibilitySignal::StrutsChanged(_)
                    | VisibilitySignal::SupportsKWinEdgesChanged(_) => continue,
                };
                commands.push(command);
            }
        }

        commands.extend(self.wm.take_requests().into_iter().map(DockCommand::Window));
        commands
    }

    /// Snapshot for status queries
    pub fn status(&self) -> DockStatus {
        DockStatus {
            backend: self.wm.name().into(),
            memory_usage: self.layouts.memory_usage(),
            activity: self.layouts.current_activity().map(CompactString::from),
            can_disable_borders: self.settings.can_disable_borders(),
            loaded_layouts: self.layouts.names(),
            current_layouts: self.layouts.current_names(),
            screens: self
                .screens
                .connected()
                .map(|s| ScreenStatus {
                    id: s.id,
                    name: s.name,
                    geometry: s.geometry,
                    is_primary: s.is_primary,
                })
                .collect(),
            views: self
                .layouts
                .iter()
                .flat_map(|l| {
                    l.views.iter().map(move |v| ViewStatus {
                        id: v.id(),
                        layout: l.name().into(),
                        screen: v.screen(),
                        edge: v.edge(),
                        mode: v.visibility.mode(),
                        is_hidden: v.visibility.is_hidden(),
                        geometry: v.geometry(),
                        struts: v.visibility.published_struts(),
                    })
                })
                .collect(),
        }
    }
}
