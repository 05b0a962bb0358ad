//! Per-view placement: which screen a view follows and where exactly its
//! window goes on that screen.

use compact_str::CompactString;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::available::RegionCriteria;
use crate::geometry::{Point, Rect, Region, Size};
use crate::screens::{Screen, ScreenRegistry};
use crate::timer::{earliest, Timer};
use crate::types::{Alignment, Edge, FormFactor, ScreenId, VisibilityMode};
use crate::views::ViewConfig;

/// Delay before a geometry reported by the window system is corrected
pub const VALIDATE_GEOMETRY_INTERVAL: u64 = 500;

/// Change applied while the view is slid out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    Edge(Edge),
    Screen(ScreenId),
    Layout(CompactString),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionerSignal {
    GeometryChanged(Rect),
    BordersChanged { force_top: bool, force_bottom: bool },
    ScreenChanged(Option<ScreenId>),
    /// The view should slide out and call `slide_out_finished` when done
    HideForSlideOut,
    ShowAfterChange,
    InLocationAnimationChanged(bool),
}

/// Timers that expired during a poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionerWake {
    pub reconsider_screen: bool,
    pub validate_geometry: bool,
}

impl PositionerWake {
    pub fn needs_sync(&self) -> bool {
        self.reconsider_screen || self.validate_geometry
    }
}

#[derive(Debug)]
pub struct Positioner {
    /// Explicit screen id as persisted; kept while that screen is gone
    remembered_screen: Option<ScreenId>,
    screen_to_follow: Option<ScreenId>,
    /// Screen the window actually is on
    current_screen: Option<ScreenId>,

    valid_geometry: Rect,
    slide_offset: i32,
    in_slide_animation: bool,

    sticked_top: bool,
    sticked_bottom: bool,
    force_top_border: bool,
    force_bottom_border: bool,

    screen_sync_timer: Timer,
    validate_geometry_timer: Timer,

    pending_change: Option<PendingChange>,
    in_location_animation: bool,

    signals: Vec<PositionerSignal>,
}

impl Positioner {
    pub fn new(remembered_screen: Option<ScreenId>, resync_interval: Duration) -> Self {
        Self {
            remembered_screen,
            screen_to_follow: None,
            current_screen: None,
            valid_geometry: Rect::default(),
            slide_offset: 0,
            in_slide_animation: false,
            sticked_top: false,
            sticked_bottom: false,
            force_top_border: false,
            force_bottom_border: false,
            screen_sync_timer: Timer::new(resync_interval),
            validate_geometry_timer: Timer::from_millis(VALIDATE_GEOMETRY_INTERVAL),
            pending_change: None,
            in_location_animation: false,
            signals: Vec::new(),
        }
    }

    pub fn remembered_screen(&self) -> Option<ScreenId> {
        self.remembered_screen
    }

    pub fn screen_to_follow(&self) -> Option<ScreenId> {
        self.screen_to_follow
    }

    pub fn current_screen(&self) -> Option<ScreenId> {
        self.current_screen
    }

    pub fn valid_geometry(&self) -> Rect {
        self.valid_geometry
    }

    pub fn slide_offset(&self) -> i32 {
        self.slide_offset
    }

    pub fn force_top_border(&self) -> bool {
        self.force_top_border
    }

    pub fn force_bottom_border(&self) -> bool {
        self.force_bottom_border
    }

    pub fn in_location_animation(&self) -> bool {
        self.in_location_animation
    }

    pub fn is_resync_pending(&self) -> bool {
        self.screen_sync_timer.is_active()
    }

    pub fn set_resync_interval(&mut self, interval: Duration) {
        self.screen_sync_timer.set_interval(interval);
    }

    pub fn take_signals(&mut self) -> Vec<PositionerSignal> {
        std::mem::take(&mut self.signals)
    }

    // Screen binding

    /// Follow `screen`; with `update_screen_id` it also becomes the
    /// remembered explicit screen. Returns false when nothing changed.
    pub fn set_screen_to_follow(&mut self, screen: ScreenId, update_screen_id: bool) -> bool {
        if update_screen_id {
            self.remembered_screen = Some(screen);
        }

        if self.screen_to_follow == Some(screen) && self.current_screen == Some(screen) {
            return false;
        }

        debug!("Following screen {}", screen);
        self.screen_to_follow = Some(screen);
        self.current_screen = Some(screen);
        self.signals.push(PositionerSignal::ScreenChanged(Some(screen)));
        true
    }

    /// Remember an explicit screen without moving there
    pub fn remember_screen(&mut self, screen: ScreenId) {
        self.remembered_screen = Some(screen);
    }

    /// Forget the screen binding; the view is no longer placed
    pub fn unset_screen(&mut self) {
        self.screen_sync_timer.stop();
        self.validate_geometry_timer.stop();

        if self.current_screen.take().is_some() | self.screen_to_follow.take().is_some() {
            self.signals.push(PositionerSignal::ScreenChanged(None));
        }
    }

    /// The window system placed the window on `screen`
    pub fn window_moved_to_screen(&mut self, screen: ScreenId) {
        self.current_screen = Some(screen);
    }

    /// Screens were added, removed or reordered
    pub fn screen_changed(&mut self, now: Instant) {
        if self.current_screen.is_some() {
            self.screen_sync_timer.start_at(now);
        }
    }

    /// Move back to where the view belongs after screen changes.
    /// Returns true when the followed screen changed.
    pub fn reconsider_screen(&mut self, on_primary: bool, screens: &ScreenRegistry) -> bool {
        if self.current_screen.is_none() {
            return false;
        }

        let target = if on_primary {
            screens.primary_id()
        } else {
            self.remembered_screen.filter(|id| screens.is_connected(*id))
        };
        // Without a better place, at least bring the window back to the followed screen
        let target = target.or(self.screen_to_follow);

        match target {
            Some(screen) if self.screen_to_follow != Some(screen) || self.current_screen != Some(screen) => {
                debug!("Reconsidered screen, moving to {}", screen);
                self.set_screen_to_follow(screen, false)
            }
            _ => false,
        }
    }

    /// Start a bounded resync when the window and the followed screen disagree
    fn check_screen_consistency(&mut self, now: Instant) -> bool {
        if self.current_screen == self.screen_to_follow {
            return true;
        }

        warn!(
            "View is on screen {:?} but follows {:?}, resyncing",
            self.current_screen, self.screen_to_follow
        );
        if !self.screen_sync_timer.is_active() {
            self.screen_sync_timer.start_at(now);
        }
        false
    }

    // Geometry

    /// Whether a geometry sync would do anything right now
    pub fn can_sync(&self) -> bool {
        self.current_screen.is_some()
            && self.slide_offset == 0
            && !self.in_slide_animation
            && !self.screen_sync_timer.is_active()
    }

    /// Criteria for the free region a vertical view is fitted into
    pub fn free_region_criteria(&self) -> RegionCriteria {
        let mut criteria = RegionCriteria::new()
            .ignoring_modes(&[VisibilityMode::AutoHide, VisibilityMode::SideBar])
            .ignoring_edges(&[Edge::Left, Edge::Right]);

        if self.sticked_top {
            criteria.ignore_edges.push(Edge::Top);
        }
        if self.sticked_bottom {
            criteria.ignore_edges.push(Edge::Bottom);
        }
        criteria
    }

    /// Recompute and store the view geometry on `screen`.
    ///
    /// Vertical views need `free_region`, the screen's free region under
    /// [`Self::free_region_criteria`]. Returns `None` when syncing is
    /// currently not possible.
    pub fn sync_geometry(
        &mut self,
        config: &ViewConfig,
        screen: &Screen,
        free_region: Option<&Region>,
        now: Instant,
    ) -> Option<Rect> {
        if !self.can_sync() || !self.check_screen_consistency(now) {
            return None;
        }
        if self.screen_to_follow != Some(screen.id) {
            debug!("Skipping sync for screen {} the view doesn't follow", screen.id);
            return None;
        }

        let geometry = self.compute_geometry(config, screen, free_region);
        if geometry != self.valid_geometry {
            self.valid_geometry = geometry;
            self.signals.push(PositionerSignal::GeometryChanged(geometry));
        }
        Some(geometry)
    }

    /// Geometry a view with `config` gets on `screen`
    pub fn compute_geometry(&mut self, config: &ViewConfig, screen: &Screen, free_region: Option<&Region>) -> Rect {
        let available = match config.form_factor() {
            FormFactor::Horizontal => {
                self.set_borders(false, false);
                screen.geometry
            }
            FormFactor::Vertical => {
                let owned;
                let region = match free_region {
                    Some(region) => region,
                    None => {
                        owned = Region::from(screen.available_geometry);
                        &owned
                    }
                };
                let maximum = maximum_normal_geometry(config.edge, screen.geometry, config.normal_thickness);
                let rect = largest_area_rect(&region.intersected_rect(maximum)).unwrap_or(maximum);

                self.validate_top_bottom_borders(rect, region, screen.geometry, config.screen_edge_margin);
                rect
            }
        };

        let size = window_size(config, available, screen.geometry);
        let origin = window_position(config, available, size);
        Rect::from_point_size(origin, size)
    }

    /// Vertical views draw a top or bottom border when they stop short of
    /// the screen edge and the strip next to them on that side is free
    fn validate_top_bottom_borders(&mut self, rect: Rect, region: &Region, screen: Rect, margin: i32) {
        let strip_width = margin.max(1);
        let above = Rect::new(screen.left(), rect.top() - 1, strip_width, 1);
        let below = Rect::new(screen.left(), rect.bottom(), strip_width, 1);

        let force_top = rect.top() > screen.top() && region.contains_rect(above);
        let force_bottom = rect.bottom() < screen.bottom() && region.contains_rect(below);
        self.set_borders(force_top, force_bottom);
    }

    fn set_borders(&mut self, force_top: bool, force_bottom: bool) {
        if self.force_top_border == force_top && self.force_bottom_border == force_bottom {
            return;
        }
        self.force_top_border = force_top;
        self.force_bottom_border = force_bottom;
        self.signals.push(PositionerSignal::BordersChanged { force_top, force_bottom });
    }

    /// Returns true when the flag changed; the caller resyncs
    pub fn set_sticked_on_top_edge(&mut self, sticked: bool) -> bool {
        std::mem::replace(&mut self.sticked_top, sticked) != sticked
    }

    pub fn set_sticked_on_bottom_edge(&mut self, sticked: bool) -> bool {
        std::mem::replace(&mut self.sticked_bottom, sticked) != sticked
    }

    /// The window system reported a geometry for the view's window
    pub fn validate_geometry(&mut self, reported: Rect, now: Instant) {
        if self.slide_offset == 0 && !self.in_slide_animation && reported != self.valid_geometry {
            debug!("Window geometry {} differs from {}", reported, self.valid_geometry);
            self.validate_geometry_timer.start_at(now);
        }
    }

    // Sliding

    pub fn set_in_slide_animation(&mut self, active: bool) {
        self.in_slide_animation = active;
    }

    /// Back at the resting place, e.g. after a slide-out was acknowledged
    pub fn reset_slide(&mut self) {
        self.slide_offset = 0;
        self.in_slide_animation = false;
    }

    /// Slide the window `offset` pixels off its place towards `edge`.
    /// Returns the new window origin.
    pub fn set_slide_offset(&mut self, offset: i32, edge: Edge, screen_geometry: Rect) -> Option<Point> {
        self.slide_offset = offset;

        let valid = self.valid_geometry;
        if valid.is_empty() {
            return None;
        }

        let distance = offset.abs();
        let origin = match edge {
            Edge::Top => Point::new(valid.x, (screen_geometry.top() - valid.height - 1).max(valid.y - distance)),
            Edge::Bottom => Point::new(valid.x, (screen_geometry.bottom() - 1).min(valid.y + distance)),
            Edge::Left => Point::new((screen_geometry.left() - valid.width - 1).max(valid.x - distance), valid.y),
            Edge::Right => Point::new((screen_geometry.right() - 1).min(valid.x + distance), valid.y),
        };
        Some(origin)
    }

    /// Slide out before applying `change`; false while another change
    /// is still in progress
    pub fn hide_for_change(&mut self, change: PendingChange) -> bool {
        if self.in_location_animation {
            debug!("Ignoring {:?}, a location change is in progress", change);
            return false;
        }

        self.pending_change = Some(change);
        self.in_location_animation = true;
        self.signals.push(PositionerSignal::InLocationAnimationChanged(true));
        self.signals.push(PositionerSignal::HideForSlideOut);
        true
    }

    /// The view finished sliding out; the returned change is applied by
    /// the caller, which then calls [`Self::change_applied`]
    pub fn slide_out_finished(&mut self) -> Option<PendingChange> {
        self.pending_change.take()
    }

    pub fn change_applied(&mut self) {
        if !self.in_location_animation {
            return;
        }
        self.in_location_animation = false;
        self.signals.push(PositionerSignal::ShowAfterChange);
        self.signals.push(PositionerSignal::InLocationAnimationChanged(false));
    }

    // Timers

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.screen_sync_timer.deadline(), self.validate_geometry_timer.deadline())
    }

    pub fn poll_timers(&mut self, now: Instant) -> PositionerWake {
        PositionerWake {
            reconsider_screen: self.screen_sync_timer.fire_if_due(now),
            validate_geometry: self.validate_geometry_timer.fire_if_due(now),
        }
    }
}

/// Largest strip along a vertical edge a view could use
pub fn maximum_normal_geometry(edge: Edge, screen: Rect, normal_thickness: i32) -> Rect {
    match edge {
        Edge::Left => Rect::new(screen.left(), screen.top(), normal_thickness, screen.height),
        Edge::Right => Rect::new(screen.right() - normal_thickness, screen.top(), normal_thickness, screen.height),
        Edge::Top => Rect::new(screen.left(), screen.top(), screen.width, normal_thickness),
        Edge::Bottom => Rect::new(screen.left(), screen.bottom() - normal_thickness, screen.width, normal_thickness),
    }
}

/// Rect of the region with the largest area; the first one wins a tie
pub fn largest_area_rect(region: &Region) -> Option<Rect> {
    let mut best: Option<Rect> = None;
    for rect in region.iter() {
        if best.map_or(true, |b| rect.area() > b.area()) {
            best = Some(*rect);
        }
    }
    best
}

fn window_size(config: &ViewConfig, available: Rect, screen: Rect) -> Size {
    let panel = config.behaves_as_panel;

    match config.form_factor() {
        FormFactor::Vertical if panel => {
            Size::new(config.normal_thickness, (config.max_length * available.height as f64) as i32)
        }
        FormFactor::Vertical => Size::new(config.max_thickness, available.height),
        FormFactor::Horizontal if panel => {
            Size::new((config.max_length * screen.width as f64) as i32, config.normal_thickness)
        }
        FormFactor::Horizontal => Size::new(screen.width, config.max_thickness),
    }
}

fn window_position(config: &ViewConfig, available: Rect, size: Size) -> Point {
    if !config.behaves_as_panel {
        return match config.edge {
            Edge::Top | Edge::Left => available.origin(),
            Edge::Bottom => Point::new(available.left(), available.bottom() - size.height),
            Edge::Right => Point::new(available.right() - size.width, available.top()),
        };
    }

    let gap = |length: i32| (length as f64 * config.offset) as i32;
    let gap_centered = |length: i32| {
        (length as f64 * ((1.0 - config.max_length) / 2.0) + length as f64 * config.offset) as i32
    };
    // Reversed alignments sit one pixel further along the edge
    let gap_reversed = |length: i32| (length as f64 - length as f64 * config.max_length) as i32 - gap(length) + 1;

    let clean_thickness = config.normal_thickness - config.inner_shadow;
    let margin = config.screen_edge_margin;

    match config.edge {
        Edge::Top | Edge::Bottom => {
            let w = available.width;
            let x = available.left()
                + match config.alignment {
                    Alignment::Left => gap(w),
                    Alignment::Right => gap_reversed(w),
                    _ => gap_centered(w),
                };
            let y = if config.edge == Edge::Top {
                available.top() + margin
            } else {
                available.bottom() - clean_thickness - margin
            };
            Point::new(x, y)
        }
        Edge::Left | Edge::Right => {
            let h = available.height;
            let y = available.top()
                + match config.alignment {
                    Alignment::Top => gap(h),
                    Alignment::Bottom => gap_reversed(h),
                    _ => gap_centered(h),
                };
            let x = if config.edge == Edge::Left {
                available.left() + margin
            } else {
                available.right() - clean_thickness - margin
            };
            Point::new(x, y)
        }
    }
}
