//! Free screen space after other views took their share.

use smallvec::SmallVec;

use crate::geometry::{Rect, Region};
use crate::screens::Screen;
use crate::types::{Alignment, Edge, FormFactor, VisibilityMode};

/// Which views count as occupying space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCriteria {
    pub ignore_modes: SmallVec<[VisibilityMode; 4]>,
    pub ignore_edges: SmallVec<[Edge; 4]>,
    /// Start from the full screen geometry instead of the available one
    pub ignore_external_panels: bool,
    /// Compute for the desktop: panels count at their resting position
    pub desktop_use: bool,
}

impl RegionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring_modes(mut self, modes: &[VisibilityMode]) -> Self {
        self.ignore_modes.extend_from_slice(modes);
        self
    }

    pub fn ignoring_edges(mut self, edges: &[Edge]) -> Self {
        self.ignore_edges.extend_from_slice(edges);
        self
    }

    pub fn with_external_panels_ignored(mut self, ignore: bool) -> Self {
        self.ignore_external_panels = ignore;
        self
    }

    pub fn for_desktop(mut self, desktop_use: bool) -> Self {
        self.desktop_use = desktop_use;
        self
    }

    /// `None` and `NormalWindow` views never occupy space
    pub fn ignores_mode(&self, mode: VisibilityMode) -> bool {
        !mode.is_valid() || self.ignore_modes.contains(&mode)
    }

    pub fn ignores_edge(&self, edge: Edge) -> bool {
        self.ignore_edges.contains(&edge)
    }
}

/// What the calculator needs to know about a view on the screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    pub edge: Edge,
    pub alignment: Alignment,
    pub mode: VisibilityMode,
    pub behaves_as_panel: bool,
    /// Current window geometry
    pub geometry: Rect,
    pub max_length: f64,
    pub offset: f64,
    pub normal_thickness: i32,
    pub screen_edge_margin: i32,
}

/// Pure queries over the views placed on one screen
#[derive(Debug, Clone, Copy)]
pub struct AvailableRegionCalculator<'a> {
    screen: &'a Screen,
}

impl<'a> AvailableRegionCalculator<'a> {
    pub fn new(screen: &'a Screen) -> Self {
        Self { screen }
    }

    fn start_rect(&self, criteria: &RegionCriteria) -> Rect {
        if criteria.ignore_external_panels {
            self.screen.geometry
        } else {
            self.screen.available_geometry
        }
    }

    fn counts<'o>(
        criteria: &'o RegionCriteria,
        occupants: impl IntoIterator<Item = &'o Occupant> + 'o,
    ) -> impl Iterator<Item = &'o Occupant> + 'o {
        occupants
            .into_iter()
            .filter(move |o| !criteria.ignores_edge(o.edge) && !criteria.ignores_mode(o.mode))
    }

    /// Free region: the start rect minus every counted view's occupied area
    pub fn region<'o>(
        &self,
        occupants: impl IntoIterator<Item = &'o Occupant> + 'o,
        criteria: &'o RegionCriteria,
    ) -> Region {
        let mut available = Region::from(self.start_rect(criteria));

        for occupant in Self::counts(criteria, occupants) {
            available -= self.occupied_rect(occupant, criteria.desktop_use);
        }

        available
    }

    /// Free rect: each counted view pushes its edge of the start rect inwards
    pub fn rect<'o>(
        &self,
        occupants: impl IntoIterator<Item = &'o Occupant> + 'o,
        criteria: &'o RegionCriteria,
    ) -> Rect {
        let mut available = self.start_rect(criteria);
        let screen = self.screen.geometry;

        for o in Self::counts(criteria, occupants) {
            let applied = if o.behaves_as_panel {
                o.screen_edge_margin + o.normal_thickness
            } else {
                o.normal_thickness
            };
            // Panels sit at their resting place for the desktop, ignoring slide outs
            let resting = o.behaves_as_panel && criteria.desktop_use;
            let g = o.geometry;

            match o.edge {
                Edge::Top => {
                    let base = if resting { screen.top() } else { g.top() };
                    available.set_top(available.top().max(base + applied));
                }
                Edge::Bottom => {
                    let base = if resting { screen.bottom() } else { g.bottom() };
                    available.set_bottom(available.bottom().min(base - applied));
                }
                Edge::Left => {
                    let base = if resting { screen.left() } else { g.left() };
                    available.set_left(available.left().max(base + applied));
                }
                Edge::Right => {
                    let base = if resting { screen.right() } else { g.right() };
                    available.set_right(available.right().min(base - applied));
                }
            }
        }

        available
    }

    /// Area a view takes away from the free region
    pub fn occupied_rect(&self, o: &Occupant, desktop_use: bool) -> Rect {
        let g = o.geometry;

        if o.behaves_as_panel {
            let mut rect = g;
            if desktop_use {
                let screen = self.screen.geometry;
                let margin = o.screen_edge_margin;
                match o.edge {
                    Edge::Top => rect.move_top(screen.top() + margin),
                    Edge::Bottom => rect.move_top(screen.bottom() - margin - g.height),
                    Edge::Left => rect.move_left(screen.left() + margin),
                    Edge::Right => rect.move_left(screen.right() - margin - g.width),
                }
            }
            return rect;
        }

        let thickness = o.normal_thickness;

        match o.edge.form_factor() {
            FormFactor::Horizontal => {
                let w = (o.max_length * g.width as f64) as i32;
                let offset = (o.offset * g.width as f64) as i32;
                let x = match o.alignment {
                    Alignment::Left => g.left() + offset,
                    Alignment::Right => g.right() - w - offset,
                    _ => g.center().x - w / 2 + offset,
                };
                let y = match o.edge {
                    Edge::Top => g.top(),
                    _ => g.bottom() - thickness,
                };
                Rect::new(x, y, w, thickness)
            }
            FormFactor::Vertical => {
                let h = (o.max_length * g.height as f64) as i32;
                let offset = (o.offset * g.height as f64) as i32;
                let y = match o.alignment {
                    Alignment::Top => g.top() + offset,
                    Alignment::Bottom => g.bottom() - h - offset,
                    _ => g.center().y - h / 2 + offset,
                };
                let x = match o.edge {
                    Edge::Left => g.left(),
                    _ => g.right() - thickness,
                };
                Rect::new(x, y, thickness, h)
            }
        }
    }
}
