use tracing::debug;

use super::{Reservation, WindowSystem, WmState};
use crate::geometry::Rect;
use crate::types::{Edge, ViewId};

/// Wayland backend: struts become a layer-shell exclusive zone anchored
/// to the view's edge.
#[derive(Debug, Default)]
pub struct WaylandBackend {
    pub(super) state: WmState,
}

impl WaylandBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclusive_zone(rect: Rect, edge: Edge) -> Reservation {
        let size = if edge.is_vertical() {
            rect.width
        } else {
            rect.height
        };

        Reservation::ExclusiveZone {
            edge,
            size: size.max(0),
        }
    }
}

impl WindowSystem for WaylandBackend {
    fn name(&self) -> &'static str {
        "wayland"
    }

    fn set_view_struts(&mut self, view: ViewId, rect: Rect, edge: Edge) {
        let reservation = Self::exclusive_zone(rect, edge);
        debug!("View {} exclusive zone {:?}", view, reservation);
        self.state.reserve(view, reservation);
    }

    delegate_wm_state!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_zone_uses_thickness() {
        assert_eq!(
            WaylandBackend::exclusive_zone(Rect::new(0, 1040, 1920, 40), Edge::Bottom),
            Reservation::ExclusiveZone {
                edge: Edge::Bottom,
                size: 40,
            }
        );
        assert_eq!(
            WaylandBackend::exclusive_zone(Rect::new(1860, 0, 60, 540), Edge::Right),
            Reservation::ExclusiveZone {
                edge: Edge::Right,
                size: 60,
            }
        );
    }
}
