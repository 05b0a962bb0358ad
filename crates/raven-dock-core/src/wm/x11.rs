use tracing::debug;

use super::{Reservation, WindowSystem, WmState};
use crate::geometry::Rect;
use crate::types::{Edge, ViewId};

/// X11 backend: struts are published as partial strut extents measured
/// from the root window edges.
#[derive(Debug, Default)]
pub struct X11Backend {
    pub(super) state: WmState,
    root: Rect,
}

impl X11Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partial strut for `rect` docked at `edge`
    pub fn partial_strut(root: Rect, rect: Rect, edge: Edge) -> Reservation {
        let (extent, start, end) = match edge {
            Edge::Top => (rect.bottom() - root.top(), rect.left(), rect.right() - 1),
            Edge::Bottom => (root.bottom() - rect.top(), rect.left(), rect.right() - 1),
            Edge::Left => (rect.right() - root.left(), rect.top(), rect.bottom() - 1),
            Edge::Right => (root.right() - rect.left(), rect.top(), rect.bottom() - 1),
        };

        Reservation::PartialStrut {
            edge,
            extent: extent.max(0),
            start,
            end,
        }
    }
}

impl WindowSystem for X11Backend {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn set_view_struts(&mut self, view: ViewId, rect: Rect, edge: Edge) {
        let reservation = Self::partial_strut(self.root, rect, edge);
        debug!("View {} strut {:?}", view, reservation);
        self.state.reserve(view, reservation);
    }

    fn set_root_geometry(&mut self, root: Rect) {
        self.root = root;
    }

    delegate_wm_state!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_strut_on_second_screen() {
        // eDP-1 at the left, HDMI-1 (1280x1024) to its right
        let root = Rect::new(0, 0, 3200, 1080);
        let strut = X11Backend::partial_strut(root, Rect::new(1920, 984, 1280, 40), Edge::Bottom);

        assert_eq!(
            strut,
            Reservation::PartialStrut {
                edge: Edge::Bottom,
                extent: 96,
                start: 1920,
                end: 3199,
            }
        );
    }

    #[test]
    fn test_left_strut() {
        let root = Rect::new(0, 0, 1920, 1080);
        let strut = X11Backend::partial_strut(root, Rect::new(0, 0, 60, 540), Edge::Left);

        assert_eq!(
            strut,
            Reservation::PartialStrut {
                edge: Edge::Left,
                extent: 60,
                start: 0,
                end: 539,
            }
        );
    }
}
