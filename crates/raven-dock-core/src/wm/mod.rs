//! Window-system integration.
//!
//! The engine talks to the compositor through [`WindowSystem`]. The backend
//! is picked once at startup ([`Backend::detect`]) and never changes; both
//! backends record what they published so repeated calls are cheap, and
//! queue [`WmRequest`]s for the rendering side to carry out.

/// Shared trait plumbing for backends built on [`WmState`]
macro_rules! delegate_wm_state {
    () => {
        fn remove_view_struts(&mut self, view: crate::types::ViewId) {
            self.state.release(view);
        }

        fn set_active_edge(&mut self, ghost: crate::types::WindowId, active: bool) {
            self.state.set_active_edge(ghost, active);
        }

        fn register_ignored_window(&mut self, id: crate::types::WindowId) {
            self.state.tracker.register_ignored(id);
        }

        fn unregister_ignored_window(&mut self, id: crate::types::WindowId) {
            self.state.tracker.unregister_ignored(id);
        }

        fn set_view_layer(&mut self, view: crate::types::ViewId, front: bool) {
            self.state.set_layer(view, front);
        }

        fn create_ghost_window(&mut self, view: crate::types::ViewId) -> crate::types::WindowId {
            self.state.create_ghost(view)
        }

        fn destroy_ghost_window(&mut self, ghost: crate::types::WindowId) {
            self.state.destroy_ghost(ghost);
        }

        fn tracker(&self) -> &crate::wm::WindowTracker {
            &self.state.tracker
        }

        fn tracker_mut(&mut self) -> &mut crate::wm::WindowTracker {
            &mut self.state.tracker
        }

        fn take_requests(&mut self) -> Vec<crate::wm::WmRequest> {
            std::mem::take(&mut self.state.requests)
        }
    };
}

mod tracker;
mod wayland;
mod x11;

pub use tracker::{TrackerFlags, WindowInfo, WindowTracker};
pub use wayland::WaylandBackend;
pub use x11::X11Backend;

use ahash::AHashMap;
use tracing::info;

use crate::geometry::Rect;
use crate::types::{Edge, ViewId, WindowId};

/// Ghost windows get ids far above anything a compositor hands out
const GHOST_WINDOW_BASE: WindowId = 1 << 48;

/// Space reserved for a view, in the form the backend understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// `_NET_WM_STRUT_PARTIAL` style extent relative to the root window
    PartialStrut {
        edge: Edge,
        extent: i32,
        start: i32,
        end: i32,
    },
    /// Layer-shell exclusive zone
    ExclusiveZone { edge: Edge, size: i32 },
}

/// Work for the rendering collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmRequest {
    Reserve {
        view: ViewId,
        reservation: Reservation,
    },
    Release {
        view: ViewId,
    },
    SetLayer {
        view: ViewId,
        front: bool,
    },
    CreateGhost {
        view: ViewId,
        window: WindowId,
    },
    DestroyGhost {
        window: WindowId,
    },
    SetActiveEdge {
        window: WindowId,
        active: bool,
    },
}

/// Capability interface the engine uses to talk to the compositor
pub trait WindowSystem {
    fn name(&self) -> &'static str;

    /// Reserve `rect` for a view attached to `edge`
    fn set_view_struts(&mut self, view: ViewId, rect: Rect, edge: Edge);

    fn remove_view_struts(&mut self, view: ViewId);

    /// Arm or disarm the screen-edge trigger of a ghost window
    fn set_active_edge(&mut self, ghost: WindowId, active: bool);

    /// Exclude one of our own windows from window tracking
    fn register_ignored_window(&mut self, id: WindowId);

    fn unregister_ignored_window(&mut self, id: WindowId);

    /// Keep a view above (`front`) or below normal windows
    fn set_view_layer(&mut self, view: ViewId, front: bool);

    fn create_ghost_window(&mut self, view: ViewId) -> WindowId;

    fn destroy_ghost_window(&mut self, ghost: WindowId);

    /// Bounding rect of all screens changed
    fn set_root_geometry(&mut self, _root: Rect) {}

    fn tracker(&self) -> &WindowTracker;

    fn tracker_mut(&mut self) -> &mut WindowTracker;

    /// Drain queued requests for the rendering side
    fn take_requests(&mut self) -> Vec<WmRequest>;
}

/// Bookkeeping shared by both backends
#[derive(Debug, Default)]
struct WmState {
    reservations: AHashMap<ViewId, Reservation>,
    layers: AHashMap<ViewId, bool>,
    active_edges: AHashMap<WindowId, bool>,
    next_ghost: WindowId,
    tracker: WindowTracker,
    requests: Vec<WmRequest>,
}

impl WmState {
    fn reserve(&mut self, view: ViewId, reservation: Reservation) {
        if self.reservations.get(&view) == Some(&reservation) {
            return;
        }
        self.reservations.insert(view, reservation);
        self.requests.push(WmRequest::Reserve { view, reservation });
    }

    fn release(&mut self, view: ViewId) {
        if self.reservations.remove(&view).is_some() {
            self.requests.push(WmRequest::Release { view });
        }
    }

    fn set_layer(&mut self, view: ViewId, front: bool) {
        if self.layers.insert(view, front) != Some(front) {
            self.requests.push(WmRequest::SetLayer { view, front });
        }
    }

    fn set_active_edge(&mut self, window: WindowId, active: bool) {
        if !self.active_edges.contains_key(&window) {
            return;
        }
        if self.active_edges.insert(window, active) != Some(active) {
            self.requests.push(WmRequest::SetActiveEdge { window, active });
        }
    }

    fn create_ghost(&mut self, view: ViewId) -> WindowId {
        let window = GHOST_WINDOW_BASE + self.next_ghost;
        self.next_ghost += 1;

        self.active_edges.insert(window, false);
        self.tracker.register_ignored(window);
        self.requests.push(WmRequest::CreateGhost { view, window });
        window
    }

    fn destroy_ghost(&mut self, window: WindowId) {
        if self.active_edges.remove(&window).is_some() {
            self.tracker.unregister_ignored(window);
            self.requests.push(WmRequest::DestroyGhost { window });
        }
    }

    fn reservation(&self, view: ViewId) -> Option<Reservation> {
        self.reservations.get(&view).copied()
    }
}

/// Window-system backend, chosen once per session
#[derive(Debug)]
pub enum Backend {
    X11(X11Backend),
    Wayland(WaylandBackend),
}

impl Backend {
    /// Pick the backend for the running session
    pub fn detect() -> Self {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            info!("Using Wayland window system backend");
            Backend::Wayland(WaylandBackend::new())
        } else {
            info!("Using X11 window system backend");
            Backend::X11(X11Backend::new())
        }
    }

    /// Currently published reservation of a view
    pub fn reservation(&self, view: ViewId) -> Option<Reservation> {
        match self {
            Backend::X11(backend) => backend.state.reservation(view),
            Backend::Wayland(backend) => backend.state.reservation(view),
        }
    }

    fn inner(&self) -> &dyn WindowSystem {
        match self {
            Backend::X11(backend) => backend,
            Backend::Wayland(backend) => backend,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn WindowSystem {
        match self {
            Backend::X11(backend) => backend,
            Backend::Wayland(backend) => backend,
        }
    }
}

impl WindowSystem for Backend {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn set_view_struts(&mut self, view: ViewId, rect: Rect, edge: Edge) {
        self.inner_mut().set_view_struts(view, rect, edge)
    }

    fn remove_view_struts(&mut self, view: ViewId) {
        self.inner_mut().remove_view_struts(view)
    }

    fn set_active_edge(&mut self, ghost: WindowId, active: bool) {
        self.inner_mut().set_active_edge(ghost, active)
    }

    fn register_ignored_window(&mut self, id: WindowId) {
        self.inner_mut().register_ignored_window(id)
    }

    fn unregister_ignored_window(&mut self, id: WindowId) {
        self.inner_mut().unregister_ignored_window(id)
    }

    fn set_view_layer(&mut self, view: ViewId, front: bool) {
        self.inner_mut().set_view_layer(view, front)
    }

    fn create_ghost_window(&mut self, view: ViewId) -> WindowId {
        self.inner_mut().create_ghost_window(view)
    }

    fn destroy_ghost_window(&mut self, ghost: WindowId) {
        self.inner_mut().destroy_ghost_window(ghost)
    }

    fn set_root_geometry(&mut self, root: Rect) {
        self.inner_mut().set_root_geometry(root)
    }

    fn tracker(&self) -> &WindowTracker {
        self.inner().tracker()
    }

    fn tracker_mut(&mut self) -> &mut WindowTracker {
        self.inner_mut().tracker_mut()
    }

    fn take_requests(&mut self) -> Vec<WmRequest> {
        self.inner_mut().take_requests()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struts_are_idempotent() {
        let mut backend = Backend::Wayland(WaylandBackend::new());
        let rect = Rect::new(0, 1040, 1920, 40);

        backend.set_view_struts(3, rect, Edge::Bottom);
        backend.set_view_struts(3, rect, Edge::Bottom);
        backend.remove_view_struts(3);
        backend.remove_view_struts(3);

        let requests = backend.take_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], WmRequest::Release { view: 3 });
        assert!(backend.reservation(3).is_none());
    }

    #[test]
    fn test_ghost_windows_are_ignored_by_tracker() {
        let mut backend = Backend::X11(X11Backend::new());
        let ghost = backend.create_ghost_window(5);
        assert!(backend.tracker().is_ignored(ghost));

        backend.set_active_edge(ghost, true);
        backend.set_active_edge(ghost, true);
        backend.destroy_ghost_window(ghost);
        backend.set_active_edge(ghost, false);

        let requests = backend.take_requests();
        assert_eq!(
            requests,
            vec![
                WmRequest::CreateGhost { view: 5, window: ghost },
                WmRequest::SetActiveEdge { window: ghost, active: true },
                WmRequest::DestroyGhost { window: ghost },
            ]
        );
        assert!(!backend.tracker().is_ignored(ghost));
    }
}
