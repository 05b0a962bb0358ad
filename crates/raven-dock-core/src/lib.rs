//! Placement engine for the Raven dock.
//!
//! Docks and panels ("views") belong to layouts and are placed on the
//! edges of physical screens. The [`Coordinator`] keeps them there while
//! screens come and go, computes their geometry, and decides when they
//! hide and which screen space they reserve.

pub mod available;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod layouts;
pub mod messages;
pub mod positioner;
pub mod screens;
pub mod services;
pub mod timer;
pub mod types;
pub mod views;
pub mod visibility;
pub mod wm;

pub use config::{ConfigPaths, DockSettings};
pub use coordinator::Coordinator;
pub use error::{DockError, Result};
pub use geometry::{Point, Rect, Region, Size};
pub use layouts::{JsonLayoutStore, Layout, LayoutData, LayoutRegistry, LayoutStore, MemoryLayoutStore};
pub use messages::{DockCommand, DockEvent, DockStatus};
pub use screens::{Screen, ScreenRegistry};
pub use services::{ConfigWatcher, DockService, ServiceHub};
pub use types::{Alignment, Edge, FormFactor, MemoryUsage, ScreenId, ViewId, VisibilityMode, WindowId};
pub use views::{View, ViewConfig};
pub use wm::{Backend, WindowSystem};
