//! End-to-end placement scenarios driven through the coordinator

use std::time::Duration;

use tokio::time::Instant;

use raven_dock_core::available::RegionCriteria;
use raven_dock_core::config::DEFAULT_LAYOUT_NAME;
use raven_dock_core::wm::{WaylandBackend, WmRequest};
use raven_dock_core::{
    Alignment, Backend, ConfigPaths, Coordinator, DockCommand, DockEvent, DockSettings, Edge, LayoutData,
    LayoutRegistry, MemoryLayoutStore, MemoryUsage, Rect, ScreenRegistry, ViewConfig, VisibilityMode,
};

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn full_hd(x: i32) -> Rect {
    Rect::new(x, 0, 1920, 1080)
}

fn coordinator(screens: ScreenRegistry, views: Vec<ViewConfig>) -> Coordinator {
    let mut data = LayoutData::new("Default");
    data.views = views;
    let store = MemoryLayoutStore::new().with_layout(data);
    let mut layouts = LayoutRegistry::new(Box::new(store), MemoryUsage::Single, ms(2000));
    layouts.switch_to("Default").unwrap();

    Coordinator::new(
        DockSettings::default(),
        screens,
        layouts,
        Backend::Wayland(WaylandBackend::new()),
    )
}

fn two_screens(primary: &str) -> ScreenRegistry {
    let mut screens = ScreenRegistry::new();
    screens.connect("HDMI-1", full_hd(0), full_hd(0));
    screens.connect("Primary", full_hd(1920), full_hd(1920));
    screens.set_primary(primary);
    screens
}

#[test]
fn test_primary_view_lands_on_primary_screen() {
    for hdmi_connected in [true, false] {
        let mut screens = two_screens("Primary");
        if !hdmi_connected {
            screens.disconnect("HDMI-1");
        }
        let primary = screens.id_for("Primary");
        let mut coordinator = coordinator(screens, vec![ViewConfig::new(1, Edge::Bottom)]);

        coordinator.start(Instant::now());

        assert_eq!(coordinator.screen_for_view(1), primary, "HDMI-1 connected: {}", hdmi_connected);
        assert_eq!(
            coordinator.view(1).unwrap().geometry(),
            Rect::new(1920, 1008, 1920, 72)
        );
    }
}

#[test]
fn test_left_dock_makes_room_for_top_panel() {
    let mut screens = ScreenRegistry::new();
    screens.connect("DP-1", full_hd(0), full_hd(0));

    let dock = ViewConfig::new(1, Edge::Left);
    let mut panel = ViewConfig::new(2, Edge::Top).with_mode(VisibilityMode::AlwaysVisible);
    panel.behaves_as_panel = true;
    panel.normal_thickness = 36;
    let mut coordinator = coordinator(screens, vec![dock, panel]);
    let now = Instant::now();
    coordinator.start(now);

    let panel = coordinator.view(2).unwrap().geometry();
    let dock = coordinator.view(1).unwrap().geometry();
    assert_eq!(panel, Rect::new(0, 0, 1920, 36));
    assert_eq!(dock, Rect::new(0, 36, 72, 1044));
    assert!(!dock.intersects(&panel));

    coordinator.handle_event(
        DockEvent::SetVisibilityMode {
            view: 2,
            mode: VisibilityMode::SideBar,
        },
        now,
    );
    assert_eq!(coordinator.view(1).unwrap().geometry(), Rect::new(0, 0, 72, 1080));
}

#[test]
fn test_desktop_rect_excludes_always_visible_dock() {
    let mut screens = ScreenRegistry::new();
    let id = screens.connect("DP-1", full_hd(0), full_hd(0));

    let mut dock = ViewConfig::new(1, Edge::Bottom).with_mode(VisibilityMode::AlwaysVisible);
    dock.normal_thickness = 40;
    dock.alignment = Alignment::Justify;
    let mut coordinator = coordinator(screens, vec![dock]);
    coordinator.start(Instant::now());

    let criteria = RegionCriteria::new().for_desktop(true);
    assert_eq!(
        coordinator.available_screen_rect(id, None, &criteria),
        Rect::new(0, 0, 1920, 1040)
    );
    assert_eq!(
        coordinator.available_screen_region(id, None, &criteria).bounding_rect(),
        Rect::new(0, 0, 1920, 1040)
    );

    // Unknown screens have no free space
    assert_eq!(coordinator.available_screen_rect(7, None, &criteria), Rect::default());
}

#[test]
fn test_dock_follows_primary_after_unplug() {
    let now = Instant::now();
    let mut screens = ScreenRegistry::new();
    screens.connect("eDP-1", full_hd(0), full_hd(0));
    screens.connect("HDMI-1", full_hd(1920), full_hd(1920));

    let dock = ViewConfig::new(1, Edge::Bottom).with_mode(VisibilityMode::AlwaysVisible);
    let mut coordinator = coordinator(screens, vec![dock]);
    coordinator.start(now);
    assert_eq!(coordinator.screen_for_view(1), Some(0));

    coordinator.handle_event(DockEvent::ScreenRemoved { name: "eDP-1".into() }, now);
    assert_eq!(coordinator.screen_for_view(1), None);
    assert!(coordinator.wm().reservation(1).is_none());

    coordinator.poll_timers(now + ms(2499));
    assert_eq!(coordinator.screen_for_view(1), None);

    coordinator.poll_timers(now + ms(2500));
    assert_eq!(coordinator.screen_for_view(1), Some(1));
    assert_eq!(
        coordinator.view(1).unwrap().geometry(),
        Rect::new(1920, 1008, 1920, 72)
    );
    assert!(coordinator.wm().reservation(1).is_some());
}

#[test]
fn test_leaving_always_visible_releases_struts_once() {
    let now = Instant::now();
    let mut screens = ScreenRegistry::new();
    screens.connect("DP-1", full_hd(0), full_hd(0));
    let dock = ViewConfig::new(1, Edge::Bottom).with_mode(VisibilityMode::AlwaysVisible);
    let mut coordinator = coordinator(screens, vec![dock]);
    coordinator.start(now);
    coordinator.take_commands();

    coordinator.handle_event(
        DockEvent::SetVisibilityMode {
            view: 1,
            mode: VisibilityMode::AutoHide,
        },
        now,
    );
    coordinator.handle_event(DockEvent::SyncGeometry, now);

    let commands = coordinator.take_commands();
    let releases = commands
        .iter()
        .filter(|c| matches!(c, DockCommand::Window(WmRequest::Release { view: 1 })))
        .count();
    assert_eq!(releases, 1);
    assert!(commands.contains(&DockCommand::VisibilityModeChanged {
        view: 1,
        mode: VisibilityMode::AutoHide
    }));
}

#[test]
fn test_auto_hide_dock_hides_and_returns() {
    let now = Instant::now();
    let mut screens = ScreenRegistry::new();
    screens.connect("DP-1", full_hd(0), full_hd(0));
    let dock = ViewConfig::new(1, Edge::Bottom).with_mode(VisibilityMode::AutoHide);
    let mut coordinator = coordinator(screens, vec![dock]);
    coordinator.start(now);

    assert_eq!(coordinator.next_deadline(), Some(now + ms(700)));
    coordinator.poll_timers(now + ms(700));
    assert!(coordinator.view(1).unwrap().visibility.is_hidden());
    assert!(coordinator
        .take_commands()
        .contains(&DockCommand::SetHidden { view: 1, hidden: true }));

    let later = now + ms(1000);
    coordinator.handle_event(DockEvent::MouseEntered(1), later);
    coordinator.poll_timers(later);
    assert!(!coordinator.view(1).unwrap().visibility.is_hidden());

    // A block keeps it shown after the mouse leaves
    coordinator.handle_event(
        DockEvent::BlockHiding {
            view: 1,
            reason: "menu".into(),
        },
        later,
    );
    coordinator.handle_event(DockEvent::MouseLeft(1), later);
    coordinator.poll_timers(later + ms(5000));
    assert!(!coordinator.view(1).unwrap().visibility.is_hidden());
}

#[test]
fn test_configuration_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ConfigPaths::with_root(dir.path());
    let now = Instant::now();

    let mut first = Coordinator::load(paths.clone(), Backend::Wayland(WaylandBackend::new())).unwrap();
    first.handle_event(
        DockEvent::ScreenAdded {
            name: "DP-1".into(),
            geometry: full_hd(0),
            available_geometry: full_hd(0),
        },
        now,
    );
    first.handle_event(
        DockEvent::AddView {
            layout: DEFAULT_LAYOUT_NAME.into(),
            config: ViewConfig::new(5, Edge::Left).with_mode(VisibilityMode::DodgeMaximized),
        },
        now,
    );
    first.save_all().unwrap();
    drop(first);

    let second = Coordinator::load(paths, Backend::Wayland(WaylandBackend::new())).unwrap();
    assert_eq!(second.screens().id_for("DP-1"), Some(0));
    assert!(!second.screens().is_connected(0));

    let layout = second.layouts().layout(DEFAULT_LAYOUT_NAME).unwrap();
    let view = layout.views.get(5).unwrap();
    assert_eq!(view.edge(), Edge::Left);
    assert_eq!(view.config().visibility.mode, VisibilityMode::DodgeMaximized);
}
