use async_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::messages::{DockCommand, DockEvent, DockStatus};
use crate::wm::WindowSystem;

/// Async service that owns the coordinator.
///
/// Events are applied one at a time; between events the service sleeps
/// until the coordinator's next timer deadline.
pub struct DockService<W: WindowSystem> {
    coordinator: Coordinator<W>,
    event_rx: Receiver<DockEvent>,
    command_tx: Sender<DockCommand>,
    status: Arc<RwLock<DockStatus>>,
}

impl<W: WindowSystem + Send + 'static> DockService<W> {
    pub fn new(
        coordinator: Coordinator<W>,
        event_rx: Receiver<DockEvent>,
        command_tx: Sender<DockCommand>,
        status: Arc<RwLock<DockStatus>>,
    ) -> Self {
        Self {
            coordinator,
            event_rx,
            command_tx,
            status,
        }
    }

    /// Run until every event sender is gone, then save
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Starting dock service");

        self.coordinator.start(Instant::now());
        self.flush().await;

        loop {
            let deadline = self.coordinator.next_deadline();

            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Ok(event) => self.coordinator.handle_event(event, Instant::now()),
                    Err(_) => break,
                },

                _ = wait_until(deadline) => {}
            }

            self.coordinator.poll_timers(Instant::now());
            self.flush().await;
        }

        info!("Event channel closed, saving and stopping dock service");
        self.coordinator.save_all()?;
        Ok(())
    }

    /// Refresh the status snapshot and forward queued commands
    async fn flush(&mut self) {
        *self.status.write() = self.coordinator.status();

        for command in self.coordinator.take_commands() {
            debug!("Command: {:?}", command);
            if self.command_tx.send(command).await.is_err() {
                warn!("No command receiver left, dropping commands");
                break;
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        // No timer running, wait for the next event
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DockSettings;
    use crate::geometry::Rect;
    use crate::layouts::{LayoutData, LayoutRegistry, MemoryLayoutStore};
    use crate::screens::ScreenRegistry;
    use crate::types::{Edge, MemoryUsage};
    use crate::views::ViewConfig;
    use crate::wm::{Backend, WaylandBackend};
    use std::time::Duration;

    fn service() -> (
        DockService<Backend>,
        Sender<DockEvent>,
        Receiver<DockCommand>,
        Arc<RwLock<DockStatus>>,
    ) {
        let mut data = LayoutData::new("Default");
        data.views.push(ViewConfig::new(1, Edge::Bottom));
        let store = MemoryLayoutStore::new().with_layout(data);
        let mut layouts = LayoutRegistry::new(Box::new(store), MemoryUsage::Single, Duration::from_millis(2000));
        layouts.switch_to("Default").unwrap();

        let coordinator = Coordinator::new(
            DockSettings::default(),
            ScreenRegistry::new(),
            layouts,
            Backend::Wayland(WaylandBackend::new()),
        );

        let (event_tx, event_rx) = async_channel::bounded(64);
        let (command_tx, command_rx) = async_channel::bounded(64);
        let status = Arc::new(RwLock::new(DockStatus::default()));
        let service = DockService::new(coordinator, event_rx, command_tx, status.clone());
        (service, event_tx, command_rx, status)
    }

    #[tokio::test(start_paused = true)]
    async fn test_views_are_placed_after_screens_settle() {
        let (service, event_tx, command_rx, status) = service();
        let started = Instant::now();
        let handle = tokio::spawn(service.run());

        event_tx
            .send(DockEvent::ScreenAdded {
                name: "DP-1".into(),
                geometry: Rect::new(0, 0, 1920, 1080),
                available_geometry: Rect::new(0, 0, 1920, 1080),
            })
            .await
            .unwrap();

        loop {
            let command = command_rx.recv().await.unwrap();
            if command == (DockCommand::MapView { view: 1, screen: 0 }) {
                break;
            }
        }
        assert!(started.elapsed() >= Duration::from_millis(2500));
        assert_eq!(status.read().views[0].screen, Some(0));

        drop(event_tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_senders_are_gone() {
        let (service, event_tx, command_rx, status) = service();
        let handle = tokio::spawn(service.run());

        assert!(matches!(
            command_rx.recv().await.unwrap(),
            DockCommand::LayoutsChanged { .. }
        ));
        drop(event_tx);
        handle.await.unwrap().unwrap();

        assert_eq!(status.read().current_layouts, vec!["Default"]);
    }
}
