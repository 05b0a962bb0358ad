use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{error, info};

use super::{ConfigWatcher, DockService};
use crate::config::ConfigPaths;
use crate::coordinator::Coordinator;
use crate::messages::{DockCommand, DockEvent, DockStatus};
use crate::wm::Backend;

/// Central hub for managing all async services
pub struct ServiceHub {
    /// Events for the coordinator, from IPC and the rendering side
    event_tx: async_channel::Sender<DockEvent>,
    /// Commands for the rendering side
    command_rx: async_channel::Receiver<DockCommand>,
    /// Latest coordinator snapshot
    status: Arc<RwLock<DockStatus>>,
    /// Tokio runtime
    runtime: Arc<Runtime>,
}

impl ServiceHub {
    /// Load the configuration under `paths` and start the services on a
    /// new tokio runtime
    pub fn new(paths: ConfigPaths) -> anyhow::Result<Self> {
        let runtime = Runtime::new()?;
        let runtime = Arc::new(runtime);

        // Create communication channels
        let (event_tx, event_rx) = async_channel::bounded::<DockEvent>(64);
        let (command_tx, command_rx) = async_channel::bounded::<DockCommand>(64);
        let status = Arc::new(RwLock::new(DockStatus::default()));

        let coordinator = Coordinator::load(paths.clone(), Backend::detect())?;
        let service = DockService::new(coordinator, event_rx, command_tx, status.clone());
        runtime.spawn(async move {
            if let Err(e) = service.run().await {
                error!("Dock service error: {}", e);
            }
        });

        let event_tx_config = event_tx.clone();
        runtime.spawn(async move {
            let watcher = ConfigWatcher::new(paths, event_tx_config);
            if let Err(e) = watcher.run().await {
                error!("Config watcher error: {}", e);
            }
        });

        info!("ServiceHub initialized with all services");

        Ok(Self {
            event_tx,
            command_rx,
            status,
            runtime,
        })
    }

    /// Get a clone of the event sender
    pub fn event_sender(&self) -> async_channel::Sender<DockEvent> {
        self.event_tx.clone()
    }

    /// Get a clone of the command receiver for the rendering side
    pub fn command_receiver(&self) -> async_channel::Receiver<DockCommand> {
        self.command_rx.clone()
    }

    /// Latest state of the coordinator
    pub fn status(&self) -> DockStatus {
        self.status.read().clone()
    }

    /// Shared handle to the status snapshot, for tasks on the runtime
    pub fn status_handle(&self) -> Arc<RwLock<DockStatus>> {
        self.status.clone()
    }

    /// Enter the runtime context
    pub fn enter_runtime(&self) -> tokio::runtime::EnterGuard<'_> {
        self.runtime.enter()
    }

    /// Get a reference to the runtime
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Queue an event from outside the runtime
    pub fn send_event(&self, event: DockEvent) {
        let _ = self.event_tx.send_blocking(event);
    }
}
