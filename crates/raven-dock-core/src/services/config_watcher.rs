use async_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ConfigPaths, DockSettings};
use crate::messages::DockEvent;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Service that watches the settings file for changes using inotify
pub struct ConfigWatcher {
    paths: ConfigPaths,
    event_tx: Sender<DockEvent>,
}

impl ConfigWatcher {
    pub fn new(paths: ConfigPaths, event_tx: Sender<DockEvent>) -> Self {
        Self { paths, event_tx }
    }

    /// Run the config watcher until the coordinator goes away
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting config watcher");

        let Some(dir) = self.paths.settings.parent().map(|p| p.to_path_buf()) else {
            warn!("Settings file {:?} has no parent directory", self.paths.settings);
            return Ok(());
        };
        tokio::fs::create_dir_all(&dir).await?;

        // Channel for file events
        let (notify_tx, mut notify_rx) = mpsc::channel::<std::path::PathBuf>(32);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    // Only react to modifications and creations
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for path in event.paths {
                            let _ = notify_tx.blocking_send(path);
                        }
                    }
                }
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        // The file may not exist yet, so watch its directory
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!("Watching directory: {:?}", dir);

        let mut debounce_deadline: Option<tokio::time::Instant> = None;

        loop {
            tokio::select! {
                path = notify_rx.recv() => match path {
                    Some(path) if path == self.paths.settings => {
                        debounce_deadline = Some(tokio::time::Instant::now() + DEBOUNCE);
                    }
                    Some(_) => {}
                    None => break,
                },

                // Rapid writes settled, reload
                _ = async {
                    match debounce_deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    debounce_deadline = None;
                    if !self.reload_settings().await {
                        break;
                    }
                }
            }
        }

        info!("Config watcher stopped");
        Ok(())
    }

    /// Reload settings and send them on; false once nobody listens
    async fn reload_settings(&self) -> bool {
        debug!("Reloading settings: {:?}", self.paths.settings);

        match read_settings(&self.paths).await {
            Some(settings) => {
                info!("Settings reloaded, memory usage {:?}", settings.memory_usage);
                self.event_tx.send(DockEvent::SettingsReloaded(settings)).await.is_ok()
            }
            None => true,
        }
    }
}

/// Parse the settings file; `None` while it's missing or half written
pub async fn read_settings(paths: &ConfigPaths) -> Option<DockSettings> {
    match tokio::fs::read(&paths.settings).await {
        Ok(data) => match serde_json::from_slice::<DockSettings>(&data) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Failed to parse settings: {}", e);
                None
            }
        },
        Err(e) => {
            // File might not exist yet, that's OK
            debug!("Could not read settings: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryUsage;

    #[tokio::test]
    async fn test_read_settings() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::with_root(dir.path());
        assert_eq!(read_settings(&paths).await, None);

        tokio::fs::write(&paths.settings, br#"{"memory_usage": "multiple"}"#)
            .await
            .unwrap();
        let settings = read_settings(&paths).await.unwrap();
        assert_eq!(settings.memory_usage, MemoryUsage::Multiple);

        tokio::fs::write(&paths.settings, b"{\"memory_us").await.unwrap();
        assert_eq!(read_settings(&paths).await, None);
    }
}
