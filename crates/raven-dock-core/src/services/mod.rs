mod config_watcher;
mod dock;
mod hub;

pub use config_watcher::{read_settings, ConfigWatcher};
pub use dock::DockService;
pub use hub::ServiceHub;
