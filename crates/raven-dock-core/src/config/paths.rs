use std::path::{Path, PathBuf};

/// Configuration paths for the dock
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub settings: PathBuf,
    pub layouts_dir: PathBuf,
    pub screens: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        Self::with_root(config_dir.join("raven-dock"))
    }

    /// All paths below a single root (used by tests and `--config-dir`)
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            settings: root.join("settings.json"),
            layouts_dir: root.join("layouts"),
            screens: root.join("screens.json"),
        }
    }

    /// Get the dock config directory
    pub fn config_dir(&self) -> PathBuf {
        self.settings.parent().unwrap_or(Path::new(".")).to_path_buf()
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new()
    }
}
