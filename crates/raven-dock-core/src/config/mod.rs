mod paths;
mod settings;

pub use paths::ConfigPaths;
pub use settings::{DockSettings, DEFAULT_LAYOUT_NAME};

pub(crate) mod json {
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::path::Path;
    use tracing::warn;

    use crate::error::{DockError, Result};

    /// Read a JSON file, falling back to defaults when missing or broken
    pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
        match std::fs::read(path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!("Failed to parse {:?}: {}", path, e);
                T::default()
            }),
            Err(_) => T::default(),
        }
    }

    pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let data = std::fs::read(path).map_err(|e| DockError::io(path, e))?;
        serde_json::from_slice(&data).map_err(|e| DockError::json(path, e))
    }

    pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| DockError::InvalidPath(path.to_path_buf()))?;
        std::fs::create_dir_all(dir).map_err(|e| DockError::io(dir, e))?;
        let data = serde_json::to_string_pretty(value).map_err(|e| DockError::json(path, e))?;
        std::fs::write(path, data).map_err(|e| DockError::io(path, e))?;
        Ok(())
    }
}
