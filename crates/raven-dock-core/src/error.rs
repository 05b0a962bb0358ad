use compact_str::CompactString;
use std::path::PathBuf;

/// Errors from the persistence and configuration layer.
///
/// Engine queries never return these: missing screens, views or layouts
/// are reported as empty results instead.
#[derive(Debug, thiserror::Error)]
pub enum DockError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("layout '{0}' not found")]
    LayoutNotFound(CompactString),

    #[error("invalid path: {0:?}")]
    InvalidPath(PathBuf),
}

pub type Result<T> = std::result::Result<T, DockError>;

impl DockError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
