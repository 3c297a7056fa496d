//! Error types for squall.
//!
//! Only loading can fail: reading a storm bundle or a session config from
//! disk or JSON. The per-frame simulation API clamps bad input instead of
//! returning errors.

use std::fmt;

/// Errors that can occur while loading storm data or configuration.
#[derive(Debug)]
pub enum LoadError {
    /// Failed to read the file from disk.
    Io(std::io::Error),
    /// The file is not valid JSON for the expected shape.
    Json(serde_json::Error),
    /// The bundle has no sites, or no time steps.
    EmptyBundle,
    /// No site with the requested id.
    UnknownSite(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "Failed to read file: {}", e),
            LoadError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            LoadError::EmptyBundle => write!(f, "Storm bundle has no sites or no time steps"),
            LoadError::UnknownSite(id) => write!(f, "No site with id '{}' in storm bundle", id),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Json(e) => Some(e),
            LoadError::EmptyBundle | LoadError::UnknownSite(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Json(e)
    }
}
