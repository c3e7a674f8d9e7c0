//! Session configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, StorageError};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// Default background tiles.
pub const OSM_TILE_URL: &str = "https://{a-c}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Settings of a map session.
///
/// Every field is optional in the JSON form and falls back to the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// URL template of the background tile layer.
    pub tile_url: String,
    /// Zoom level of the view right after initialization.
    pub initial_zoom: f64,
    /// Zoom level used when the view follows a new device position.
    pub position_zoom: f64,
    /// File of the persistent store. `None` keeps state in memory only.
    pub storage_path: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: OSM_TILE_URL.to_string(),
            initial_zoom: 6.0,
            position_zoom: 17.0,
            storage_path: None,
        }
    }
}

impl MapConfig {
    /// Parses a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let json = std::fs::read_to_string(path).map_err(StorageError::from)?;
        Self::from_json(&json)
    }

    /// Opens the store configured by [`MapConfig::storage_path`].
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore + Send + Sync>, StorageError> {
        let store: Arc<dyn KeyValueStore + Send + Sync> = match &self.storage_path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}
