//! Error types.

use thiserror::Error;

use crate::draw::DrawState;

/// Error from a key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read or write the backing file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Backing file does not contain a valid JSON object.
    #[error("store file is corrupted: {0}")]
    Corrupted(#[source] serde_json::Error),
}

/// Error returned by map session operations.
#[derive(Debug, Error)]
pub enum MapError {
    /// Persistent storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A persisted value could not be decoded or a value could not be encoded.
    #[error("invalid persisted value: {0}")]
    Decode(#[from] serde_json::Error),

    /// Coordinates are not finite numbers.
    #[error("invalid position ({latitude}, {longitude})")]
    InvalidPosition {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// Operation requires the map to be bound to a surface first.
    #[error("map session is not initialized")]
    NotInitialized,

    /// Another draw mode is armed and waits for a click.
    #[error("draw mode {active:?} is already armed")]
    DrawModeBusy {
        /// Mode that is currently armed.
        active: DrawState,
    },

    /// The session the handle refers to has been dropped.
    #[error("map session is closed")]
    SessionClosed,
}
