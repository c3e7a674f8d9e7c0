//! Map session for a marker map.
//!
//! [`MapSession`] owns the lifecycle of a single map view: binding it to a
//! rendering surface, following the device position, showing a clustered set of
//! markers and arming single-shot draw interactions. The rendering engine itself
//! is an external capability described by the [`MapEngine`] trait; a
//! [`HeadlessEngine`] is provided for hosts without a rendering surface.
//!
//! ```ignore
//! use std::sync::Arc;
//! use covidmap::{HeadlessEngine, MapConfig, MapSession, MemoryStore};
//!
//! let session = MapSession::new(
//!     HeadlessEngine::new(),
//!     Arc::new(MemoryStore::new()),
//!     MapConfig::default(),
//! );
//! session.on_initialized(|| log::info!("map is ready"));
//! session.initialize("map", 38.72, -9.14);
//! session.handle_click(covidmap::MapPosition::new(38.71, -9.13));
//! ```

pub mod cluster;
pub mod config;
pub mod draw;
pub mod engine;
pub mod error;
pub mod geolocation;
pub mod headless;
pub mod i18n;
pub mod logging;
pub mod position;
pub mod projection;
pub mod session;
pub mod storage;
pub mod symbol;

pub use config::MapConfig;
pub use draw::DrawState;
pub use engine::{InteractionId, LayerId, MapEngine, ViewState};
pub use error::{MapError, StorageError};
pub use headless::HeadlessEngine;
pub use i18n::{I18n, Language};
pub use position::{MapPosition, MarkerData};
pub use session::{InsertionCancel, MapSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

pub use galileo_types;
