//! Rendering engine capability consumed by the map session.
//!
//! The session never draws anything itself. Everything that ends up on screen
//! goes through a [`MapEngine`], which owns the surface, the camera, the layers
//! and the platform position tracking.

use std::sync::Arc;
use std::time::Duration;

use galileo_types::cartesian::Point2;

use crate::cluster::ClusterLayer;
use crate::geolocation::{AccuracyGeometry, TrackingOptions};
use crate::symbol::UserPositionSymbol;

/// Handle of a layer added to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Handle of an interaction added to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionId(pub u64);

/// Camera state of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Center in Web Mercator metres.
    pub center: Point2,
    /// Zoom level, 0 shows the whole world in one 256 px tile.
    pub zoom: f64,
}

impl ViewState {
    /// Creates a new view state.
    pub fn new(center: Point2, zoom: f64) -> Self {
        Self { center, zoom }
    }

    /// Metres per pixel at the equator.
    pub fn resolution(&self) -> f64 {
        crate::projection::resolution_for_zoom(self.zoom)
    }
}

/// Error returned by an engine that cannot attach to the requested surface.
#[derive(Debug, thiserror::Error)]
#[error("cannot bind map to surface '{surface_id}': {reason}")]
pub struct BindError {
    /// Surface that was requested.
    pub surface_id: String,
    /// Engine specific description.
    pub reason: String,
}

/// Map rendering and positioning backend.
pub trait MapEngine {
    /// Attaches the map to the surface with the given id and sets the initial view.
    fn bind_surface(&mut self, surface_id: &str, view: ViewState) -> Result<(), BindError>;

    /// Adds the background tile layer. `url_template` uses `{z}`, `{x}`, `{y}`
    /// and an optional `{a-c}` subdomain range.
    fn add_tile_layer(&mut self, url_template: &str) -> LayerId;

    /// Current view, `None` before the surface is bound.
    fn view(&self) -> Option<ViewState>;

    /// Moves the view to `target` over `duration`.
    fn animate_view(&mut self, target: ViewState, duration: Duration);

    /// Moves the device position dot drawn with `symbol`. `None` hides it.
    fn set_user_position(&mut self, position: Option<Point2>, symbol: UserPositionSymbol);

    /// Replaces the accuracy indicator around the device position.
    fn set_accuracy(&mut self, geometry: Option<AccuracyGeometry>);

    /// Adds a marker cluster layer.
    fn add_cluster_layer(&mut self, layer: Arc<ClusterLayer>) -> LayerId;

    /// Removes a previously added layer. Unknown ids are ignored.
    fn remove_layer(&mut self, id: LayerId);

    /// Adds an interaction that waits for the user to click a point.
    fn add_draw_interaction(&mut self) -> InteractionId;

    /// Adds a point to the layer of points drawn by the user. The layer sits
    /// below the marker clusters.
    fn add_drawn_point(&mut self, point: Point2);

    /// Removes a previously added interaction. Unknown ids are ignored.
    fn remove_interaction(&mut self, id: InteractionId);

    /// Starts following the device position.
    fn start_tracking(&mut self, options: TrackingOptions);
}
