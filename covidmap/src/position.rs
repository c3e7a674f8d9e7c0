//! Geographic value types shared by the session, storage and callbacks.

use galileo_types::geo::impls::GeoPoint2d;
use galileo_types::geo::{GeoPoint, NewGeoPoint};
use serde::{Deserialize, Serialize};

/// Geographic position in degrees.
///
/// Serialized as `{"latitude": .., "longitude": ..}`, which is the shape of the
/// persisted last known position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl MapPosition {
    /// Creates a new position.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<MapPosition> for GeoPoint2d {
    fn from(position: MapPosition) -> Self {
        GeoPoint2d::latlon(position.latitude, position.longitude)
    }
}

impl From<GeoPoint2d> for MapPosition {
    fn from(point: GeoPoint2d) -> Self {
        Self::new(point.lat(), point.lon())
    }
}

/// A point of interest shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerData {
    /// Where the marker is placed.
    pub position: MapPosition,
}

impl MarkerData {
    /// Creates a marker at the given coordinates.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: MapPosition::new(latitude, longitude),
        }
    }
}

impl From<MapPosition> for MarkerData {
    fn from(position: MapPosition) -> Self {
        Self { position }
    }
}
