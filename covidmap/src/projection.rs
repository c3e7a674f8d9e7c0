//! Web Mercator (EPSG:3857) projection used by the map view.

use std::f64::consts::PI;

use galileo_types::cartesian::{CartesianPoint2d, Point2};

use crate::position::MapPosition;

/// Radius of the sphere used by Web Mercator, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Tile size the zoom levels are defined for.
pub const TILE_SIZE: f64 = 256.0;

/// Longitude offset applied before centering the view on a device position.
///
/// This is a calibration for one local deployment and is not portable.
pub const LONGITUDE_CORRECTION: f64 = -0.0038;

/// Latitude offset applied before centering the view on a device position.
///
/// See [`LONGITUDE_CORRECTION`].
pub const LATITUDE_CORRECTION: f64 = 0.0007;

/// Projects longitude/latitude in degrees into Web Mercator metres.
pub fn from_lon_lat(longitude: f64, latitude: f64) -> Point2 {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * longitude.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + latitude.to_radians() / 2.0).tan().ln();
    Point2::new(x, y)
}

/// Unprojects Web Mercator metres into a geographic position.
pub fn to_position(point: &Point2) -> MapPosition {
    let longitude = (point.x() / EARTH_RADIUS).to_degrees();
    let latitude = (2.0 * (point.y() / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    MapPosition::new(latitude, longitude)
}

/// Projects a position into Web Mercator metres.
pub fn project(position: &MapPosition) -> Point2 {
    from_lon_lat(position.longitude, position.latitude)
}

/// Size of one pixel in metres at the equator for the given zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    2.0 * PI * EARTH_RADIUS / TILE_SIZE / 2f64.powf(zoom)
}

/// Point the view is centered on when following a device at the given position.
pub fn corrected_center(latitude: f64, longitude: f64) -> Point2 {
    from_lon_lat(
        longitude + LONGITUDE_CORRECTION,
        latitude + LATITUDE_CORRECTION,
    )
}

/// Converts a ground distance at the given latitude into Web Mercator metres.
pub fn ground_to_projected(distance_m: f64, latitude: f64) -> f64 {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    distance_m / latitude.to_radians().cos()
}
