//! Device position tracking types.

use galileo_types::cartesian::Point2;

use crate::position::MapPosition;
use crate::projection;

/// Options passed to the engine when position tracking starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackingOptions {
    /// Ask the platform for the most precise fix available.
    pub enable_high_accuracy: bool,
}

impl TrackingOptions {
    /// Options used by the map session.
    pub const HIGH_ACCURACY: Self = Self {
        enable_high_accuracy: true,
    };
}

/// Position reported by the platform while tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeolocationFix {
    /// Reported position.
    pub position: MapPosition,
    /// Radius of the 68% confidence circle, in metres on the ground.
    pub accuracy_m: f64,
}

/// Geometry of the accuracy indicator drawn around the user position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccuracyGeometry {
    /// Indicator collapsed to a point.
    Point(Point2),
    /// Circle in projected coordinates.
    Circle {
        /// Center in Web Mercator metres.
        center: Point2,
        /// Radius in Web Mercator metres.
        radius: f64,
    },
}

impl AccuracyGeometry {
    /// Builds the accuracy circle for a tracking fix.
    pub fn from_fix(fix: &GeolocationFix) -> Self {
        Self::Circle {
            center: projection::project(&fix.position),
            radius: projection::ground_to_projected(fix.accuracy_m, fix.position.latitude),
        }
    }

    /// Center of the indicator.
    pub fn center(&self) -> Point2 {
        match self {
            Self::Point(center) | Self::Circle { center, .. } => *center,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use galileo_types::cartesian::CartesianPoint2d;

    use super::*;

    #[test]
    fn accuracy_circle_at_equator() {
        let fix = GeolocationFix {
            position: MapPosition::new(0.0, 0.0),
            accuracy_m: 25.0,
        };

        let AccuracyGeometry::Circle { center, radius } = AccuracyGeometry::from_fix(&fix) else {
            panic!("expected circle");
        };
        assert_abs_diff_eq!(center.x(), 0.0);
        assert_abs_diff_eq!(radius, 25.0);
    }

    #[test]
    fn accuracy_circle_is_stretched_away_from_equator() {
        let fix = GeolocationFix {
            position: MapPosition::new(60.0, 10.0),
            accuracy_m: 10.0,
        };

        let geometry = AccuracyGeometry::from_fix(&fix);
        let AccuracyGeometry::Circle { radius, .. } = geometry else {
            panic!("expected circle");
        };
        assert_abs_diff_eq!(radius, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(geometry.center().x(), projection::from_lon_lat(10.0, 60.0).x());
    }
}
