//! Distance based marker clustering.
//!
//! Markers closer to each other than a fixed number of screen pixels are shown
//! as a single cluster icon labelled with the number of markers it stands for.
//! Clusters depend on the view resolution, so engines ask the layer for them
//! every time they draw it.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;
use galileo_types::cartesian::{CartesianPoint2d, Point2, Rect};
use parking_lot::Mutex;

use crate::position::MarkerData;
use crate::projection;
use crate::symbol::ClusterSymbol;

/// Distance in pixels under which markers are merged into one cluster.
pub const CLUSTER_DISTANCE_PX: f64 = 40.0;

/// Draw order of the marker layer. Tiles are at 1, the user position at 4.
pub const CLUSTER_LAYER_Z_INDEX: i32 = 3;

/// Group of markers drawn as one icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Mean of the members' projected positions.
    pub center: Point2,
    /// Indices of the members in the layer's marker sequence.
    pub members: Vec<usize>,
}

impl Cluster {
    /// Number of markers in the cluster.
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Map layer showing a marker sequence as clusters.
pub struct ClusterLayer {
    markers: Vec<MarkerData>,
    projected: Vec<Point2>,
    distance_px: f64,
    z_index: i32,
    symbols: Mutex<HashMap<usize, Arc<ClusterSymbol>, RandomState>>,
}

impl ClusterLayer {
    /// Creates a layer with the default clustering distance.
    pub fn new(markers: Vec<MarkerData>) -> Self {
        Self::with_distance(markers, CLUSTER_DISTANCE_PX)
    }

    /// Creates a layer merging markers closer than `distance_px` pixels.
    pub fn with_distance(markers: Vec<MarkerData>, distance_px: f64) -> Self {
        let projected = markers
            .iter()
            .map(|marker| projection::project(&marker.position))
            .collect();

        Self {
            markers,
            projected,
            distance_px,
            z_index: CLUSTER_LAYER_Z_INDEX,
            symbols: Default::default(),
        }
    }

    /// Markers shown by the layer.
    pub fn markers(&self) -> &[MarkerData] {
        &self.markers
    }

    /// Number of markers in the layer.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns true if the layer has no markers.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Clustering distance in pixels.
    pub fn distance_px(&self) -> f64 {
        self.distance_px
    }

    /// Draw order of the layer.
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Computes clusters for a view with the given resolution (metres per pixel).
    ///
    /// Markers are visited in sequence order. A marker that is not yet part of a
    /// cluster starts a new one, which takes every other free marker within
    /// `distance_px` pixels along both axes.
    pub fn clusters(&self, resolution: f64) -> Vec<Cluster> {
        let map_distance = self.distance_px * resolution;
        let mut assigned = vec![false; self.projected.len()];
        let mut clusters = vec![];

        for (index, point) in self.projected.iter().enumerate() {
            if assigned[index] {
                continue;
            }

            let extent = Rect::new(
                point.x() - map_distance,
                point.y() - map_distance,
                point.x() + map_distance,
                point.y() + map_distance,
            );

            let mut members = vec![];
            for (candidate, candidate_point) in self.projected.iter().enumerate().skip(index) {
                if !assigned[candidate] && contains(&extent, candidate_point) {
                    assigned[candidate] = true;
                    members.push(candidate);
                }
            }

            let count = members.len() as f64;
            let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(x, y), &member| {
                let p = &self.projected[member];
                (x + p.x(), y + p.y())
            });

            clusters.push(Cluster {
                center: Point2::new(sum_x / count, sum_y / count),
                members,
            });
        }

        clusters
    }

    /// Symbol for a cluster of `size` markers.
    pub fn symbol(&self, size: usize) -> Arc<ClusterSymbol> {
        self.symbols
            .lock()
            .entry(size)
            .or_insert_with(|| Arc::new(ClusterSymbol::for_size(size)))
            .clone()
    }
}

impl std::fmt::Debug for ClusterLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterLayer")
            .field("markers", &self.markers.len())
            .field("distance_px", &self.distance_px)
            .field("z_index", &self.z_index)
            .finish()
    }
}

fn contains(rect: &Rect, point: &Point2) -> bool {
    point.x() >= rect.x_min()
        && point.x() <= rect.x_max()
        && point.y() >= rect.y_min()
        && point.y() <= rect.y_max()
}
