//! Load and unload regions around the observer.
//!
//! Distances are measured between chunk centers in chunk units, so they only depend on the
//! observer's chunk. A chunk is loaded when it is within the load radius and deactivated
//! only once it is beyond the larger unload radius; chunks in between keep their current
//! state.
//!
//! With the planar metric the radii apply to the X/Z plane. Vertically, chunks are loaded
//! up to `vertical_radius` chunks away and unloaded beyond `vertical_radius + 1`.

use super::config::{DistanceMetric, StreamingConfig};
use crate::voxels::ChunkCoordinate;

/// The load and unload regions derived from a [`StreamingConfig`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StreamingRegion {
    pub metric: DistanceMetric,
    pub load_radius: f32,
    pub unload_radius: f32,
    pub vertical_radius: u32,
}

impl StreamingRegion {
    pub fn from_config(config: &StreamingConfig) -> Self {
        StreamingRegion {
            metric: config.distance_metric,
            load_radius: config.load_radius,
            unload_radius: config.unload_radius,
            vertical_radius: config.vertical_radius,
        }
    }

    /// Distance used for priority and radius tests.
    pub fn distance(&self, center: ChunkCoordinate, coordinate: ChunkCoordinate) -> f32 {
        match self.metric {
            DistanceMetric::Spherical => center.distance_to(coordinate),
            DistanceMetric::Planar => center.horizontal_distance_to(coordinate),
        }
    }

    pub fn should_load(&self, center: ChunkCoordinate, coordinate: ChunkCoordinate) -> bool {
        let vertical_ok = match self.metric {
            DistanceMetric::Spherical => true,
            DistanceMetric::Planar => {
                (coordinate.y - center.y).unsigned_abs() <= self.vertical_radius
            }
        };
        vertical_ok && self.distance(center, coordinate) <= self.load_radius
    }

    pub fn should_unload(&self, center: ChunkCoordinate, coordinate: ChunkCoordinate) -> bool {
        let vertical_out = match self.metric {
            DistanceMetric::Spherical => false,
            DistanceMetric::Planar => {
                (coordinate.y - center.y).unsigned_abs() > self.vertical_radius + 1
            }
        };
        vertical_out || self.distance(center, coordinate) > self.unload_radius
    }

    /// Every coordinate within the load region, with its distance.
    pub fn desired_coordinates(&self, center: ChunkCoordinate) -> Vec<(ChunkCoordinate, f32)> {
        let reach = self.load_radius.floor() as i32;
        let vertical_reach = match self.metric {
            DistanceMetric::Spherical => reach,
            DistanceMetric::Planar => self.vertical_radius as i32,
        };

        let mut desired = Vec::new();
        for dy in -vertical_reach..=vertical_reach {
            for dz in -reach..=reach {
                for dx in -reach..=reach {
                    let coordinate = center.offset(dx, dy, dz);
                    if self.should_load(center, coordinate) {
                        desired.push((coordinate, self.distance(center, coordinate)));
                    }
                }
            }
        }
        desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spherical(load: f32, unload: f32) -> StreamingRegion {
        StreamingRegion {
            metric: DistanceMetric::Spherical,
            load_radius: load,
            unload_radius: unload,
            vertical_radius: 0,
        }
    }

    #[test]
    fn spherical_radius_two_has_33_chunks() {
        let desired = spherical(2.0, 3.0).desired_coordinates(ChunkCoordinate::ZERO);
        assert_eq!(desired.len(), 33);
        assert!(desired.iter().all(|(_, distance)| *distance <= 2.0));
    }

    #[test]
    fn desired_set_follows_center() {
        let center = ChunkCoordinate::new(10, -4, 7);
        let desired = spherical(1.0, 2.0).desired_coordinates(center);

        assert_eq!(desired.len(), 7);
        assert!(desired.contains(&(center, 0.0)));
        assert!(desired.contains(&(center.offset(0, -1, 0), 1.0)));
    }

    #[test]
    fn hysteresis_band_keeps_chunks() {
        let region = spherical(2.0, 3.0);
        let chunk = ChunkCoordinate::new(2, 1, 1);

        assert!(!region.should_load(ChunkCoordinate::ZERO, chunk));
        assert!(!region.should_unload(ChunkCoordinate::ZERO, chunk));
        assert!(region.should_unload(ChunkCoordinate::new(-1, 0, 0), chunk));
    }

    #[test]
    fn planar_region_bounds_vertical_axis() {
        let region = StreamingRegion {
            metric: DistanceMetric::Planar,
            load_radius: 1.0,
            unload_radius: 2.0,
            vertical_radius: 1,
        };
        let center = ChunkCoordinate::ZERO;

        assert_eq!(region.desired_coordinates(center).len(), 15);
        assert!(region.should_load(center, ChunkCoordinate::new(0, 1, 1)));
        assert!(!region.should_load(center, ChunkCoordinate::new(0, 2, 0)));
        assert!(!region.should_unload(center, ChunkCoordinate::new(0, 2, 0)));
        assert!(region.should_unload(center, ChunkCoordinate::new(0, 3, 0)));
        assert_eq!(region.distance(center, ChunkCoordinate::new(3, 9, 4)), 5.0);
    }

    #[test]
    fn zero_radius_loads_only_the_center() {
        let desired = spherical(0.0, 1.0).desired_coordinates(ChunkCoordinate::new(1, 1, 1));
        assert_eq!(desired, vec![(ChunkCoordinate::new(1, 1, 1), 0.0)]);
    }
}
