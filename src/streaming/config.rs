//! # Streaming Configuration
//!
//! A plain configuration struct, validated once when the controller is initialized.
//! Every field has a default, so partial JSON documents are accepted:
//!
//! ```json
//! { "chunk_size": 32, "load_radius": 6.0, "unload_radius": 8.0 }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, StreamingError};

/// Largest accepted chunk edge in voxels; keeps a chunk's cell count well inside `usize`
/// and its voxel coordinates inside `i32`.
pub const MAX_CHUNK_SIZE: u32 = 256;

/// Largest accepted load radius in chunks.
pub const MAX_LOAD_RADIUS: f32 = 64.0;

/// Largest accepted planar vertical radius in chunks.
pub const MAX_VERTICAL_RADIUS: u32 = 64;

/// How distance from the observer is measured when choosing chunks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance on all three axes.
    #[default]
    Spherical,
    /// Euclidean distance on X/Z; the vertical axis is bounded by `vertical_radius`.
    Planar,
}

/// Options recognized by [`StreamingController`](super::StreamingController).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Voxels per chunk axis.
    pub chunk_size: u32,
    /// World units per voxel.
    pub voxel_scale: f32,
    /// Chunks whose center is within this many chunks of the observer's chunk are loaded.
    pub load_radius: f32,
    /// Active chunks farther than this are deactivated. Must exceed `load_radius`.
    pub unload_radius: f32,
    pub distance_metric: DistanceMetric,
    /// Vertical reach in chunks when `distance_metric` is `planar`.
    pub vertical_radius: u32,
    /// Minimum time between two evaluations of the desired chunk set.
    pub evaluation_interval_ms: u64,
    /// Maximum load requests processed per tick.
    pub max_loads_per_tick: usize,
    /// Maximum wall-clock time the load pass may use per tick.
    pub max_tick_time_ms: f64,
    /// Chunks kept resident, active or not.
    pub cache_capacity: usize,
    /// Pipeline worker threads; 0 runs the pipeline on the calling thread.
    pub worker_threads: usize,
    pub max_tasks_in_flight_per_worker: usize,
    /// Whether activated chunks wait for the host to build collision.
    pub collision_enabled: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            chunk_size: 16,
            voxel_scale: 1.0,
            load_radius: 4.0,
            unload_radius: 6.0,
            distance_metric: DistanceMetric::Spherical,
            vertical_radius: 2,
            evaluation_interval_ms: 100,
            max_loads_per_tick: 8,
            max_tick_time_ms: 4.0,
            cache_capacity: 512,
            worker_threads: 2,
            max_tasks_in_flight_per_worker: 1,
            collision_enabled: false,
        }
    }
}

impl StreamingConfig {
    /// Parses a configuration from JSON. The result is not yet validated.
    pub fn from_json_str(json: &str) -> Result<Self, StreamingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file. The result is not yet validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StreamingError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Rejects configurations the controller cannot run with.
    ///
    /// Settings that only slow streaming down (zero budgets, zero cache capacity) are
    /// accepted with a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSizeTooLarge {
                size: self.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        if !self.voxel_scale.is_finite() || self.voxel_scale <= 0.0 {
            return Err(ConfigError::InvalidVoxelScale(self.voxel_scale));
        }
        if !self.load_radius.is_finite() || self.load_radius < 0.0 {
            return Err(ConfigError::InvalidLoadRadius(self.load_radius));
        }
        if self.load_radius > MAX_LOAD_RADIUS {
            return Err(ConfigError::LoadRadiusTooLarge {
                radius: self.load_radius,
                max: MAX_LOAD_RADIUS,
            });
        }
        if self.distance_metric == DistanceMetric::Planar && self.vertical_radius > MAX_VERTICAL_RADIUS {
            return Err(ConfigError::VerticalRadiusTooLarge {
                radius: self.vertical_radius,
                max: MAX_VERTICAL_RADIUS,
            });
        }
        // NaN fails this comparison too.
        if !(self.unload_radius > self.load_radius) {
            return Err(ConfigError::UnloadRadiusNotGreater {
                load: self.load_radius,
                unload: self.unload_radius,
            });
        }
        if !self.max_tick_time_ms.is_finite() || self.max_tick_time_ms < 0.0 {
            return Err(ConfigError::InvalidTimeBudget(self.max_tick_time_ms));
        }
        if self.worker_threads > 0 && self.max_tasks_in_flight_per_worker == 0 {
            return Err(ConfigError::ZeroTasksInFlight);
        }

        if self.max_loads_per_tick == 0 || self.max_tick_time_ms == 0.0 {
            warn!("Per-tick load budget is zero; no chunks will be loaded");
        }
        if self.cache_capacity == 0 {
            warn!("Cache capacity is zero; every loaded chunk is evicted immediately");
        }

        Ok(())
    }

    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.evaluation_interval_ms)
    }

    pub fn max_tick_time(&self) -> Duration {
        Duration::from_nanos((self.max_tick_time_ms * 1_000_000.0).round() as u64)
    }

    /// Edge length of a chunk in world units.
    pub fn chunk_extent(&self) -> f32 {
        self.chunk_size as f32 * self.voxel_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(StreamingConfig::default().validate(), Ok(()));
    }

    #[test]
    fn unload_radius_must_exceed_load_radius() {
        let config = StreamingConfig {
            load_radius: 4.0,
            unload_radius: 4.0,
            ..StreamingConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnloadRadiusNotGreater {
                load: 4.0,
                unload: 4.0
            })
        );

        let nan = StreamingConfig {
            unload_radius: f32::NAN,
            ..StreamingConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let zero_chunk = StreamingConfig {
            chunk_size: 0,
            ..StreamingConfig::default()
        };
        assert_eq!(zero_chunk.validate(), Err(ConfigError::ZeroChunkSize));

        let negative_scale = StreamingConfig {
            voxel_scale: -1.0,
            ..StreamingConfig::default()
        };
        assert_eq!(
            negative_scale.validate(),
            Err(ConfigError::InvalidVoxelScale(-1.0))
        );

        let no_in_flight = StreamingConfig {
            worker_threads: 2,
            max_tasks_in_flight_per_worker: 0,
            ..StreamingConfig::default()
        };
        assert_eq!(no_in_flight.validate(), Err(ConfigError::ZeroTasksInFlight));
    }

    #[test]
    fn oversized_regions_are_rejected() {
        let huge_chunk = StreamingConfig {
            chunk_size: 1 << 22,
            ..StreamingConfig::default()
        };
        assert_eq!(
            huge_chunk.validate(),
            Err(ConfigError::ChunkSizeTooLarge {
                size: 1 << 22,
                max: MAX_CHUNK_SIZE
            })
        );

        let huge_radius = StreamingConfig {
            load_radius: 1.0e6,
            unload_radius: 2.0e6,
            ..StreamingConfig::default()
        };
        assert_eq!(
            huge_radius.validate(),
            Err(ConfigError::LoadRadiusTooLarge {
                radius: 1.0e6,
                max: MAX_LOAD_RADIUS
            })
        );

        let tall = StreamingConfig {
            distance_metric: DistanceMetric::Planar,
            vertical_radius: u32::MAX,
            ..StreamingConfig::default()
        };
        assert!(matches!(
            tall.validate(),
            Err(ConfigError::VerticalRadiusTooLarge { .. })
        ));

        let at_limits = StreamingConfig {
            chunk_size: MAX_CHUNK_SIZE,
            load_radius: MAX_LOAD_RADIUS,
            unload_radius: MAX_LOAD_RADIUS + 2.0,
            ..StreamingConfig::default()
        };
        assert_eq!(at_limits.validate(), Ok(()));
    }

    #[test]
    fn degraded_settings_are_accepted() {
        let config = StreamingConfig {
            cache_capacity: 0,
            max_loads_per_tick: 0,
            ..StreamingConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = StreamingConfig::from_json_str(
            r#"{ "chunk_size": 32, "distance_metric": "planar", "vertical_radius": 1 }"#,
        )
        .unwrap();

        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.distance_metric, DistanceMetric::Planar);
        assert_eq!(config.vertical_radius, 1);
        assert_eq!(config.load_radius, StreamingConfig::default().load_radius);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            StreamingConfig::from_json_str("{ chunk_size: }"),
            Err(StreamingError::Json(_))
        ));
        assert!(matches!(
            StreamingConfig::from_json_file("/nonexistent/streaming.json"),
            Err(StreamingError::Io(_))
        ));
    }

    #[test]
    fn derived_durations() {
        let config = StreamingConfig {
            evaluation_interval_ms: 250,
            max_tick_time_ms: 2.5,
            ..StreamingConfig::default()
        };
        assert_eq!(config.evaluation_interval(), Duration::from_millis(250));
        assert_eq!(config.max_tick_time(), Duration::from_micros(2500));
    }
}
