//! # Noise Terrain Generator
//!
//! A seeded 2D Perlin heightmap with layered materials:
//!
//! * the column surface voxel is grass, or sand when at or below sea level
//! * the `dirt_depth` voxels under the surface are dirt (sand under a beach)
//! * everything deeper is stone
//! * empty space at or below sea level is water
//!
//! [`NoiseTerrainGenerator::voxel_at`] evaluates the same column function as
//! [`NoiseTerrainGenerator::generate`], so point queries always agree with generated chunks.

use std::fs;
use std::path::Path;

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::TerrainGenerator;
use crate::streaming::{CollaboratorError, StreamingError};
use crate::voxels::{ChunkCoordinate, Voxel, VoxelBuffer, VoxelType};

/// Tunables for [`NoiseTerrainGenerator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGeneratorSettings {
    /// Perlin permutation seed.
    pub seed: u32,
    /// Horizontal sampling frequency, in cycles per voxel.
    pub frequency: f64,
    /// Mean surface height in voxels.
    pub base_height: f64,
    /// Maximum deviation from `base_height`, in voxels.
    pub height_amplitude: f64,
    /// Voxel height up to which empty space is water.
    pub sea_level: i32,
    /// Thickness of the dirt layer under the surface.
    pub dirt_depth: i32,
}

impl Default for NoiseGeneratorSettings {
    fn default() -> Self {
        NoiseGeneratorSettings {
            seed: 0,
            frequency: 0.02,
            base_height: 8.0,
            height_amplitude: 12.0,
            sea_level: 2,
            dirt_depth: 3,
        }
    }
}

impl NoiseGeneratorSettings {
    /// Parses settings from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, StreamingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StreamingError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Reference [`TerrainGenerator`] backed by Perlin noise.
#[derive(Clone)]
pub struct NoiseTerrainGenerator {
    settings: NoiseGeneratorSettings,
    perlin: Perlin,
}

impl NoiseTerrainGenerator {
    pub fn new(settings: NoiseGeneratorSettings) -> Self {
        let perlin = Perlin::new(settings.seed);
        NoiseTerrainGenerator { settings, perlin }
    }

    /// Generator with default settings and the given seed.
    pub fn with_seed(seed: u32) -> Self {
        Self::new(NoiseGeneratorSettings {
            seed,
            ..NoiseGeneratorSettings::default()
        })
    }

    pub fn settings(&self) -> &NoiseGeneratorSettings {
        &self.settings
    }

    /// Surface height of the column at a global voxel `(x, z)`.
    pub fn surface_height(&self, world_x: i32, world_z: i32) -> i32 {
        let sample = self.perlin.get([
            world_x as f64 * self.settings.frequency,
            world_z as f64 * self.settings.frequency,
        ]);
        (self.settings.base_height + sample * self.settings.height_amplitude).floor() as i32
    }

    /// Material at height `world_y` in a column whose surface is at `surface`.
    fn classify(&self, world_y: i32, surface: i32) -> VoxelType {
        let sea_level = self.settings.sea_level;
        let beach = surface <= sea_level;

        if world_y > surface {
            if world_y <= sea_level {
                VoxelType::WATER
            } else {
                VoxelType::AIR
            }
        } else if world_y == surface {
            if beach {
                VoxelType::SAND
            } else {
                VoxelType::GRASS
            }
        } else if world_y > surface - self.settings.dirt_depth {
            if beach {
                VoxelType::SAND
            } else {
                VoxelType::DIRT
            }
        } else {
            VoxelType::STONE
        }
    }
}

impl Default for NoiseTerrainGenerator {
    fn default() -> Self {
        Self::new(NoiseGeneratorSettings::default())
    }
}

impl TerrainGenerator for NoiseTerrainGenerator {
    fn generate(
        &self,
        coordinate: ChunkCoordinate,
        chunk_size: u32,
    ) -> Result<VoxelBuffer, CollaboratorError> {
        if chunk_size == 0 {
            return Err("chunk size must be positive".into());
        }

        let size = chunk_size as usize;
        let origin = coordinate.origin_voxel(chunk_size);

        // One height sample per column, reused for every y.
        let mut heights = Vec::with_capacity(size * size);
        for z in 0..size {
            for x in 0..size {
                heights.push(self.surface_height(origin.x + x as i32, origin.z + z as i32));
            }
        }

        let mut cells = Vec::with_capacity(VoxelBuffer::cell_count(chunk_size));
        for z in 0..size {
            for y in 0..size {
                let world_y = origin.y + y as i32;
                for x in 0..size {
                    let surface = heights[x + size * z];
                    cells.push(Voxel::new(self.classify(world_y, surface)));
                }
            }
        }

        VoxelBuffer::from_cells(chunk_size, cells)
            .ok_or_else(|| "generated cell count does not match chunk size".into())
    }

    fn voxel_at(&self, world_x: i32, world_y: i32, world_z: i32) -> VoxelType {
        self.classify(world_y, self.surface_height(world_x, world_z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    #[test]
    fn generation_is_deterministic() {
        let generator = NoiseTerrainGenerator::with_seed(42);
        let coordinate = ChunkCoordinate::new(3, 0, -2);

        let a = generator.generate(coordinate, 8).unwrap();
        let b = NoiseTerrainGenerator::with_seed(42).generate(coordinate, 8).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 512);
    }

    #[test]
    fn voxel_at_agrees_with_generate() {
        let generator = NoiseTerrainGenerator::with_seed(7);
        let coordinate = ChunkCoordinate::new(-1, 0, 2);
        let buffer = generator.generate(coordinate, 8).unwrap();

        for z in 0..8 {
            for y in 0..8 {
                for x in 0..8 {
                    let global = coordinate.local_to_voxel([x, y, z], 8);
                    let expected = generator.voxel_at(global.x, global.y, global.z);
                    assert_eq!(buffer.get(x, y, z).map(Voxel::kind), Some(expected), "{:?}", global);
                }
            }
        }
    }

    #[test]
    fn layers_follow_surface_height() {
        let generator = NoiseTerrainGenerator::new(NoiseGeneratorSettings {
            sea_level: -100,
            ..NoiseGeneratorSettings::default()
        });
        let surface = generator.surface_height(5, 9);

        assert_eq!(generator.voxel_at(5, surface + 1, 9), VoxelType::AIR);
        assert_eq!(generator.voxel_at(5, surface, 9), VoxelType::GRASS);
        assert_eq!(generator.voxel_at(5, surface - 1, 9), VoxelType::DIRT);
        assert_eq!(generator.voxel_at(5, surface - 50, 9), VoxelType::STONE);
    }

    #[test]
    fn water_fills_below_sea_level() {
        let generator = NoiseTerrainGenerator::new(NoiseGeneratorSettings {
            base_height: -20.0,
            height_amplitude: 0.0,
            sea_level: 0,
            ..NoiseGeneratorSettings::default()
        });

        assert_eq!(generator.voxel_at(0, 0, 0), VoxelType::WATER);
        assert_eq!(generator.voxel_at(0, 1, 0), VoxelType::AIR);
        assert_eq!(generator.voxel_at(0, -20, 0), VoxelType::SAND);
    }

    #[test]
    fn high_chunks_are_empty() {
        let generator = NoiseTerrainGenerator::default();
        let buffer = generator.generate(ChunkCoordinate::new(0, 10, 0), 8).unwrap();
        assert!(buffer.is_all_air());

        let origin = ChunkCoordinate::new(0, 10, 0).origin_voxel(8);
        assert_eq!(origin, Point3::new(0, 80, 0));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(NoiseTerrainGenerator::default().generate(ChunkCoordinate::ZERO, 0).is_err());
    }

    #[test]
    fn settings_parse_with_defaults() {
        let settings = NoiseGeneratorSettings::from_json_str(r#"{ "seed": 99 }"#).unwrap();
        assert_eq!(settings.seed, 99);
        assert_eq!(settings.dirt_depth, NoiseGeneratorSettings::default().dirt_depth);
    }
}
