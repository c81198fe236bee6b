//! Terrain generation contract.
//!
//! The streaming engine treats terrain generation as an external collaborator. Anything
//! implementing [`TerrainGenerator`] can be handed to
//! [`StreamingController::initialize`](crate::streaming::StreamingController::initialize).

mod noise_generator;

pub use noise_generator::{NoiseGeneratorSettings, NoiseTerrainGenerator};

use super::{ChunkCoordinate, VoxelBuffer, VoxelType};
use crate::streaming::CollaboratorError;

/// Produces voxel contents for chunks.
///
/// Implementations must be deterministic for a fixed seed and coordinate, and safe to call
/// from worker threads.
pub trait TerrainGenerator: Send + Sync {
    /// Generates the `chunk_size³` voxels of one chunk, x-fastest.
    fn generate(
        &self,
        coordinate: ChunkCoordinate,
        chunk_size: u32,
    ) -> Result<VoxelBuffer, CollaboratorError>;

    /// Voxel type at a global voxel index without generating the whole chunk.
    fn voxel_at(&self, world_x: i32, world_y: i32, world_z: i32) -> VoxelType;
}
