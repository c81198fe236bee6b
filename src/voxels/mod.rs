//! # Voxel Data
//!
//! Everything describing what the streamed world is made of.
//!
//! ## Architecture
//!
//! * **Coordinate**: conversions between world, voxel and chunk space
//! * **Voxel**: the typed cell and the dense per-chunk buffer
//! * **Chunk**: the unit of generation, caching and streaming, with its lifecycle
//! * **Generation**: the generator contract and a Perlin reference implementation

pub mod chunk;
pub mod coordinate;
pub mod generation;
pub mod voxel;

pub use chunk::{Chunk, ChunkState, PresentationId};
pub use coordinate::ChunkCoordinate;
pub use generation::{NoiseGeneratorSettings, NoiseTerrainGenerator, TerrainGenerator};
pub use voxel::{Voxel, VoxelBuffer, VoxelType, VoxelTypeSize};
