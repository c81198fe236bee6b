//! Surface extraction contract and reference mesher.
//!
//! The streaming engine does not care how voxels become triangles; it only requires a
//! [`SurfaceMesher`] that turns a generated [`VoxelBuffer`] into [`ChunkGeometry`] and is
//! safe to call from a worker thread.
//!
//! # Architecture
//! - [`SurfaceMesher`]: the contract the pipeline calls during the meshing stage
//! - [`ChunkGeometry`]: vertices and indices owned by a chunk once meshed
//! - [`CulledFaceMesher`]: reference implementation emitting one quad per exposed face
//! - [`FaceDirection`]: the six voxel faces and their quad layout

mod culled;
mod face;
mod vertex;

pub use culled::CulledFaceMesher;
pub use face::FaceDirection;
pub use vertex::Vertex;

use crate::streaming::CollaboratorError;
use crate::voxels::VoxelBuffer;

/// Converts a generated voxel buffer into renderable geometry.
///
/// Implementations run on worker threads and must therefore be `Send + Sync`. They must
/// tolerate an all-empty buffer by returning empty geometry.
pub trait SurfaceMesher: Send + Sync {
    /// Builds the surface of a `chunk_size³` voxel buffer.
    fn build_surface(
        &self,
        voxels: &VoxelBuffer,
        chunk_size: u32,
    ) -> Result<ChunkGeometry, CollaboratorError>;
}

/// Geometry extracted from one chunk.
///
/// Every vertex carries its position, normal, UV, color and material tag; `indices` form
/// a triangle list into `vertices`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkGeometry {
    /// Vertex data.
    pub vertices: Vec<Vertex>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl ChunkGeometry {
    /// Geometry with no triangles.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Heap bytes held by the geometry.
    pub fn memory_bytes(&self) -> usize {
        self.vertices.capacity() * std::mem::size_of::<Vertex>()
            + self.indices.capacity() * std::mem::size_of::<u32>()
    }

    /// Checks that every index refers to an existing vertex and the index count forms whole
    /// triangles.
    pub fn is_well_formed(&self) -> bool {
        let vertex_count = self.vertices.len() as u32;
        self.indices.len() % 3 == 0 && self.indices.iter().all(|&index| index < vertex_count)
    }
}
