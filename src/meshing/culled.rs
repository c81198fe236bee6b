//! Face-culling mesher.
//!
//! Emits one quad for every solid voxel face whose neighbour is empty. Neighbour lookups
//! use a solidity bit vector padded by one voxel on every side, so boundary voxels never
//! need bounds checks: the padding is always empty, which means chunk borders are closed.

use bitvec::prelude::BitVec;
use log::trace;
use phf::phf_map;
use web_time::Instant;

use super::{ChunkGeometry, FaceDirection, SurfaceMesher, Vertex};
use crate::streaming::CollaboratorError;
use crate::voxels::{VoxelBuffer, VoxelType};

/// Linear RGBA color per voxel type, keyed by the stored type integer.
static VOXEL_COLORS: phf::Map<u8, [f32; 4]> = phf_map! {
    1u8 => [0.45, 0.32, 0.20, 1.0], // DIRT
    2u8 => [0.30, 0.62, 0.22, 1.0], // GRASS
    3u8 => [0.50, 0.50, 0.52, 1.0], // STONE
    4u8 => [0.86, 0.80, 0.55, 1.0], // SAND
    5u8 => [0.20, 0.35, 0.80, 0.6], // WATER
};

const UNKNOWN_COLOR: [f32; 4] = [1.0, 0.0, 1.0, 1.0];

/// Reference [`SurfaceMesher`] producing culled, non-merged quads.
#[derive(Clone, Debug)]
pub struct CulledFaceMesher {
    voxel_scale: f32,
}

impl CulledFaceMesher {
    /// Creates a mesher emitting positions scaled by `voxel_scale` world units per voxel.
    pub fn new(voxel_scale: f32) -> Self {
        CulledFaceMesher { voxel_scale }
    }

    /// Color of a voxel type.
    pub fn color_of(voxel_type: VoxelType) -> [f32; 4] {
        VOXEL_COLORS
            .get(&(voxel_type as u8))
            .copied()
            .unwrap_or(UNKNOWN_COLOR)
    }
}

impl Default for CulledFaceMesher {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Solidity of a chunk padded by one empty voxel on every side.
struct PaddedSolidMask {
    bits: BitVec,
    wrapped: usize,
}

impl PaddedSolidMask {
    fn build(voxels: &VoxelBuffer) -> Self {
        let size = voxels.size() as usize;
        let wrapped = size + 2;
        let mut bits = BitVec::repeat(false, wrapped * wrapped * wrapped);

        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    if voxels.is_solid(x as u32, y as u32, z as u32) {
                        bits.set(Self::index_in(wrapped, x + 1, y + 1, z + 1), true);
                    }
                }
            }
        }

        PaddedSolidMask { bits, wrapped }
    }

    #[inline]
    fn index_in(wrapped: usize, x: usize, y: usize, z: usize) -> usize {
        x + wrapped * (y + wrapped * z)
    }

    /// Solidity at an unpadded local position displaced by `offset`.
    #[inline]
    fn is_solid(&self, x: u32, y: u32, z: u32, offset: [i32; 3]) -> bool {
        let px = (x as i32 + 1 + offset[0]) as usize;
        let py = (y as i32 + 1 + offset[1]) as usize;
        let pz = (z as i32 + 1 + offset[2]) as usize;
        self.bits[Self::index_in(self.wrapped, px, py, pz)]
    }
}

impl SurfaceMesher for CulledFaceMesher {
    fn build_surface(
        &self,
        voxels: &VoxelBuffer,
        chunk_size: u32,
    ) -> Result<ChunkGeometry, CollaboratorError> {
        if voxels.size() != chunk_size {
            return Err(format!(
                "voxel buffer edge {} does not match chunk size {}",
                voxels.size(),
                chunk_size
            )
            .into());
        }

        if voxels.solid_count() == 0 {
            return Ok(ChunkGeometry::empty());
        }

        let start = Instant::now();
        let mask = PaddedSolidMask::build(voxels);
        let mut geometry = ChunkGeometry::empty();

        for z in 0..chunk_size {
            for y in 0..chunk_size {
                for x in 0..chunk_size {
                    let Some(voxel) = voxels.get(x, y, z) else {
                        continue;
                    };
                    if !voxel.is_solid() {
                        continue;
                    }

                    let color = Self::color_of(voxel.kind());
                    for face in FaceDirection::all() {
                        if mask.is_solid(x, y, z, face.neighbor_offset()) {
                            continue;
                        }

                        let base = geometry.vertices.len() as u32;
                        for (corner, uv) in face.unit_corners().iter().zip(FaceDirection::unit_uvs()) {
                            geometry.vertices.push(Vertex::new(
                                [
                                    (x as f32 + corner[0]) * self.voxel_scale,
                                    (y as f32 + corner[1]) * self.voxel_scale,
                                    (z as f32 + corner[2]) * self.voxel_scale,
                                ],
                                face.normal(),
                                uv,
                                color,
                                voxel.voxel_type as u32,
                            ));
                        }
                        geometry.indices.extend_from_slice(&FaceDirection::quad_indices(base));
                    }
                }
            }
        }

        trace!(
            "Culled mesh: {} triangles in {:?}",
            geometry.triangle_count(),
            start.elapsed()
        );

        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::Voxel;

    #[test]
    fn empty_buffer_produces_empty_geometry() {
        let geometry = CulledFaceMesher::default()
            .build_surface(&VoxelBuffer::empty(8), 8)
            .unwrap();
        assert!(geometry.is_empty());
        assert_eq!(geometry.vertex_count(), 0);
    }

    #[test]
    fn single_voxel_has_six_faces() {
        let mut voxels = VoxelBuffer::empty(4);
        voxels.set(1, 1, 1, Voxel::new(VoxelType::STONE));

        let geometry = CulledFaceMesher::default().build_surface(&voxels, 4).unwrap();

        assert_eq!(geometry.vertex_count(), 24);
        assert_eq!(geometry.triangle_count(), 12);
        assert!(geometry.is_well_formed());
        assert!(geometry.vertices.iter().all(|v| v.material == VoxelType::STONE as u32));
    }

    #[test]
    fn shared_face_between_neighbours_is_culled() {
        let mut voxels = VoxelBuffer::empty(4);
        voxels.set(0, 0, 0, Voxel::new(VoxelType::DIRT));
        voxels.set(1, 0, 0, Voxel::new(VoxelType::DIRT));

        let geometry = CulledFaceMesher::default().build_surface(&voxels, 4).unwrap();

        assert_eq!(geometry.vertex_count(), 10 * 4);
        assert_eq!(geometry.indices.len(), 10 * 6);
    }

    #[test]
    fn full_chunk_only_emits_outer_shell() {
        let voxels = VoxelBuffer::filled(3, VoxelType::STONE);

        let geometry = CulledFaceMesher::default().build_surface(&voxels, 3).unwrap();

        assert_eq!(geometry.vertex_count(), 6 * 9 * 4);
    }

    #[test]
    fn water_is_not_meshed() {
        let voxels = VoxelBuffer::filled(2, VoxelType::WATER);
        let geometry = CulledFaceMesher::default().build_surface(&voxels, 2).unwrap();
        assert!(geometry.is_empty());
    }

    #[test]
    fn voxel_scale_scales_positions() {
        let mut voxels = VoxelBuffer::empty(2);
        voxels.set(1, 1, 1, Voxel::new(VoxelType::GRASS));

        let geometry = CulledFaceMesher::new(0.5).build_surface(&voxels, 2).unwrap();

        let max = geometry
            .vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        assert_eq!(max, 1.0);
        assert_eq!(geometry.vertices[0].color, CulledFaceMesher::color_of(VoxelType::GRASS));
    }

    #[test]
    fn mismatched_size_is_an_error() {
        assert!(CulledFaceMesher::default()
            .build_surface(&VoxelBuffer::empty(2), 4)
            .is_err());
    }
}
