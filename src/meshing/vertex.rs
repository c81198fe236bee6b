//! Vertex data produced by surface extraction.

/// A vertex of extracted chunk geometry.
///
/// Positions are local to the chunk's minimum corner, in world units; consumers translate
/// by [`ChunkCoordinate::origin_world`](crate::voxels::ChunkCoordinate::origin_world).
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Normal: 3x f32 (12 bytes)
/// - UV: 2x f32 (8 bytes)
/// - Color: 4x f32 (16 bytes)
/// - Material: u32 (4 bytes)
///
/// Total size: 52 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position relative to the chunk origin.
    pub position: [f32; 3],
    /// Unit face normal.
    pub normal: [f32; 3],
    /// Texture coordinates, one unit per voxel face.
    pub uv: [f32; 2],
    /// Linear RGBA color of the voxel material.
    pub color: [f32; 4],
    /// Voxel type the face was extracted from.
    pub material: u32,
}

impl Vertex {
    /// Creates a new vertex.
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], color: [f32; 4], material: u32) -> Self {
        Vertex {
            position,
            normal,
            uv,
            color,
            material,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 52);
    }

    #[test]
    fn vertices_cast_to_bytes() {
        let vertices = [Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 1.0], [1.0; 4], 2)];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 52);
    }
}
