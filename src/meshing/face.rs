//! # Face Directions
//!
//! The six axis-aligned faces of a voxel and the quad geometry each one contributes.

/// The six faces of a voxel.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum FaceDirection {
    /// Facing positive Z.
    FRONT = 0,
    /// Facing negative Z.
    BACK = 1,
    /// Facing negative Y.
    BOTTOM = 2,
    /// Facing positive Y.
    TOP = 3,
    /// Facing negative X.
    LEFT = 4,
    /// Facing positive X.
    RIGHT = 5,
}

impl FaceDirection {
    /// All six faces in a consistent order.
    pub fn all() -> [FaceDirection; 6] {
        [
            FaceDirection::FRONT,
            FaceDirection::BACK,
            FaceDirection::BOTTOM,
            FaceDirection::TOP,
            FaceDirection::LEFT,
            FaceDirection::RIGHT,
        ]
    }

    /// Offset to the neighbouring voxel this face looks at.
    pub fn neighbor_offset(self) -> [i32; 3] {
        match self {
            FaceDirection::FRONT => [0, 0, 1],
            FaceDirection::BACK => [0, 0, -1],
            FaceDirection::BOTTOM => [0, -1, 0],
            FaceDirection::TOP => [0, 1, 0],
            FaceDirection::LEFT => [-1, 0, 0],
            FaceDirection::RIGHT => [1, 0, 0],
        }
    }

    /// Outward unit normal.
    pub fn normal(self) -> [f32; 3] {
        let [x, y, z] = self.neighbor_offset();
        [x as f32, y as f32, z as f32]
    }

    /// Corners of this face on the unit cube at the origin.
    ///
    /// Corners wind counter-clockwise seen from outside the cube, so the triangles
    /// `(0, 1, 2)` and `(0, 2, 3)` face along [`normal`](Self::normal).
    pub fn unit_corners(self) -> [[f32; 3]; 4] {
        match self {
            FaceDirection::FRONT => [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
            FaceDirection::BACK => [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
            FaceDirection::BOTTOM => [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            FaceDirection::TOP => [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
            FaceDirection::LEFT => [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
            FaceDirection::RIGHT => [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]],
        }
    }

    /// Texture coordinates matching [`unit_corners`](Self::unit_corners).
    pub fn unit_uvs() -> [[f32; 2]; 4] {
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    /// Indices of the two triangles of a quad whose first vertex is `base`.
    pub fn quad_indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 2, base, base + 2, base + 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn winding_matches_normal_for_every_face() {
        for face in FaceDirection::all() {
            let corners = face.unit_corners();
            let winding = cross(sub(corners[1], corners[0]), sub(corners[2], corners[0]));
            assert_eq!(winding, face.normal(), "{:?}", face);
        }
    }

    #[test]
    fn quad_indices_offset_by_base() {
        assert_eq!(FaceDirection::quad_indices(4), [4, 5, 6, 4, 6, 7]);
    }
}
