//! # Chunk Coordinates
//!
//! Pure conversions between the three coordinate spaces the streaming engine deals with:
//!
//! * **World space**: continuous `f32` positions, as used by the observer and renderers
//! * **Voxel space**: integer voxel indices, `floor(world / voxel_scale)`
//! * **Chunk space**: integer chunk indices, `floor(voxel / chunk_size)`, plus the local
//!   voxel index inside a chunk (`0..chunk_size` on each axis)
//!
//! All conversions floor towards negative infinity so that `-0.5` lands in chunk `-1`
//! rather than chunk `0`.

use std::fmt;
use std::ops::{Add, Sub};

use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Identifies a chunk on the infinite chunk grid.
///
/// Equality and hashing are component-wise. The type is `Copy` and immutable; arithmetic
/// produces new coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChunkCoordinate {
    /// X index on the chunk grid.
    pub x: i32,
    /// Y index on the chunk grid.
    pub y: i32,
    /// Z index on the chunk grid.
    pub z: i32,
}

impl ChunkCoordinate {
    /// The chunk containing the world origin.
    pub const ZERO: ChunkCoordinate = ChunkCoordinate { x: 0, y: 0, z: 0 };

    /// Creates a new chunk coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkCoordinate { x, y, z }
    }

    /// Returns the coordinate displaced by the given offset in chunks.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        ChunkCoordinate::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Chunk containing the given world-space position.
    ///
    /// # Arguments
    /// * `world` - Position in world units
    /// * `chunk_size` - Voxels per chunk axis
    /// * `voxel_scale` - World units per voxel
    pub fn from_world(world: Point3<f32>, chunk_size: u32, voxel_scale: f32) -> Self {
        let chunk_extent = chunk_size as f32 * voxel_scale;
        ChunkCoordinate::new(
            (world.x / chunk_extent).floor() as i32,
            (world.y / chunk_extent).floor() as i32,
            (world.z / chunk_extent).floor() as i32,
        )
    }

    /// Chunk containing the given voxel index.
    pub fn from_voxel(voxel: Point3<i32>, chunk_size: u32) -> Self {
        let size = chunk_size as i32;
        ChunkCoordinate::new(
            voxel.x.div_euclid(size),
            voxel.y.div_euclid(size),
            voxel.z.div_euclid(size),
        )
    }

    /// Position of a voxel inside its chunk, each component in `0..chunk_size`.
    pub fn voxel_to_local(voxel: Point3<i32>, chunk_size: u32) -> [u32; 3] {
        let size = chunk_size as i32;
        [
            voxel.x.rem_euclid(size) as u32,
            voxel.y.rem_euclid(size) as u32,
            voxel.z.rem_euclid(size) as u32,
        ]
    }

    /// Voxel index containing the given world-space position.
    pub fn world_to_voxel(world: Point3<f32>, voxel_scale: f32) -> Point3<i32> {
        Point3::new(
            (world.x / voxel_scale).floor() as i32,
            (world.y / voxel_scale).floor() as i32,
            (world.z / voxel_scale).floor() as i32,
        )
    }

    /// Voxel index of this chunk's minimum corner.
    pub fn origin_voxel(self, chunk_size: u32) -> Point3<i32> {
        let size = chunk_size as i32;
        Point3::new(self.x * size, self.y * size, self.z * size)
    }

    /// Converts a local voxel position inside this chunk to a global voxel index.
    pub fn local_to_voxel(self, local: [u32; 3], chunk_size: u32) -> Point3<i32> {
        let origin = self.origin_voxel(chunk_size);
        Point3::new(
            origin.x + local[0] as i32,
            origin.y + local[1] as i32,
            origin.z + local[2] as i32,
        )
    }

    /// World-space position of this chunk's minimum corner.
    pub fn origin_world(self, chunk_size: u32, voxel_scale: f32) -> Point3<f32> {
        let extent = chunk_size as f32 * voxel_scale;
        Point3::new(
            self.x as f32 * extent,
            self.y as f32 * extent,
            self.z as f32 * extent,
        )
    }

    /// World-space position of this chunk's center.
    pub fn center_world(self, chunk_size: u32, voxel_scale: f32) -> Point3<f32> {
        let half = chunk_size as f32 * voxel_scale * 0.5;
        let origin = self.origin_world(chunk_size, voxel_scale);
        Point3::new(origin.x + half, origin.y + half, origin.z + half)
    }

    /// Chunk center expressed in chunk units (`coordinate + 0.5`).
    pub fn center_in_chunks(self) -> Point3<f32> {
        Point3::new(
            self.x as f32 + 0.5,
            self.y as f32 + 0.5,
            self.z as f32 + 0.5,
        )
    }

    /// Euclidean distance to another coordinate, in chunks.
    pub fn distance_to(self, other: ChunkCoordinate) -> f32 {
        let delta = self - other;
        ((delta.x * delta.x + delta.y * delta.y + delta.z * delta.z) as f32).sqrt()
    }

    /// Euclidean distance to another coordinate ignoring the vertical axis, in chunks.
    pub fn horizontal_distance_to(self, other: ChunkCoordinate) -> f32 {
        let delta = self - other;
        ((delta.x * delta.x + delta.z * delta.z) as f32).sqrt()
    }

    /// A hash of the coordinate that is stable across runs and platforms.
    ///
    /// `std`'s default hasher is randomly seeded per process, so it cannot be used where
    /// ordering has to be reproducible. This mixes the three components with large odd
    /// multipliers and a final avalanche step.
    pub fn stable_hash(self) -> u64 {
        let mut hash = (self.x as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        hash ^= (self.y as u32 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        hash ^= (self.z as u32 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
        hash ^= hash >> 33;
        hash = hash.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        hash ^= hash >> 33;
        hash
    }
}

impl Add<Vector3<i32>> for ChunkCoordinate {
    type Output = ChunkCoordinate;

    fn add(self, offset: Vector3<i32>) -> ChunkCoordinate {
        self.offset(offset.x, offset.y, offset.z)
    }
}

impl Sub for ChunkCoordinate {
    type Output = Vector3<i32>;

    fn sub(self, other: ChunkCoordinate) -> Vector3<i32> {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl From<Point3<i32>> for ChunkCoordinate {
    fn from(point: Point3<i32>) -> Self {
        ChunkCoordinate::new(point.x, point.y, point.z)
    }
}

impl From<ChunkCoordinate> for Point3<i32> {
    fn from(coordinate: ChunkCoordinate) -> Self {
        Point3::new(coordinate.x, coordinate.y, coordinate.z)
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
