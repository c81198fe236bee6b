//! # Voxel Module
//!
//! Defines the voxel cell type and the dense per-chunk voxel buffer.
//!
//! A chunk's voxels are stored as a flat `Vec<Voxel>` of `chunk_size³` cells in
//! x-fastest order (`x + size * (y + size * z)`), matching the order in which
//! generators fill them.

use num_derive::FromPrimitive;

/// The underlying integer type used to represent voxel types in memory.
pub type VoxelTypeSize = u8;

/// Enumerates all terrain materials a voxel can hold.
///
/// The `FromPrimitive` derive allows conversion from the compact stored integer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, Default)]
pub enum VoxelType {
    /// Empty space.
    #[default]
    AIR,
    /// Soil directly below the surface layer.
    DIRT,
    /// The surface layer above sea level.
    GRASS,
    /// Bedrock below the dirt layer.
    STONE,
    /// Beaches and the sea floor.
    SAND,
    /// Fills empty space below sea level.
    WATER,
}

impl VoxelType {
    /// Converts a stored integer back to a `VoxelType`.
    ///
    /// Unknown values decode as `AIR` so that a corrupted buffer renders as holes rather
    /// than aborting the control thread.
    pub fn from_int(value: VoxelTypeSize) -> Self {
        num::FromPrimitive::from_u8(value).unwrap_or(VoxelType::AIR)
    }

    /// Whether this voxel occupies space for meshing purposes.
    pub fn is_solid(self) -> bool {
        !matches!(self, VoxelType::AIR | VoxelType::WATER)
    }
}

/// A single voxel cell.
///
/// `#[repr(C)]` and `Pod` keep the buffer castable to bytes for upload or hashing.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq, Eq, Default)]
pub struct Voxel {
    /// The voxel type, encoded as a `VoxelTypeSize`.
    pub voxel_type: VoxelTypeSize,
}

impl Voxel {
    /// An empty voxel.
    pub const AIR: Voxel = Voxel { voxel_type: 0 };

    /// Creates a voxel of the given type.
    pub fn new(voxel_type: VoxelType) -> Self {
        Voxel {
            voxel_type: voxel_type as VoxelTypeSize,
        }
    }

    /// Decoded voxel type.
    pub fn kind(self) -> VoxelType {
        VoxelType::from_int(self.voxel_type)
    }

    /// Whether this voxel occupies space for meshing purposes.
    pub fn is_solid(self) -> bool {
        self.kind().is_solid()
    }
}

/// Dense cubic buffer of `size³` voxels, exclusively owned by one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelBuffer {
    size: u32,
    cells: Vec<Voxel>,
}

impl VoxelBuffer {
    /// Allocates a buffer of `size³` air voxels.
    pub fn empty(size: u32) -> Self {
        Self::filled(size, VoxelType::AIR)
    }

    /// Allocates a buffer of `size³` voxels of a single type.
    pub fn filled(size: u32, voxel_type: VoxelType) -> Self {
        VoxelBuffer {
            size,
            cells: vec![Voxel::new(voxel_type); Self::cell_count(size)],
        }
    }

    /// Wraps an existing cell vector.
    ///
    /// Returns `None` when `cells.len() != size³`.
    pub fn from_cells(size: u32, cells: Vec<Voxel>) -> Option<Self> {
        (cells.len() == Self::cell_count(size)).then_some(VoxelBuffer { size, cells })
    }

    /// Number of cells in a buffer with the given edge length.
    pub fn cell_count(size: u32) -> usize {
        let size = size as usize;
        size * size * size
    }

    /// Edge length in voxels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the buffer holds no cells at all (zero-sized).
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of a local position.
    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let size = self.size as usize;
        x as usize + size * (y as usize + size * z as usize)
    }

    /// Reads the voxel at a local position, or `None` when out of bounds.
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<Voxel> {
        if x >= self.size || y >= self.size || z >= self.size {
            return None;
        }
        Some(self.cells[self.index(x, y, z)])
    }

    /// Writes the voxel at a local position. Out-of-bounds writes are ignored and return
    /// `false`.
    pub fn set(&mut self, x: u32, y: u32, z: u32, voxel: Voxel) -> bool {
        if x >= self.size || y >= self.size || z >= self.size {
            return false;
        }
        let index = self.index(x, y, z);
        self.cells[index] = voxel;
        true
    }

    /// Whether a local position holds a solid voxel. Out-of-bounds reads are empty.
    pub fn is_solid(&self, x: u32, y: u32, z: u32) -> bool {
        self.get(x, y, z).is_some_and(Voxel::is_solid)
    }

    /// Whether every cell is air.
    pub fn is_all_air(&self) -> bool {
        self.cells.iter().all(|voxel| *voxel == Voxel::AIR)
    }

    /// Number of solid cells.
    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|voxel| voxel.is_solid()).count()
    }

    /// The raw cells in x-fastest order.
    pub fn cells(&self) -> &[Voxel] {
        &self.cells
    }

    /// The raw cells as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    /// Heap bytes held by the buffer.
    pub fn memory_bytes(&self) -> usize {
        self.cells.capacity() * std::mem::size_of::<Voxel>()
    }
}
