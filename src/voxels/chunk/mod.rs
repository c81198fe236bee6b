//! # Chunk Module
//!
//! A [`Chunk`] is the unit of generation, caching and streaming. It exclusively owns its
//! voxel buffer and, once meshed, its geometry.
//!
//! ## Ownership
//!
//! The voxel buffer is allocated when the chunk is created and replaced by the generator's
//! output when generation completes. During meshing the buffer is moved into the meshing
//! task and moved back with the geometry, so no other component ever holds a reference
//! to it.
//!
//! ## Transitions
//!
//! The pipeline-facing methods are crate-private: geometry can only be installed on a
//! chunk whose voxels were generated, and `dirty -> meshed` only happens through
//! [`Chunk::complete_meshing`].

use log::trace;

pub mod state;

pub use state::{ChunkState, PresentationId};

use super::{ChunkCoordinate, VoxelBuffer, VoxelType};
use crate::meshing::ChunkGeometry;
use crate::scheduling::LoadTicket;

/// A fixed-size cube of voxels plus its derived geometry and lifecycle flags.
#[derive(Debug)]
pub struct Chunk {
    coordinate: ChunkCoordinate,
    ticket: LoadTicket,
    chunk_size: u32,
    voxels: Option<VoxelBuffer>,
    geometry: Option<ChunkGeometry>,
    generated: bool,
    meshed: bool,
    dirty: bool,
    has_collision: bool,
    collision_pending: bool,
    active: bool,
    state: ChunkState,
    presentation: Option<PresentationId>,
}

impl Chunk {
    /// Creates a chunk for a newly issued load, eagerly allocating an empty voxel buffer.
    ///
    /// # Arguments
    /// * `coordinate` - Grid position; fixed for the chunk's lifetime
    /// * `ticket` - Identifies the load that created this chunk
    /// * `chunk_size` - Voxels per axis
    pub fn new(coordinate: ChunkCoordinate, ticket: LoadTicket, chunk_size: u32) -> Self {
        Chunk {
            coordinate,
            ticket,
            chunk_size,
            voxels: Some(VoxelBuffer::empty(chunk_size)),
            geometry: None,
            generated: false,
            meshed: false,
            dirty: true,
            has_collision: false,
            collision_pending: false,
            active: false,
            state: ChunkState::Queued,
            presentation: None,
        }
    }

    pub fn coordinate(&self) -> ChunkCoordinate {
        self.coordinate
    }

    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn is_meshed(&self) -> bool {
        self.meshed
    }

    /// Whether the geometry is missing or out of date with the voxels.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_collision(&self) -> bool {
        self.has_collision
    }

    pub fn is_collision_pending(&self) -> bool {
        self.collision_pending
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The voxel buffer, absent while it is lent to the meshing stage or after disposal.
    pub fn voxels(&self) -> Option<&VoxelBuffer> {
        self.voxels.as_ref()
    }

    /// The extracted geometry, present once meshed.
    pub fn geometry(&self) -> Option<&ChunkGeometry> {
        self.geometry.as_ref()
    }

    /// The presentation object attached by the host, if any.
    pub fn presentation(&self) -> Option<PresentationId> {
        self.presentation
    }

    /// Reads a generated voxel at a local position.
    ///
    /// Returns `None` before generation completes, while meshing, or when out of bounds.
    pub fn voxel_at_local(&self, local: [u32; 3]) -> Option<VoxelType> {
        if !self.generated {
            return None;
        }
        self.voxels
            .as_ref()
            .and_then(|voxels| voxels.get(local[0], local[1], local[2]))
            .map(|voxel| voxel.kind())
    }

    /// Heap bytes held by the voxel buffer and geometry.
    pub fn memory_bytes(&self) -> usize {
        self.voxel_bytes() + self.geometry_bytes()
    }

    pub fn voxel_bytes(&self) -> usize {
        self.voxels.as_ref().map_or(0, VoxelBuffer::memory_bytes)
    }

    pub fn geometry_bytes(&self) -> usize {
        self.geometry.as_ref().map_or(0, ChunkGeometry::memory_bytes)
    }

    pub(crate) fn begin_generation(&mut self) {
        self.state = ChunkState::Generating;
    }

    /// Replaces the eagerly allocated buffer with the generator's output.
    pub(crate) fn install_voxels(&mut self, voxels: VoxelBuffer) {
        self.voxels = Some(voxels);
        self.generated = true;
        self.dirty = true;
        self.state = ChunkState::Generated;
    }

    /// Lends the voxel buffer to the meshing stage.
    ///
    /// Returns `None` unless the voxels have been generated, so geometry can never be built
    /// from an unpopulated buffer.
    pub(crate) fn take_voxels_for_meshing(&mut self) -> Option<VoxelBuffer> {
        if !self.generated || self.state == ChunkState::Evicted {
            return None;
        }
        let voxels = self.voxels.take()?;
        self.state = ChunkState::Meshing;
        Some(voxels)
    }

    /// Receives the voxel buffer back from the meshing stage together with its geometry.
    pub(crate) fn complete_meshing(&mut self, voxels: VoxelBuffer, geometry: ChunkGeometry) {
        self.voxels = Some(voxels);
        self.geometry = Some(geometry);
        self.meshed = true;
        self.dirty = false;
        self.state = ChunkState::CachedInactive;
    }

    /// Makes the chunk visible. Returns `false` if it is not meshed or already active.
    pub(crate) fn activate(&mut self, collision_enabled: bool) -> bool {
        if !self.meshed || self.active || self.state == ChunkState::Evicted {
            return false;
        }
        self.active = true;
        self.state = ChunkState::Active;
        if collision_enabled && !self.has_collision {
            self.collision_pending = true;
        }
        trace!("Chunk {} activated", self.coordinate);
        true
    }

    /// Hides the chunk while keeping every resource it owns.
    pub(crate) fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.collision_pending = false;
        self.state = ChunkState::CachedInactive;
        trace!("Chunk {} deactivated", self.coordinate);
        true
    }

    /// Attaches a host presentation object, returning the one it replaces.
    pub(crate) fn attach_presentation(&mut self, presentation: PresentationId) -> Option<PresentationId> {
        self.presentation.replace(presentation)
    }

    /// Records that the host built collision for this chunk.
    pub(crate) fn confirm_collision(&mut self) -> bool {
        if !self.collision_pending {
            return false;
        }
        self.collision_pending = false;
        self.has_collision = true;
        true
    }

    /// Releases the voxel buffer and geometry and returns the presentation handle to tear
    /// down.
    ///
    /// Calling it again is a no-op returning `None`.
    pub(crate) fn dispose(&mut self) -> Option<PresentationId> {
        if self.state == ChunkState::Evicted {
            return None;
        }
        self.voxels = None;
        self.geometry = None;
        self.active = false;
        self.has_collision = false;
        self.collision_pending = false;
        self.state = ChunkState::Evicted;
        trace!("Chunk {} disposed", self.coordinate);
        self.presentation.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::Vertex;
    use crate::voxels::Voxel;

    fn meshed_chunk() -> Chunk {
        let mut chunk = Chunk::new(ChunkCoordinate::new(1, 0, -1), 7, 2);
        chunk.begin_generation();
        chunk.install_voxels(VoxelBuffer::filled(2, VoxelType::STONE));
        let voxels = chunk.take_voxels_for_meshing().unwrap();
        let geometry = ChunkGeometry {
            vertices: vec![Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2], [1.0; 4], 3); 3],
            indices: vec![0, 1, 2],
        };
        chunk.complete_meshing(voxels, geometry);
        chunk
    }

    #[test]
    fn new_chunk_is_dirty_with_eager_buffer() {
        let chunk = Chunk::new(ChunkCoordinate::ZERO, 1, 4);

        assert_eq!(chunk.state(), ChunkState::Queued);
        assert!(chunk.is_dirty());
        assert!(!chunk.is_generated());
        assert!(!chunk.is_meshed());
        assert_eq!(chunk.voxels().map(VoxelBuffer::len), Some(64));
        assert!(chunk.geometry().is_none());
    }

    #[test]
    fn meshing_requires_generated_voxels() {
        let mut chunk = Chunk::new(ChunkCoordinate::ZERO, 1, 4);
        chunk.begin_generation();

        assert!(chunk.take_voxels_for_meshing().is_none());
        assert!(chunk.voxels().is_some());
    }

    #[test]
    fn pipeline_transitions_to_cached_inactive() {
        let chunk = meshed_chunk();

        assert_eq!(chunk.state(), ChunkState::CachedInactive);
        assert!(chunk.is_generated());
        assert!(chunk.is_meshed());
        assert!(!chunk.is_dirty());
        assert_eq!(chunk.voxel_at_local([1, 1, 1]), Some(VoxelType::STONE));
        assert_eq!(chunk.geometry().map(ChunkGeometry::triangle_count), Some(1));
    }

    #[test]
    fn voxels_are_unreadable_while_lent_to_meshing() {
        let mut chunk = Chunk::new(ChunkCoordinate::ZERO, 1, 2);
        let mut voxels = VoxelBuffer::empty(2);
        voxels.set(0, 0, 0, Voxel::new(VoxelType::DIRT));
        chunk.install_voxels(voxels);
        assert_eq!(chunk.voxel_at_local([0, 0, 0]), Some(VoxelType::DIRT));

        let _lent = chunk.take_voxels_for_meshing().unwrap();
        assert_eq!(chunk.state(), ChunkState::Meshing);
        assert_eq!(chunk.voxel_at_local([0, 0, 0]), None);
    }

    #[test]
    fn unmeshed_chunk_cannot_activate() {
        let mut chunk = Chunk::new(ChunkCoordinate::ZERO, 1, 2);
        assert!(!chunk.activate(false));
        assert!(!chunk.is_active());
    }

    #[test]
    fn activation_round_trip_with_collision() {
        let mut chunk = meshed_chunk();

        assert!(chunk.activate(true));
        assert!(!chunk.activate(true));
        assert!(chunk.is_collision_pending());
        assert!(chunk.confirm_collision());
        assert!(chunk.has_collision());
        assert!(!chunk.confirm_collision());

        assert!(chunk.deactivate());
        assert_eq!(chunk.state(), ChunkState::CachedInactive);
        assert!(!chunk.deactivate());

        assert!(chunk.activate(true));
        assert!(!chunk.is_collision_pending());
    }

    #[test]
    fn dispose_releases_everything_once() {
        let mut chunk = meshed_chunk();
        chunk.activate(false);
        assert_eq!(chunk.attach_presentation(PresentationId(9)), None);

        assert_eq!(chunk.dispose(), Some(PresentationId(9)));
        assert_eq!(chunk.state(), ChunkState::Evicted);
        assert!(chunk.voxels().is_none());
        assert!(chunk.geometry().is_none());
        assert!(!chunk.is_active());
        assert_eq!(chunk.memory_bytes(), 0);

        assert_eq!(chunk.dispose(), None);
        assert!(!chunk.activate(false));
    }

    #[test]
    fn states_classify_loading_and_resident() {
        assert!(ChunkState::Meshing.is_loading());
        assert!(!ChunkState::Active.is_loading());
        assert!(ChunkState::CachedInactive.is_resident());
        assert!(!ChunkState::Evicted.is_resident());
        assert_eq!(ChunkState::CachedInactive.to_string(), "cached-inactive");
    }
}
