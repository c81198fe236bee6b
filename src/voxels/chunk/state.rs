//! # Chunk Lifecycle State
//!
//! Every chunk moves through a fixed sequence of states:
//!
//! ```text
//! Queued -> Generating -> Generated -> Meshing -> Active <-> CachedInactive -> Evicted
//! ```
//!
//! `Evicted` is terminal. A chunk that is never requested has no state because no
//! `Chunk` exists for it.

use std::fmt;

/// Where a chunk currently is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Created for a load request that has not reached the pipeline yet.
    Queued,
    /// Voxel generation is running.
    Generating,
    /// Voxels are populated; meshing has not started.
    Generated,
    /// Surface extraction is running.
    Meshing,
    /// Meshed, visible and registered as active.
    Active,
    /// Resident in the cache but not visible.
    CachedInactive,
    /// Removed from the cache and its resources released.
    Evicted,
}

impl ChunkState {
    /// Whether the pipeline is still working on the chunk.
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            ChunkState::Queued | ChunkState::Generating | ChunkState::Generated | ChunkState::Meshing
        )
    }

    /// Whether the chunk has completed the pipeline and can be shown.
    pub fn is_resident(self) -> bool {
        matches!(self, ChunkState::Active | ChunkState::CachedInactive)
    }
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChunkState::Queued => "queued",
            ChunkState::Generating => "generating",
            ChunkState::Generated => "generated",
            ChunkState::Meshing => "meshing",
            ChunkState::Active => "active",
            ChunkState::CachedInactive => "cached-inactive",
            ChunkState::Evicted => "evicted",
        };
        f.write_str(name)
    }
}

/// Opaque handle to a render or collision object a host attached to a chunk.
///
/// The streaming engine never interprets the value. It hands it back in
/// [`StreamingEvent::ChunkEvicted`](crate::streaming::StreamingEvent::ChunkEvicted) so the
/// host can tear the object down.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresentationId(pub u64);

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "presentation#{}", self.0)
    }
}
