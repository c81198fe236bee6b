//! Reports the controller hands back to its host.

use std::fmt;

use serde::Serialize;

use crate::cache::CacheStatistics;
use crate::pipeline::PipelineStage;
use crate::voxels::{ChunkCoordinate, PresentationId};

/// Something the host's render or collision consumers must react to.
///
/// Events accumulate inside the controller until
/// [`StreamingController::drain_events`](super::StreamingController::drain_events).
#[derive(Clone, Debug, PartialEq)]
pub enum StreamingEvent {
    /// A meshed chunk became visible.
    ChunkActivated {
        coordinate: ChunkCoordinate,
        /// Whether the chunk was reused from the cache instead of running the pipeline.
        from_cache: bool,
    },
    /// A chunk left the load region; it stays resident in the cache.
    ChunkDeactivated { coordinate: ChunkCoordinate },
    /// A chunk left the cache and its resources were released.
    ///
    /// If the chunk was active this also deactivates it; no separate `ChunkDeactivated`
    /// is recorded.
    ChunkEvicted {
        coordinate: ChunkCoordinate,
        /// The presentation object the host attached, to be torn down.
        presentation: Option<PresentationId>,
    },
    /// Loading a chunk failed; it may be requested again later.
    ChunkLoadFailed {
        coordinate: ChunkCoordinate,
        stage: PipelineStage,
        reason: String,
    },
}

impl StreamingEvent {
    pub fn coordinate(&self) -> ChunkCoordinate {
        match self {
            StreamingEvent::ChunkActivated { coordinate, .. }
            | StreamingEvent::ChunkDeactivated { coordinate }
            | StreamingEvent::ChunkEvicted { coordinate, .. }
            | StreamingEvent::ChunkLoadFailed { coordinate, .. } => *coordinate,
        }
    }
}

/// What one call to [`tick`](super::StreamingController::tick) did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Load requests dequeued by the load pass.
    pub requests_processed: usize,
    /// Requests served by reactivating a cached chunk.
    pub cache_hits: usize,
    /// Requests that started the pipeline.
    pub loads_dispatched: usize,
    pub chunks_activated: usize,
    /// Chunks deactivated by leaving the region or by cache eviction.
    pub chunks_deactivated: usize,
    pub load_failures: usize,
    /// Queued requests dropped because the observer moved away.
    pub requests_cancelled: usize,
    /// Whether the desired chunk set was re-evaluated.
    pub evaluated: bool,
    /// Whether the load pass stopped on the request count limit with work left.
    pub count_budget_reached: bool,
    /// Whether the load pass stopped on the time limit.
    pub time_budget_exceeded: bool,
    /// Requests still queued after the tick.
    pub queue_remaining: usize,
    /// Chunks still in the pipeline after the tick.
    pub in_flight: usize,
    pub elapsed_ms: f64,
}

impl TickReport {
    /// Whether the tick changed anything visible.
    pub fn any_activity(&self) -> bool {
        self.chunks_activated > 0 || self.chunks_deactivated > 0 || self.load_failures > 0
    }

    /// Whether more work is waiting.
    pub fn has_remaining(&self) -> bool {
        self.queue_remaining > 0 || self.in_flight > 0
    }
}

/// Snapshot of the controller's state for overlays and logs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StreamingDebugInfo {
    pub observer_chunk: ChunkCoordinate,
    pub active_chunks: usize,
    pub cached_chunks: usize,
    pub cache_capacity: usize,
    pub queued_requests: usize,
    pub in_flight_loads: usize,
    /// Failed loads since initialization.
    pub failed_loads: u64,
    /// Heap bytes held by voxel buffers of resident and in-flight chunks.
    pub voxel_bytes: usize,
    /// Heap bytes held by geometry of resident chunks.
    pub geometry_bytes: usize,
    pub statistics: CacheStatistics,
}

impl fmt::Display for StreamingDebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observer {} | active {} | cached {}/{} | queued {} | in flight {} | failed {} | voxels {:.1} KiB | geometry {:.1} KiB | {}",
            self.observer_chunk,
            self.active_chunks,
            self.cached_chunks,
            self.cache_capacity,
            self.queued_requests,
            self.in_flight_loads,
            self.failed_loads,
            self.voxel_bytes as f64 / 1024.0,
            self.geometry_bytes as f64 / 1024.0,
            self.statistics
        )
    }
}
