//! Error types of the streaming engine.
//!
//! * [`ConfigError`]: an invalid [`StreamingConfig`](super::StreamingConfig); fatal at
//!   initialization
//! * [`PipelineError`]: one chunk failed to load; isolated to that chunk
//! * [`StreamingError`]: anything that prevents the controller from starting

use std::io;

use thiserror::Error;

use crate::pipeline::PipelineStage;
use crate::voxels::ChunkCoordinate;

/// Error type returned by external generators and meshers.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// A configuration the controller refuses to start with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("chunk size must be positive")]
    ZeroChunkSize,
    #[error("chunk size {size} exceeds the maximum of {max}")]
    ChunkSizeTooLarge { size: u32, max: u32 },
    #[error("voxel scale must be finite and positive, got {0}")]
    InvalidVoxelScale(f32),
    #[error("load radius must be finite and non-negative, got {0}")]
    InvalidLoadRadius(f32),
    #[error("load radius {radius} exceeds the maximum of {max}")]
    LoadRadiusTooLarge { radius: f32, max: f32 },
    #[error("vertical radius {radius} exceeds the maximum of {max}")]
    VerticalRadiusTooLarge { radius: u32, max: u32 },
    #[error("unload radius {unload} must exceed load radius {load}")]
    UnloadRadiusNotGreater { load: f32, unload: f32 },
    #[error("tick time budget must be finite and non-negative, got {0} ms")]
    InvalidTimeBudget(f64),
    #[error("at least one task per worker must be allowed in flight")]
    ZeroTasksInFlight,
}

/// Why a single chunk failed to load.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generation failed for chunk {coordinate}: {source}")]
    Generation {
        coordinate: ChunkCoordinate,
        #[source]
        source: CollaboratorError,
    },
    #[error("meshing failed for chunk {coordinate}: {source}")]
    Meshing {
        coordinate: ChunkCoordinate,
        #[source]
        source: CollaboratorError,
    },
    #[error("generator produced a buffer of edge {actual} for chunk {coordinate}, expected {expected}")]
    BufferSizeMismatch {
        coordinate: ChunkCoordinate,
        expected: u32,
        actual: u32,
    },
    #[error("mesher produced out-of-range indices for chunk {coordinate}")]
    MalformedGeometry { coordinate: ChunkCoordinate },
    #[error("{stage} task for chunk {coordinate} panicked: {message}")]
    Panicked {
        coordinate: ChunkCoordinate,
        stage: PipelineStage,
        message: String,
    },
}

impl PipelineError {
    /// The chunk the failure belongs to.
    pub fn coordinate(&self) -> ChunkCoordinate {
        match self {
            PipelineError::Generation { coordinate, .. }
            | PipelineError::Meshing { coordinate, .. }
            | PipelineError::BufferSizeMismatch { coordinate, .. }
            | PipelineError::MalformedGeometry { coordinate }
            | PipelineError::Panicked { coordinate, .. } => *coordinate,
        }
    }
}

/// Errors that stop the streaming controller from starting.
#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("invalid streaming configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn chunk worker {index}: {source}")]
    WorkerSpawn {
        index: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}
