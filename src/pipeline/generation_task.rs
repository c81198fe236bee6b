//! # Generation Task
//!
//! Runs the terrain generator for one chunk off the control thread.

use std::sync::Arc;

use log::trace;

use super::{PipelineStage, StageOutput, TaskOutcome};
use crate::scheduling::{LoadTicket, Task};
use crate::streaming::PipelineError;
use crate::voxels::{ChunkCoordinate, TerrainGenerator};

/// Generates the voxel buffer of one chunk.
///
/// The resulting buffer is checked against the configured chunk size before it is handed
/// back, so a misbehaving generator cannot install a buffer of the wrong shape.
pub struct GenerationTask {
    generator: Arc<dyn TerrainGenerator>,
    coordinate: ChunkCoordinate,
    ticket: LoadTicket,
    chunk_size: u32,
}

impl GenerationTask {
    /// Creates a new generation task.
    ///
    /// # Arguments
    /// * `generator` - Shared terrain generator
    /// * `coordinate` - The chunk to generate
    /// * `ticket` - The load this task belongs to
    /// * `chunk_size` - Voxels per axis the buffer must have
    pub fn new(
        generator: Arc<dyn TerrainGenerator>,
        coordinate: ChunkCoordinate,
        ticket: LoadTicket,
        chunk_size: u32,
    ) -> Self {
        GenerationTask {
            generator,
            coordinate,
            ticket,
            chunk_size,
        }
    }
}

impl Task for GenerationTask {
    fn coordinate(&self) -> ChunkCoordinate {
        self.coordinate
    }

    fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Generation
    }

    fn process(self: Box<Self>) -> TaskOutcome {
        let coordinate = self.coordinate;
        let result = self
            .generator
            .generate(coordinate, self.chunk_size)
            .map_err(|source| PipelineError::Generation { coordinate, source })
            .and_then(|voxels| {
                if voxels.size() != self.chunk_size {
                    return Err(PipelineError::BufferSizeMismatch {
                        coordinate,
                        expected: self.chunk_size,
                        actual: voxels.size(),
                    });
                }
                trace!("Generated chunk {} ({} solid voxels)", coordinate, voxels.solid_count());
                Ok(StageOutput::Generated(voxels))
            });

        TaskOutcome {
            coordinate,
            ticket: self.ticket,
            stage: PipelineStage::Generation,
            result,
        }
    }
}
