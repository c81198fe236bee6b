//! # Chunk Pipeline
//!
//! The two stages a chunk passes through before it can be shown:
//!
//! 1. **Generation**: the [`TerrainGenerator`] fills a voxel buffer
//! 2. **Meshing**: the [`SurfaceMesher`] extracts geometry from that buffer
//!
//! Each stage is a [`Task`](crate::scheduling::Task) that owns everything it touches and
//! reports back a [`TaskOutcome`] keyed by coordinate and load ticket. The controller
//! publishes the meshing task only after it has received the generation outcome, so
//! generation strictly precedes meshing for every chunk.

use std::fmt;
use std::sync::Arc;

mod generation_task;
mod meshing_task;

pub use generation_task::GenerationTask;
pub use meshing_task::MeshingTask;

use crate::meshing::{ChunkGeometry, SurfaceMesher};
use crate::scheduling::{LoadTicket, Task};
use crate::streaming::PipelineError;
use crate::voxels::{ChunkCoordinate, TerrainGenerator, VoxelBuffer};

/// A pipeline stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Generation,
    Meshing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Generation => f.write_str("generation"),
            PipelineStage::Meshing => f.write_str("meshing"),
        }
    }
}

/// What a successful stage hands back to the control thread.
#[derive(Debug)]
pub enum StageOutput {
    /// Generated voxels, ready to be installed on the chunk.
    Generated(VoxelBuffer),
    /// The voxel buffer lent to the mesher, returned with its geometry.
    Meshed {
        voxels: VoxelBuffer,
        geometry: ChunkGeometry,
    },
}

/// Result of one stage for one chunk.
#[derive(Debug)]
pub struct TaskOutcome {
    pub coordinate: ChunkCoordinate,
    pub ticket: LoadTicket,
    pub stage: PipelineStage,
    pub result: Result<StageOutput, PipelineError>,
}

/// Builds pipeline tasks around shared collaborator handles.
#[derive(Clone)]
pub struct ChunkPipeline {
    generator: Arc<dyn TerrainGenerator>,
    mesher: Arc<dyn SurfaceMesher>,
    chunk_size: u32,
}

impl ChunkPipeline {
    pub fn new(
        generator: Arc<dyn TerrainGenerator>,
        mesher: Arc<dyn SurfaceMesher>,
        chunk_size: u32,
    ) -> Self {
        ChunkPipeline {
            generator,
            mesher,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn generator(&self) -> &Arc<dyn TerrainGenerator> {
        &self.generator
    }

    /// Task generating the voxels of `coordinate`.
    pub fn generation_task(&self, coordinate: ChunkCoordinate, ticket: LoadTicket) -> Box<dyn Task> {
        Box::new(GenerationTask::new(
            Arc::clone(&self.generator),
            coordinate,
            ticket,
            self.chunk_size,
        ))
    }

    /// Task meshing the generated `voxels` of `coordinate`.
    pub fn meshing_task(
        &self,
        coordinate: ChunkCoordinate,
        ticket: LoadTicket,
        voxels: VoxelBuffer,
    ) -> Box<dyn Task> {
        Box::new(MeshingTask::new(
            Arc::clone(&self.mesher),
            coordinate,
            ticket,
            self.chunk_size,
            voxels,
        ))
    }
}

impl fmt::Debug for ChunkPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPipeline")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::CulledFaceMesher;
    use crate::streaming::CollaboratorError;
    use crate::voxels::{NoiseTerrainGenerator, VoxelType};

    struct WrongSizeGenerator;

    impl TerrainGenerator for WrongSizeGenerator {
        fn generate(&self, _: ChunkCoordinate, chunk_size: u32) -> Result<VoxelBuffer, CollaboratorError> {
            Ok(VoxelBuffer::empty(chunk_size + 1))
        }

        fn voxel_at(&self, _: i32, _: i32, _: i32) -> VoxelType {
            VoxelType::AIR
        }
    }

    struct PanickingMesher;

    impl SurfaceMesher for PanickingMesher {
        fn build_surface(&self, _: &VoxelBuffer, _: u32) -> Result<ChunkGeometry, CollaboratorError> {
            panic!("mesher bug");
        }
    }

    struct BrokenIndexMesher;

    impl SurfaceMesher for BrokenIndexMesher {
        fn build_surface(&self, _: &VoxelBuffer, _: u32) -> Result<ChunkGeometry, CollaboratorError> {
            Ok(ChunkGeometry {
                vertices: Vec::new(),
                indices: vec![0, 1, 2],
            })
        }
    }

    fn reference_pipeline() -> ChunkPipeline {
        ChunkPipeline::new(
            Arc::new(NoiseTerrainGenerator::with_seed(1)),
            Arc::new(CulledFaceMesher::default()),
            8,
        )
    }

    #[test]
    fn generation_then_meshing() {
        let pipeline = reference_pipeline();
        let coordinate = ChunkCoordinate::new(0, 0, 0);

        let generated = pipeline.generation_task(coordinate, 3).process();
        assert_eq!(generated.stage, PipelineStage::Generation);
        assert_eq!(generated.ticket, 3);
        let Ok(StageOutput::Generated(voxels)) = generated.result else {
            panic!("generation failed");
        };
        assert_eq!(voxels.size(), 8);

        let meshed = pipeline.meshing_task(coordinate, 3, voxels).process();
        assert_eq!(meshed.stage, PipelineStage::Meshing);
        let Ok(StageOutput::Meshed { voxels, geometry }) = meshed.result else {
            panic!("meshing failed");
        };
        assert_eq!(voxels.size(), 8);
        assert!(geometry.is_well_formed());
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        let pipeline = ChunkPipeline::new(
            Arc::new(WrongSizeGenerator),
            Arc::new(CulledFaceMesher::default()),
            4,
        );

        let outcome = pipeline.generation_task(ChunkCoordinate::ZERO, 1).process();
        assert!(matches!(
            outcome.result,
            Err(PipelineError::BufferSizeMismatch {
                expected: 4,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn malformed_geometry_is_rejected() {
        let pipeline = ChunkPipeline::new(
            Arc::new(NoiseTerrainGenerator::default()),
            Arc::new(BrokenIndexMesher),
            2,
        );

        let outcome = pipeline
            .meshing_task(ChunkCoordinate::ZERO, 1, VoxelBuffer::empty(2))
            .process();
        assert!(matches!(
            outcome.result,
            Err(PipelineError::MalformedGeometry { .. })
        ));
    }

    #[test]
    fn panics_are_contained_by_run_isolated() {
        let pipeline = ChunkPipeline::new(
            Arc::new(NoiseTerrainGenerator::default()),
            Arc::new(PanickingMesher),
            2,
        );

        let task = pipeline.meshing_task(ChunkCoordinate::new(4, 0, 0), 9, VoxelBuffer::empty(2));
        let outcome = crate::scheduling::run_isolated(task);

        assert_eq!(outcome.coordinate, ChunkCoordinate::new(4, 0, 0));
        assert_eq!(outcome.ticket, 9);
        match outcome.result {
            Err(PipelineError::Panicked { stage, message, .. }) => {
                assert_eq!(stage, PipelineStage::Meshing);
                assert_eq!(message, "mesher bug");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
