//! # Meshing Task
//!
//! Extracts the surface of one generated chunk off the control thread. The task owns the
//! chunk's voxel buffer while it runs and returns it with the geometry.

use std::sync::Arc;

use log::trace;

use super::{PipelineStage, StageOutput, TaskOutcome};
use crate::meshing::SurfaceMesher;
use crate::scheduling::{LoadTicket, Task};
use crate::streaming::PipelineError;
use crate::voxels::{ChunkCoordinate, VoxelBuffer};

pub struct MeshingTask {
    mesher: Arc<dyn SurfaceMesher>,
    coordinate: ChunkCoordinate,
    ticket: LoadTicket,
    chunk_size: u32,
    voxels: VoxelBuffer,
}

impl MeshingTask {
    pub fn new(
        mesher: Arc<dyn SurfaceMesher>,
        coordinate: ChunkCoordinate,
        ticket: LoadTicket,
        chunk_size: u32,
        voxels: VoxelBuffer,
    ) -> Self {
        MeshingTask {
            mesher,
            coordinate,
            ticket,
            chunk_size,
            voxels,
        }
    }
}

impl Task for MeshingTask {
    fn coordinate(&self) -> ChunkCoordinate {
        self.coordinate
    }

    fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Meshing
    }

    fn process(self: Box<Self>) -> TaskOutcome {
        let MeshingTask {
            mesher,
            coordinate,
            ticket,
            chunk_size,
            voxels,
        } = *self;

        let result = match mesher.build_surface(&voxels, chunk_size) {
            Ok(geometry) if !geometry.is_well_formed() => {
                Err(PipelineError::MalformedGeometry { coordinate })
            }
            Ok(geometry) => {
                trace!("Meshed chunk {} ({} triangles)", coordinate, geometry.triangle_count());
                Ok(StageOutput::Meshed { voxels, geometry })
            }
            Err(source) => Err(PipelineError::Meshing { coordinate, source }),
        };

        TaskOutcome {
            coordinate,
            ticket,
            stage: PipelineStage::Meshing,
            result,
        }
    }
}
