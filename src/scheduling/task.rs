//! # Task System Core Traits
//!
//! A [`Task`] is one pipeline stage for one chunk. It owns all the data it needs, runs on a
//! worker thread (or inline on the control thread when no workers are configured) and
//! produces a [`TaskOutcome`] that the control thread collects.
//!
//! ## Task Lifecycle
//! 1. A task is created by the [`ChunkPipeline`](crate::pipeline::ChunkPipeline) and
//!    published via [`TaskManager::publish_task`](super::TaskManager::publish_task)
//! 2. The task's `process()` runs on a worker, wrapped by [`run_isolated`]
//! 3. The outcome is returned by
//!    [`TaskManager::process_completed_tasks`](super::TaskManager::process_completed_tasks)
//! 4. The controller applies the outcome and may publish the next stage

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::pipeline::{PipelineStage, TaskOutcome};
use crate::streaming::PipelineError;
use crate::voxels::ChunkCoordinate;

/// Identifies one issued load. Outcomes carrying a ticket that no longer matches the
/// chunk in flight are stale and ignored.
pub type LoadTicket = u64;

/// A unit of pipeline work.
///
/// # Implementation Guidelines
/// - Must be `Send` to be transferred to a worker
/// - Should own its inputs instead of borrowing shared state
/// - Must report failures through the outcome rather than panicking
pub trait Task: Send {
    /// The chunk this task works on.
    fn coordinate(&self) -> ChunkCoordinate;

    /// The load this task belongs to.
    fn ticket(&self) -> LoadTicket;

    fn stage(&self) -> PipelineStage;

    /// Performs the work, consuming the task.
    fn process(self: Box<Self>) -> TaskOutcome;
}

/// Processes a task, converting a panic into a failed outcome for that chunk only.
pub fn run_isolated(task: Box<dyn Task>) -> TaskOutcome {
    let coordinate = task.coordinate();
    let ticket = task.ticket();
    let stage = task.stage();

    match panic::catch_unwind(AssertUnwindSafe(move || task.process())) {
        Ok(outcome) => outcome,
        Err(payload) => TaskOutcome {
            coordinate,
            ticket,
            stage,
            result: Err(PipelineError::Panicked {
                coordinate,
                stage,
                message: panic_message(payload.as_ref()),
            }),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
