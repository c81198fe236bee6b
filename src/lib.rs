#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streaming
//!
//! Streams voxel terrain chunks around a moving observer: chunks near the observer are
//! generated, meshed and activated; chunks that fall behind are deactivated and kept in a
//! bounded least-recently-used cache so that returning to an area is cheap.
//!
//! ## Key Modules
//!
//! * `streaming` - The per-tick controller, its configuration, events and errors
//! * `scheduling` - The load priority queue and the worker pool running pipeline tasks
//! * `pipeline` - The generation and meshing stages as schedulable tasks
//! * `cache` - The LRU chunk cache with its eviction callback
//! * `voxels` - Coordinates, voxel buffers, chunk records and terrain generation
//! * `meshing` - Surface extraction from voxel buffers
//! * `core` - Shared-state primitives
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cgmath::Point3;
//! use voxel_streaming::meshing::CulledFaceMesher;
//! use voxel_streaming::streaming::{StreamingConfig, StreamingController};
//! use voxel_streaming::voxels::NoiseTerrainGenerator;
//!
//! let mut streaming = StreamingController::initialize(
//!     StreamingConfig::default(),
//!     Arc::new(NoiseTerrainGenerator::with_seed(7)),
//!     Arc::new(CulledFaceMesher::default()),
//! )
//! .unwrap();
//!
//! streaming.set_observer_position(Point3::new(12.0, 20.0, -40.0));
//! let report = streaming.tick(Duration::from_millis(16));
//! for event in streaming.drain_events() {
//!     println!("{:?}", event);
//! }
//! # let _ = report;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cgmath::{InnerSpace, Point3, Vector3};
use log::{debug, info, warn};

pub mod cache;
pub mod core;
pub mod meshing;
pub mod pipeline;
pub mod scheduling;
pub mod streaming;
pub mod voxels;

pub use streaming::{StreamingConfig, StreamingController, StreamingError, StreamingEvent};

use meshing::CulledFaceMesher;
use voxels::{NoiseTerrainGenerator, PresentationId};

/// Frames simulated by [`run`].
pub const DEMO_FRAMES: u32 = 600;

const FRAME_TIME: Duration = Duration::from_millis(16);

/// Installs the logger for the current platform.
///
/// Natively this is `env_logger` writing to stdout and filtered by `RUST_LOG`; on the web
/// it forwards to the browser console. Calling it more than once is harmless.
pub fn init_logging() {
    cfg_if::cfg_if! {
        if #[cfg(target_family = "wasm")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            let _ = console_log::init_with_level(log::Level::Info);
        } else {
            let _ = env_logger::Builder::new()
                .target(env_logger::Target::Stdout)
                .parse_env("RUST_LOG")
                .try_init();
        }
    }
}

/// Flies an observer over procedurally generated terrain without rendering anything.
///
/// The observer drifts in a seeded random walk, the host side of the streaming contract is
/// simulated by attaching a presentation handle to every activated chunk and confirming
/// its collision, and the cache statistics are logged at the end.
///
/// # Arguments
/// * `config_path` - Optional JSON file with [`StreamingConfig`] fields
/// * `seed` - Seeds both the terrain and the walk
pub fn run(config_path: Option<&Path>, seed: u64) -> Result<(), StreamingError> {
    init_logging();

    let config = match config_path {
        Some(path) => {
            info!("Loading streaming config from {}", path.display());
            StreamingConfig::from_json_file(path)?
        }
        None => StreamingConfig::default(),
    };

    let generator = NoiseTerrainGenerator::with_seed(seed as u32);
    let mesher = CulledFaceMesher::new(config.voxel_scale);
    let mut streaming =
        StreamingController::initialize(config, Arc::new(generator), Arc::new(mesher))?;

    let mut rng = fastrand::Rng::with_seed(seed);
    let mut position = Point3::new(0.0f32, 12.0, 0.0);
    let mut heading = Vector3::new(1.0f32, 0.0, 0.0);
    let speed = streaming.config().chunk_extent() * 0.1;
    let mut next_presentation = 0u64;

    for frame in 0..DEMO_FRAMES {
        if frame % 120 == 0 {
            let turned = Vector3::new(rng.f32() - 0.5, 0.0, rng.f32() - 0.5);
            if turned.magnitude2() > f32::EPSILON {
                heading = turned.normalize();
            }
        }
        position += heading * speed;
        streaming.set_observer_position(position);

        let report = streaming.tick(FRAME_TIME);
        if report.evaluated {
            debug!(
                "Frame {}: observer in chunk {}, {} requests queued",
                frame,
                streaming.observer_chunk(),
                report.queue_remaining
            );
        }

        for event in streaming.drain_events() {
            if let StreamingEvent::ChunkActivated { coordinate, .. } = event {
                next_presentation += 1;
                match streaming.attach_presentation(coordinate, PresentationId(next_presentation)) {
                    Ok(Some(previous)) => debug!("Chunk {} replaced presentation {}", coordinate, previous),
                    Ok(None) => {}
                    Err(rejected) => warn!("Chunk {} is not active; dropped presentation {}", coordinate, rejected),
                }
                streaming.confirm_collision(coordinate);
            }
        }

        if streaming.config().worker_threads > 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    info!("{}", streaming.debug_info());
    info!(
        "Ground under the observer: {:?}",
        streaming.voxel_at(Point3::new(position.x, 0.0, position.z))
    );

    streaming.shutdown();
    let evicted = streaming
        .drain_events()
        .iter()
        .filter(|event| matches!(event, StreamingEvent::ChunkEvicted { .. }))
        .count();
    info!("Released {} chunks on shutdown", evicted);

    Ok(())
}
