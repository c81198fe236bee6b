//! # Chunk Streaming
//!
//! Decides which chunks exist around a moving observer and drives them through the
//! generation and meshing pipeline under a per-tick budget.
//!
//! ## Architecture
//!
//! * **Config**: the validated option set
//! * **Evaluation**: load and unload regions with hysteresis
//! * **Controller**: the per-tick orchestration, owning the cache, the load queue, the
//!   worker pool and the active-chunk registry
//! * **Events**: what the host needs to mirror into renderers and collision
//! * **Error**: configuration, per-chunk and startup failures

pub mod config;
pub mod controller;
pub mod error;
pub mod evaluation;
pub mod events;

pub use config::{DistanceMetric, StreamingConfig};
pub use controller::StreamingController;
pub use error::{CollaboratorError, ConfigError, PipelineError, StreamingError};
pub use evaluation::StreamingRegion;
pub use events::{StreamingDebugInfo, StreamingEvent, TickReport};
