//! # Core Module
//!
//! Shared-state primitives used across the streaming engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//!
//! The streaming controller keeps almost all of its state single-owner on the control
//! thread. `MtResource` is reserved for the few places where a value has to be reachable
//! from a boxed callback as well as from the controller, such as the event log written by
//! the cache's eviction handler.

pub mod mt_resource;

pub use mt_resource::MtResource;
