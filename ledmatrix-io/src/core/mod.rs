//! Core abstractions shared by every layer.
//!
//! - [`types`]: Geometry, frames, wire encodings, acknowledgment outcomes
//! - [`device::OutputDevice`]: Trait to implement for new output targets

pub mod device;
pub mod types;
