//! ledmatrix-io - Host-side frame pipeline for a HUB75 LED matrix
//!
//! Turns arbitrary images into RGB565 frames for an RP2040 panel controller
//! and delivers them over a serial link with acknowledgment-based flow
//! control.
//!
//! ## Layers
//!
//! - [`frame`]: resize, brightness, column mirror, RGB565 packing
//! - [`encoding`]: raw, Base64 and COBS wire formats
//! - [`transport`]: byte channels and serial port discovery
//! - [`devices`]: serial controller and PNG sink behind [`OutputDevice`]
//! - [`session`]: pacing, FPS, and the blank-then-disconnect shutdown

pub mod config;
pub mod core;
pub mod devices;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod input;
pub mod session;
pub mod signal;
pub mod transport;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use crate::core::device::OutputDevice;
pub use crate::core::types::{EncodedFrame, Encoding, FitMode, FrameBuffer, Geometry};
pub use crate::error::{Error, Result};
pub use crate::session::{Pacer, Session, SessionStats};
