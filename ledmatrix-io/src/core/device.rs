//! OutputDevice trait definition

use crate::core::types::EncodedFrame;
use crate::error::Result;

/// Anything that accepts encoded frames: real hardware or a simulator sink
pub trait OutputDevice: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Open the device
    ///
    /// Calling this while already connected is a no-op; a second handle is
    /// never opened.
    fn connect(&mut self) -> Result<()>;

    /// Release the device. Safe to call repeatedly or before `connect`.
    fn disconnect(&mut self);

    /// Deliver one frame
    ///
    /// Returns `Ok(false)` when the frame was rejected, not acknowledged, or
    /// could not be written. `Err` is reserved for misuse such as sending
    /// while disconnected.
    fn send(&mut self, frame: &EncodedFrame, wait_ack: bool) -> Result<bool>;

    fn is_connected(&self) -> bool;
}
