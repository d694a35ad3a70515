//! Transport layer for byte-channel I/O abstraction

use crate::error::Result;

mod mock;
pub mod ports;
mod serial;

pub use mock::MockTransport;
pub use ports::PortLocator;
pub use serial::{SerialSettings, SerialTransport};

/// Byte channel to the panel controller
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    ///
    /// Blocks for at most the channel's read timeout; a timeout is `Ok(0)`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write the entire buffer
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Discard pending input and output so stale bytes cannot be misread
    fn clear(&mut self) -> Result<()>;

    /// Read at most one byte within the read timeout
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}
