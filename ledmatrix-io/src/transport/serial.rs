//! Serial transport implementation

use super::Transport;
use crate::error::Result;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Line parameters for opening a port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialSettings {
    /// Baud rate (ignored by USB CDC, required by real UARTs)
    pub baud_rate: u32,
    /// Upper bound on the acknowledgment read
    pub read_timeout: Duration,
    /// Upper bound on writing one frame
    pub write_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_millis(1000),
        }
    }
}

/// Serial transport for USB CDC / UART communication
///
/// The serialport crate has a single timeout per port, so it is switched
/// between the read and write bounds only when the direction changes.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    settings: SerialSettings,
    current_timeout: Duration,
}

impl SerialTransport {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0", "COM3")
    /// * `settings` - Baud rate and timeouts
    pub fn open(path: &str, settings: SerialSettings) -> Result<Self> {
        let port = serialport::new(path, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, settings.baud_rate);

        Ok(SerialTransport {
            port,
            settings,
            current_timeout: settings.read_timeout,
        })
    }

    fn use_timeout(&mut self, timeout: Duration) -> Result<()> {
        if self.current_timeout != timeout {
            self.port.set_timeout(timeout)?;
            self.current_timeout = timeout;
        }
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        self.use_timeout(self.settings.read_timeout)?;
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.use_timeout(self.settings.write_timeout)?;
        self.port.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::All)?;
        log::debug!("Cleared serial input/output buffers");
        Ok(())
    }
}
