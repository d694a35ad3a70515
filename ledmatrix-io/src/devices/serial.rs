//! Serial output device for the RP2040 panel controller
//!
//! # Protocol
//!
//! ```text
//! host                          controller
//!  │── encoded frame ──────────────▶│
//!  │                                │ display
//!  │◀──────────── 'K' | 'E' ────────│   (only when the host waits)
//! ```
//!
//! The controller has a small receive buffer, so waiting for the single
//! acknowledgment byte is the only flow control. A missing or unexpected
//! byte counts as a dropped frame; nothing is resent.

use crate::config::SerialConfig;
use crate::core::device::OutputDevice;
use crate::core::types::{AckOutcome, EncodedFrame};
use crate::error::{Error, Result};
use crate::transport::{PortLocator, SerialTransport, Transport};

/// Opens a byte channel on the named port
pub type TransportOpener = Box<dyn FnMut(&str) -> Result<Box<dyn Transport>> + Send>;

/// Frame sink on a serial port
pub struct SerialDevice {
    /// Explicit port; auto-detected on each connect when `None`
    port: Option<String>,
    locator: PortLocator,
    opener: TransportOpener,
    /// Open channel; exclusively owned
    transport: Option<Box<dyn Transport>>,
    connected_port: Option<String>,
}

impl SerialDevice {
    /// Device on the system's serial ports
    pub fn new(config: &SerialConfig) -> Self {
        let settings = config.settings();
        let locator = PortLocator::system()
            .with_markers(&config.board_markers, &config.fallback_markers);
        Self::with_opener(
            config.port.clone(),
            locator,
            Box::new(move |path: &str| -> Result<Box<dyn Transport>> {
                Ok(Box::new(SerialTransport::open(path, settings)?))
            }),
        )
    }

    /// Device with custom port discovery and channel construction
    pub fn with_opener(port: Option<String>, locator: PortLocator, opener: TransportOpener) -> Self {
        Self {
            port,
            locator,
            opener,
            transport: None,
            connected_port: None,
        }
    }

    /// Port of the open connection
    pub fn connected_port(&self) -> Option<&str> {
        self.connected_port.as_deref()
    }

    fn resolve_port(&self) -> Result<String> {
        if let Some(port) = &self.port {
            return Ok(port.clone());
        }
        self.locator.find()?.ok_or(Error::NoPortFound)
    }
}

impl OutputDevice for SerialDevice {
    fn name(&self) -> &str {
        "serial"
    }

    fn connect(&mut self) -> Result<()> {
        if self.transport.is_some() {
            log::debug!(
                "Already connected to {}",
                self.connected_port.as_deref().unwrap_or("?")
            );
            return Ok(());
        }

        let port = self.resolve_port()?;
        let connect_failed = |e: Error| Error::ConnectFailed {
            port: port.clone(),
            source: Box::new(e),
        };
        let mut transport = (self.opener)(&port).map_err(connect_failed)?;

        // Stale bytes could be misread as an acknowledgment
        transport.clear().map_err(connect_failed)?;

        log::info!("Connected to {}", port);
        self.transport = Some(transport);
        self.connected_port = Some(port);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            log::info!(
                "Disconnected from {}",
                self.connected_port.as_deref().unwrap_or("?")
            );
        }
        self.connected_port = None;
    }

    fn send(&mut self, frame: &EncodedFrame, wait_ack: bool) -> Result<bool> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;

        let written = transport
            .write_all(frame.as_bytes())
            .and_then(|()| transport.flush());
        if let Err(e) = written {
            log::warn!("Serial error: {}", e);
            return Ok(false);
        }

        if !wait_ack {
            return Ok(true);
        }

        let byte = match transport.read_byte() {
            Ok(byte) => byte,
            Err(e) => {
                log::warn!("Serial error while waiting for ack: {}", e);
                return Ok(false);
            }
        };

        match AckOutcome::from_byte(byte) {
            AckOutcome::Ack => Ok(true),
            AckOutcome::NegAck => {
                log::warn!("Device error");
                Ok(false)
            }
            AckOutcome::Timeout => {
                match byte {
                    Some(b) => log::debug!("Unexpected ack byte 0x{:02X}", b),
                    None => log::debug!("Ack timeout"),
                }
                Ok(false)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.transport.is_some()
    }
}

impl Drop for SerialDevice {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PortCandidate;
    use crate::transport::MockTransport;
    use std::sync::{Arc, Mutex};

    /// Device wired to a shared mock, recording every port it opens
    fn mock_device(
        port: Option<&str>,
        ports: Vec<PortCandidate>,
    ) -> (SerialDevice, MockTransport, Arc<Mutex<Vec<String>>>) {
        let mock = MockTransport::new();
        let opened = Arc::new(Mutex::new(Vec::new()));

        let handle = mock.clone();
        let log = opened.clone();
        let device = SerialDevice::with_opener(
            port.map(str::to_string),
            PortLocator::with_enumerator(move || Ok(ports.clone())),
            Box::new(move |path: &str| -> Result<Box<dyn Transport>> {
                log.lock().unwrap().push(path.to_string());
                Ok(Box::new(handle.clone()))
            }),
        );
        (device, mock, opened)
    }

    fn frame() -> EncodedFrame {
        EncodedFrame::RawBinary(vec![0xFF, 0x00, 0x12, 0x34])
    }

    #[test]
    fn test_connect_auto_detects_and_clears() {
        let ports = vec![
            PortCandidate::new("/dev/ttyUSB0", "", ""),
            PortCandidate::new("/dev/ttyACM0", "Pico", "Raspberry Pi"),
        ];
        let (mut device, mock, opened) = mock_device(None, ports);
        mock.queue_reply(b"K");

        device.connect().unwrap();
        assert!(device.is_connected());
        assert_eq!(device.connected_port(), Some("/dev/ttyACM0"));
        assert_eq!(*opened.lock().unwrap(), vec!["/dev/ttyACM0".to_string()]);
        assert_eq!(mock.clear_count(), 1);
        assert_eq!(mock.pending_replies(), 0);
    }

    #[test]
    fn test_explicit_port_skips_discovery() {
        let (mut device, _mock, opened) = mock_device(Some("COM7"), vec![]);
        device.connect().unwrap();
        assert_eq!(*opened.lock().unwrap(), vec!["COM7".to_string()]);
    }

    #[test]
    fn test_connect_without_candidates() {
        let (mut device, _mock, opened) =
            mock_device(None, vec![PortCandidate::new("/dev/ttyS0", "", "")]);
        assert!(matches!(device.connect(), Err(Error::NoPortFound)));
        assert!(!device.is_connected());
        assert!(opened.lock().unwrap().is_empty());
    }

    #[test]
    fn test_connect_failure_names_port() {
        let mut device = SerialDevice::with_opener(
            Some("/dev/ttyACM9".to_string()),
            PortLocator::with_enumerator(|| Ok(Vec::new())),
            Box::new(|_: &str| -> Result<Box<dyn Transport>> {
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "busy",
                )))
            }),
        );
        match device.connect() {
            Err(Error::ConnectFailed { port, .. }) => assert_eq!(port, "/dev/ttyACM9"),
            other => panic!("unexpected result: {:?}", other.err()),
        }
        assert!(!device.is_connected());
    }

    #[test]
    fn test_clear_failure_is_connect_error() {
        let (mut device, mock, opened) = mock_device(Some("/dev/ttyACM1"), vec![]);
        mock.set_fail_clear(true);

        match device.connect() {
            Err(Error::ConnectFailed { port, source }) => {
                assert_eq!(port, "/dev/ttyACM1");
                assert!(matches!(*source, Error::Io(_)));
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
        assert!(!device.is_connected());
        assert_eq!(device.connected_port(), None);
        assert_eq!(opened.lock().unwrap().len(), 1);

        // The next attempt opens a fresh channel
        mock.set_fail_clear(false);
        device.connect().unwrap();
        assert_eq!(opened.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_reconnect_is_noop() {
        let (mut device, mock, opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        device.connect().unwrap();
        device.connect().unwrap();
        assert_eq!(opened.lock().unwrap().len(), 1);
        assert_eq!(mock.clear_count(), 1);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut device, _mock, _opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        device.disconnect();
        device.connect().unwrap();
        device.disconnect();
        device.disconnect();
        assert!(!device.is_connected());
        assert_eq!(device.connected_port(), None);
    }

    #[test]
    fn test_send_requires_connection() {
        let (mut device, _mock, _opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        assert!(matches!(device.send(&frame(), true), Err(Error::NotConnected)));
    }

    #[test]
    fn test_ack_outcomes() {
        let (mut device, mock, _opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        device.connect().unwrap();

        mock.queue_reply(b"K");
        assert!(device.send(&frame(), true).unwrap());

        mock.queue_reply(b"E");
        assert!(!device.send(&frame(), true).unwrap());

        // Silence
        assert!(!device.send(&frame(), true).unwrap());

        mock.queue_reply(b"?");
        assert!(!device.send(&frame(), true).unwrap());

        assert_eq!(mock.frames().len(), 4);
        assert_eq!(mock.written().len(), 4 * frame().len());
    }

    #[test]
    fn test_single_ack_read_per_frame() {
        let (mut device, mock, _opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        device.connect().unwrap();
        let reads_before = mock.read_count();

        mock.queue_reply(b"KK");
        assert!(device.send(&frame(), true).unwrap());
        assert_eq!(mock.read_count(), reads_before + 1);
        assert_eq!(mock.pending_replies(), 1);
    }

    #[test]
    fn test_no_ack_mode_never_reads() {
        let (mut device, mock, _opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        device.connect().unwrap();
        let reads_before = mock.read_count();

        assert!(device.send(&frame(), false).unwrap());
        assert_eq!(mock.read_count(), reads_before);
        assert_eq!(mock.written(), frame().as_bytes());
    }

    #[test]
    fn test_write_failure_drops_frame() {
        let (mut device, mock, _opened) = mock_device(Some("/dev/ttyACM0"), vec![]);
        device.connect().unwrap();
        mock.set_fail_writes(true);
        mock.queue_reply(b"K");

        assert!(!device.send(&frame(), true).unwrap());
        assert!(device.is_connected());
        // The ack byte was never consumed
        assert_eq!(mock.pending_replies(), 1);
    }
}
