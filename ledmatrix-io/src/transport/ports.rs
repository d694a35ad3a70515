//! Serial port discovery
//!
//! Ports are re-enumerated on every call; hot-plugging between connects is
//! expected. Selection priority:
//!
//! 1. description or manufacturer names the board (`pico`, `rp2040`, `raspberry`)
//! 2. device identifier looks like a generic USB serial adapter (`acm`, `usb`)
//! 3. nothing

use crate::core::types::PortCandidate;
use crate::error::Result;
use serialport::SerialPortType;

/// Board markers matched against description and manufacturer
pub const DEFAULT_BOARD_MARKERS: [&str; 3] = ["pico", "rp2040", "raspberry"];

/// Generic USB-serial markers matched against the device identifier
pub const DEFAULT_FALLBACK_MARKERS: [&str; 2] = ["acm", "usb"];

type Enumerator = Box<dyn Fn() -> Result<Vec<PortCandidate>> + Send>;

/// Finds the serial port most likely to be the panel controller
pub struct PortLocator {
    enumerator: Enumerator,
    board_markers: Vec<String>,
    fallback_markers: Vec<String>,
}

impl PortLocator {
    /// Locator over the system's serial ports with the default markers
    pub fn system() -> Self {
        Self::with_enumerator(system_ports)
    }

    /// Locator over a custom port source
    pub fn with_enumerator<F>(enumerator: F) -> Self
    where
        F: Fn() -> Result<Vec<PortCandidate>> + Send + 'static,
    {
        Self {
            enumerator: Box::new(enumerator),
            board_markers: DEFAULT_BOARD_MARKERS.iter().map(|s| s.to_string()).collect(),
            fallback_markers: DEFAULT_FALLBACK_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the marker lists (matching is case-insensitive)
    pub fn with_markers(mut self, board: &[String], fallback: &[String]) -> Self {
        self.board_markers = board.iter().map(|s| s.to_lowercase()).collect();
        self.fallback_markers = fallback.iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// List currently visible ports
    pub fn enumerate(&self) -> Result<Vec<PortCandidate>> {
        let ports = (self.enumerator)()?;
        log::debug!("Enumerated {} serial port(s)", ports.len());
        for port in &ports {
            log::trace!(
                "  {} description={:?} manufacturer={:?}",
                port.device,
                port.description,
                port.manufacturer
            );
        }
        Ok(ports)
    }

    /// Pick the best candidate, or `None` when nothing qualifies
    pub fn select_best(&self, candidates: &[PortCandidate]) -> Option<String> {
        if let Some(port) = candidates.iter().find(|p| {
            contains_any(&p.description, &self.board_markers)
                || contains_any(&p.manufacturer, &self.board_markers)
        }) {
            log::info!("Found board on {} ({})", port.device, port.description);
            return Some(port.device.clone());
        }

        if let Some(port) = candidates
            .iter()
            .find(|p| contains_any(&p.device, &self.fallback_markers))
        {
            log::info!("Using generic USB serial port {}", port.device);
            return Some(port.device.clone());
        }

        None
    }

    /// Enumerate and select in one step
    pub fn find(&self) -> Result<Option<String>> {
        let ports = self.enumerate()?;
        Ok(self.select_best(&ports))
    }
}

fn contains_any(haystack: &str, markers: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    markers.iter().any(|m| !m.is_empty() && haystack.contains(m.as_str()))
}

/// Ports reported by the operating system
pub fn system_ports() -> Result<Vec<PortCandidate>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| match info.port_type {
            SerialPortType::UsbPort(usb) => PortCandidate {
                device: info.port_name,
                description: usb.product.unwrap_or_default(),
                manufacturer: usb.manufacturer.unwrap_or_default(),
            },
            SerialPortType::BluetoothPort => PortCandidate {
                device: info.port_name,
                description: "Bluetooth".to_string(),
                manufacturer: String::new(),
            },
            _ => PortCandidate {
                device: info.port_name,
                ..Default::default()
            },
        })
        .collect())
}
