//! Error types for ledmatrix-io

use crate::core::types::Geometry;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ledmatrix-io error types
///
/// Connection failures are fatal for a session. A rejected or unacknowledged
/// frame is not an error: `send` reports it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// No candidate serial port matched during auto-detection
    #[error("No serial device found. Check USB connection or specify a port")]
    NoPortFound,

    /// Serial port exists but could not be opened
    #[error("Failed to connect to {port}: {source}")]
    ConnectFailed {
        /// Port identifier that was tried
        port: String,
        /// Why the open failed
        #[source]
        source: Box<Error>,
    },

    /// Operation requires an open connection
    #[error("Device not connected")]
    NotConnected,

    /// Frame buffer dimensions disagree with the configured geometry
    #[error("Geometry mismatch: expected {expected}, got {actual}")]
    Geometry {
        /// Configured geometry
        expected: Geometry,
        /// Geometry of the offending buffer
        actual: Geometry,
    },

    /// Wire payload could not be decoded back into a frame
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Signal handler could not be installed
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
