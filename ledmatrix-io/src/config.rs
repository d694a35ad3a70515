//! Configuration for ledmatrix-io
//!
//! Loads configuration from a TOML file. Every field has a default, so a
//! partial file (or none at all) is valid:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"     # omit to auto-detect
//! ack_timeout_ms = 100
//!
//! [display]
//! width = 128
//! height = 64
//! brightness = 0.5
//! fit = "fill"
//!
//! [session]
//! encoding = "cobs"
//! fps = 30.0
//! ```

use crate::core::types::{DEFAULT_HEIGHT, DEFAULT_WIDTH, Encoding, FitMode, Geometry};
use crate::devices::DeviceKind;
use crate::devices::image::{MAX_SCALE, output_dimensions};
use crate::error::{Error, Result};
use crate::session::Pacer;
use crate::transport::SerialSettings;
use crate::transport::ports::{DEFAULT_BOARD_MARKERS, DEFAULT_FALLBACK_MARKERS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub display: DisplayConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Serial link and port discovery
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Explicit port; auto-detected when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Baud rate (USB CDC ignores it, real UARTs do not)
    pub baud_rate: u32,
    /// How long to wait for the single acknowledgment byte
    pub ack_timeout_ms: u64,
    /// Upper bound on writing one frame
    pub write_timeout_ms: u64,
    /// Substrings of description/manufacturer that identify the board
    pub board_markers: Vec<String>,
    /// Substrings of the device name that identify a generic USB serial port
    pub fallback_markers: Vec<String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115200,
            ack_timeout_ms: 100,
            write_timeout_ms: 1000,
            board_markers: DEFAULT_BOARD_MARKERS.iter().map(|s| s.to_string()).collect(),
            fallback_markers: DEFAULT_FALLBACK_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SerialConfig {
    pub fn settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.ack_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }
}

/// Panel geometry and image preparation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Brightness factor in `[0.0, 1.0]`
    pub brightness: f32,
    pub fit: FitMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            brightness: 1.0,
            fit: FitMode::Fit,
        }
    }
}

impl DisplayConfig {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height)
    }
}

/// Frame delivery policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub encoding: Encoding,
    /// Wait for `'K'`/`'E'` after every frame
    pub wait_ack: bool,
    /// Target frame rate for paced playback
    pub fps: f32,
    /// Ignore `fps` and send as fast as the link allows
    pub max_fps: bool,
    /// Restart frame sequences when they end
    pub loop_playback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Raw,
            wait_ack: true,
            fps: 30.0,
            max_fps: false,
            loop_playback: false,
        }
    }
}

impl SessionConfig {
    pub fn pacer(&self) -> Pacer {
        if self.max_fps {
            Pacer::MaxThroughput
        } else {
            Pacer::from_fps(self.fps)
        }
    }
}

/// Output device selection and PNG sink options
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub device: DeviceKind,
    /// Directory for `frame_NNNNNN.png` files
    pub dir: PathBuf,
    /// Output pixels per panel pixel
    pub scale: u32,
    /// Draw round LEDs with a glow instead of square blocks
    pub led_style: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Serial,
            dir: PathBuf::from("output"),
            scale: 10,
            led_style: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use ledmatrix_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("ledmatrix.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values no session could run with
    pub fn validate(&self) -> Result<()> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(Error::Config(format!(
                "panel geometry must be non-zero, got {}",
                self.display.geometry()
            )));
        }
        if !self.session.max_fps && !(self.session.fps.is_finite() && self.session.fps > 0.0) {
            return Err(Error::Config(format!(
                "fps must be positive, got {}",
                self.session.fps
            )));
        }
        if self.serial.ack_timeout_ms == 0 && self.session.wait_ack {
            return Err(Error::Config(
                "ack_timeout_ms must be non-zero when waiting for acknowledgments".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::Config("baud_rate must be non-zero".to_string()));
        }
        if !(1..=MAX_SCALE).contains(&self.output.scale) {
            return Err(Error::Config(format!(
                "output scale must be between 1 and {}, got {}",
                MAX_SCALE, self.output.scale
            )));
        }
        let geometry = self.display.geometry();
        if output_dimensions(geometry, self.output.scale, self.output.led_style).is_none() {
            return Err(Error::Config(format!(
                "{} panel at scale {} is too large to render",
                geometry, self.output.scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.serial.port, None);
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.ack_timeout_ms, 100);
        assert_eq!(config.display.geometry(), Geometry::new(128, 32));
        assert_eq!(config.display.fit, FitMode::Fit);
        assert_eq!(config.session.encoding, Encoding::Raw);
        assert!(config.session.wait_ack);
        assert_eq!(config.output.device, DeviceKind::Serial);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = AppConfig::default();
        config.serial.port = Some("/dev/ttyACM0".to_string());
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[display]"));
        assert!(toml_string.contains("[session]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("port = \"/dev/ttyACM0\""));
        assert!(toml_string.contains("encoding = \"raw\""));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
[display]
height = 64
fit = "fill"

[session]
encoding = "cobs"
max_fps = true
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.display.geometry(), Geometry::new(128, 64));
        assert_eq!(config.display.fit, FitMode::Fill);
        assert_eq!(config.display.brightness, 1.0);
        assert_eq!(config.session.encoding, Encoding::Cobs);
        assert_eq!(config.session.pacer(), Pacer::MaxThroughput);
        assert_eq!(config.serial.board_markers, vec!["pico", "rp2040", "raspberry"]);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledmatrix.toml");

        let mut config = AppConfig::default();
        config.display.brightness = 0.25;
        config.session.encoding = Encoding::Base64;
        config.output.device = DeviceKind::Image;
        config.to_file(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.display.brightness, 0.25);
        assert_eq!(loaded.session.encoding, Encoding::Base64);
        assert_eq!(loaded.output.device, DeviceKind::Image);
        assert_eq!(loaded.serial.port, None);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.display.width = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = AppConfig::default();
        config.session.fps = 0.0;
        assert!(config.validate().is_err());
        config.session.max_fps = true;
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.serial.baud_rate = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_output_scale_bounds() {
        let mut config = AppConfig::default();
        config.output.scale = MAX_SCALE;
        assert!(config.validate().is_ok());

        config.output.scale = 100_000_000;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.output.scale = 0;
        assert!(config.validate().is_err());

        // In range, but the canvas would not fit
        config.output.scale = 2;
        config.display.width = u32::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_serial_settings() {
        let settings = SerialConfig::default().settings();
        assert_eq!(settings.read_timeout, Duration::from_millis(100));
        assert_eq!(settings.write_timeout, Duration::from_secs(1));
    }
}
