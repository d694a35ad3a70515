//! Output device implementations

pub mod image;
pub mod serial;

use crate::config::AppConfig;
use crate::core::device::OutputDevice;
use crate::error::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use self::image::ImageDevice;
pub use self::serial::SerialDevice;

/// Selectable output target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// LED matrix controller on a serial port
    #[default]
    Serial,
    /// PNG files in an output directory
    Image,
}

/// Create an output device based on configuration
pub fn create_device(kind: DeviceKind, config: &AppConfig) -> Result<Box<dyn OutputDevice>> {
    config.validate()?;
    match kind {
        DeviceKind::Serial => Ok(Box::new(SerialDevice::new(&config.serial))),
        DeviceKind::Image => Ok(Box::new(ImageDevice::new(
            &config.output.dir,
            config.display.geometry(),
            config.output.scale,
            config.output.led_style,
        ))),
    }
}
