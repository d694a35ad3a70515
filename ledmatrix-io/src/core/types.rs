//! Core data types for frames, wire encodings, and device communication.
//!
//! Key types:
//! - [`Geometry`]: Panel resolution, never hard-coded inside algorithms
//! - [`FrameBuffer`]: Geometry-sized RGB888 grid produced by the compositor
//! - [`EncodedFrame`]: Wire bytes tagged with the encoding that produced them
//! - [`AckOutcome`]: Classification of the single acknowledgment byte

use clap::ValueEnum;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// One RGB888 pixel (no alpha)
pub type Pixel = Rgb<u8>;

/// Black, used for letterbox padding and blanking
pub const BLACK: Pixel = Rgb([0, 0, 0]);

/// Default panel width (128x32 HUB75)
pub const DEFAULT_WIDTH: u32 = 128;
/// Default panel height (128x32 HUB75)
pub const DEFAULT_HEIGHT: u32 = 32;

/// Panel resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of one RGB565 frame (2 bytes per pixel)
    #[inline]
    pub const fn packed_len(&self) -> usize {
        self.pixel_count() * 2
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row-major RGB888 frame whose dimensions always equal its geometry
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    geometry: Geometry,
    image: RgbImage,
}

impl FrameBuffer {
    /// All-black frame
    pub fn black(geometry: Geometry) -> Self {
        Self::filled(geometry, BLACK)
    }

    /// Frame filled with a single color
    pub fn filled(geometry: Geometry, color: Pixel) -> Self {
        Self {
            geometry,
            image: RgbImage::from_pixel(geometry.width, geometry.height, color),
        }
    }

    /// Wrap an existing image, rejecting any size other than `geometry`
    pub fn from_image(geometry: Geometry, image: RgbImage) -> Result<Self> {
        let actual = Geometry::new(image.width(), image.height());
        if actual != geometry {
            return Err(Error::Geometry {
                expected: geometry,
                actual,
            });
        }
        Ok(Self { geometry, image })
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Pixel at column `x`, row `y`
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        *self.image.get_pixel(x, y)
    }

    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        self.image.put_pixel(x, y, pixel);
    }

    /// Pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = &Pixel> {
        self.image.pixels()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }
}

/// Resize policy applied when a source does not match the panel geometry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Preserve aspect ratio, pad the uncovered border with black
    #[default]
    Fit,
    /// Preserve aspect ratio, center-crop the overflowing axis
    Fill,
    /// Ignore aspect ratio, scale each axis independently
    Stretch,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMode::Fit => write!(f, "fit"),
            FitMode::Fill => write!(f, "fill"),
            FitMode::Stretch => write!(f, "stretch"),
        }
    }
}

/// Wire encoding selected for a session
///
/// The receiver must be told out of band which one is in use; frames do not
/// self-describe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// `0xFF 0x00` magic followed by raw RGB565 bytes
    #[default]
    #[value(name = "raw")]
    Raw,
    /// Base64 text terminated by `\n`
    #[value(name = "base64")]
    Base64,
    /// COBS byte stuffing terminated by `0x00`
    #[value(name = "cobs")]
    Cobs,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Raw => write!(f, "raw"),
            Encoding::Base64 => write!(f, "base64"),
            Encoding::Cobs => write!(f, "cobs"),
        }
    }
}

/// Wire-ready frame bytes, tagged by encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedFrame {
    RawBinary(Vec<u8>),
    Base64Text(Vec<u8>),
    CobsFramed(Vec<u8>),
}

impl EncodedFrame {
    /// Encoding that produced these bytes
    pub fn encoding(&self) -> Encoding {
        match self {
            EncodedFrame::RawBinary(_) => Encoding::Raw,
            EncodedFrame::Base64Text(_) => Encoding::Base64,
            EncodedFrame::CobsFramed(_) => Encoding::Cobs,
        }
    }

    /// Bytes exactly as they go on the wire
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            EncodedFrame::RawBinary(b) | EncodedFrame::Base64Text(b) | EncodedFrame::CobsFramed(b) => b,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Acknowledgment byte for a successfully displayed frame
pub const ACK_BYTE: u8 = b'K';
/// Acknowledgment byte for a frame the device rejected
pub const NACK_BYTE: u8 = b'E';

/// Result of waiting for the device's single acknowledgment byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Device displayed the frame (`'K'`)
    Ack,
    /// Device reported an error (`'E'`)
    NegAck,
    /// No byte within the timeout, or an unexpected byte
    Timeout,
}

impl AckOutcome {
    /// Classify the result of one bounded single-byte read
    pub fn from_byte(byte: Option<u8>) -> Self {
        match byte {
            Some(ACK_BYTE) => AckOutcome::Ack,
            Some(NACK_BYTE) => AckOutcome::NegAck,
            _ => AckOutcome::Timeout,
        }
    }
}

/// Serial port found during enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortCandidate {
    /// OS device identifier (e.g. `/dev/ttyACM0`, `COM3`)
    pub device: String,
    /// Human-readable description (USB product string when available)
    pub description: String,
    /// Manufacturer string (empty when unknown)
    pub manufacturer: String,
}

impl PortCandidate {
    pub fn new(device: &str, description: &str, manufacturer: &str) -> Self {
        Self {
            device: device.to_string(),
            description: description.to_string(),
            manufacturer: manufacturer.to_string(),
        }
    }
}
