//! RGB888 <-> RGB565 bit packing
//!
//! ```text
//!  15      11 10        5 4       0
//! ┌──────────┬───────────┬─────────┐
//! │ R >> 3   │  G >> 2   │ B >> 3  │   serialized little-endian
//! └──────────┴───────────┴─────────┘
//! ```
//!
//! Packing is lossy. Unpacking shifts the channels back left, which only
//! approximates the original values.

use crate::core::types::{FrameBuffer, Geometry};
use crate::error::{Error, Result};
use image::{Rgb, RgbImage};

/// Pack one RGB888 pixel into RGB565
#[inline]
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

/// Approximate RGB888 reconstruction of a packed pixel
#[inline]
pub const fn unpack_rgb565(value: u16) -> [u8; 3] {
    [
        (((value >> 11) & 0x1F) << 3) as u8,
        (((value >> 5) & 0x3F) << 2) as u8,
        ((value & 0x1F) << 3) as u8,
    ]
}

/// Serialize a frame as row-major little-endian RGB565 (`2·W·H` bytes)
pub fn pack_frame(frame: &FrameBuffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.geometry().packed_len());
    for &Rgb([r, g, b]) in frame.pixels() {
        out.extend_from_slice(&pack_rgb565(r, g, b).to_le_bytes());
    }
    out
}

/// Rebuild an approximate RGB888 frame from packed bytes
///
/// The byte count must be exactly `geometry.packed_len()`.
pub fn unpack_frame(bytes: &[u8], geometry: Geometry) -> Result<FrameBuffer> {
    if bytes.len() != geometry.packed_len() {
        return Err(Error::Decode(format!(
            "expected {} RGB565 bytes for {}, got {}",
            geometry.packed_len(),
            geometry,
            bytes.len()
        )));
    }

    let mut image = RgbImage::new(geometry.width, geometry.height);
    for (pixel, chunk) in image.pixels_mut().zip(bytes.chunks_exact(2)) {
        let value = u16::from_le_bytes([chunk[0], chunk[1]]);
        *pixel = Rgb(unpack_rgb565(value));
    }
    FrameBuffer::from_image(geometry, image)
}
