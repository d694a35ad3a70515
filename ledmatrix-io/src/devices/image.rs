//! PNG output device for running without hardware
//!
//! Decodes each wire frame the way the controller would, undoes the
//! shift-register column mirror so files show the panel as a viewer sees it,
//! and writes `frame_NNNNNN.png` into the output directory.

use crate::core::device::OutputDevice;
use crate::core::types::{EncodedFrame, Geometry, Pixel};
use crate::encoding;
use crate::error::{Error, Result};
use crate::frame::compositor::mirror_columns;
use image::{ImageFormat, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Black margin around LED-style renders, in output pixels
const LED_BORDER: u32 = 20;

/// Channels at or below this are drawn as an unlit LED
const LED_DARK_THRESHOLD: u8 = 10;

/// Largest accepted output pixels per panel pixel
pub const MAX_SCALE: u32 = 100;

/// Size of the rendered PNG, or `None` when it does not fit in `u32`
pub fn output_dimensions(geometry: Geometry, scale: u32, led_style: bool) -> Option<(u32, u32)> {
    let border = if led_style { LED_BORDER * 2 } else { 0 };
    let width = geometry.width.checked_mul(scale)?.checked_add(border)?;
    let height = geometry.height.checked_mul(scale)?.checked_add(border)?;
    Some((width, height))
}

/// Frame sink writing one PNG per frame
pub struct ImageDevice {
    output_dir: PathBuf,
    geometry: Geometry,
    scale: u32,
    led_style: bool,
    connected: bool,
    frame_count: u64,
}

impl ImageDevice {
    /// Create a sink; nothing touches the filesystem until `connect`
    pub fn new<P: AsRef<Path>>(output_dir: P, geometry: Geometry, scale: u32, led_style: bool) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            geometry,
            scale: scale.max(1),
            led_style,
            connected: false,
            frame_count: 0,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Frames written since the last `connect`
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Path of the `index`-th frame file
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_dir.join(format!("frame_{:06}.png", index))
    }

    fn save(&mut self, frame: &EncodedFrame) -> Result<()> {
        let wire = encoding::decode_frame(frame, self.geometry)?;
        let physical = mirror_columns(&wire);

        let output = if self.led_style {
            render_led_style(physical.as_image(), self.scale)?
        } else {
            upscale_nearest(physical.as_image(), self.scale)?
        };

        let path = self.frame_path(self.frame_count);
        output.save_with_format(&path, ImageFormat::Png)?;
        log::trace!("Wrote {}", path.display());
        self.frame_count += 1;
        Ok(())
    }
}

impl OutputDevice for ImageDevice {
    fn name(&self) -> &str {
        "image"
    }

    fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        fs::create_dir_all(&self.output_dir)?;
        self.connected = true;
        self.frame_count = 0;
        log::info!("Image output: {}", self.output_dir.display());
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            log::info!("Saved {} frames", self.frame_count);
        }
    }

    fn send(&mut self, frame: &EncodedFrame, _wait_ack: bool) -> Result<bool> {
        if !self.connected {
            return Ok(false);
        }
        match self.save(frame) {
            Ok(()) => Ok(true),
            Err(e) => {
                log::warn!("Image save error: {}", e);
                Ok(false)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Draw each pixel as a round LED with a dim glow and a bright center
fn render_led_style(image: &RgbImage, scale: u32) -> Result<RgbImage> {
    let (width, height) = canvas_size(image, scale, true)?;
    let mut output = RgbImage::new(width, height);
    let radius = (scale / 2).saturating_sub(1) as i64;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0.iter().all(|&c| c <= LED_DARK_THRESHOLD) {
            continue;
        }
        let cx = (LED_BORDER + x * scale + scale / 2) as i64;
        let cy = (LED_BORDER + y * scale + scale / 2) as i64;

        fill_disk(&mut output, cx, cy, radius + 2, scale_color(pixel, 0.3));
        fill_disk(&mut output, cx, cy, radius, *pixel);
        fill_disk(&mut output, cx, cy, radius / 2, scale_color(pixel, 1.2));
    }

    Ok(output)
}

/// Integer nearest-neighbour upscale: each pixel becomes a `scale`×`scale` block
fn upscale_nearest(image: &RgbImage, scale: u32) -> Result<RgbImage> {
    let (width, height) = canvas_size(image, scale, false)?;
    Ok(RgbImage::from_fn(width, height, |x, y| {
        *image.get_pixel(x / scale, y / scale)
    }))
}

fn canvas_size(image: &RgbImage, scale: u32, led_style: bool) -> Result<(u32, u32)> {
    let (w, h) = image.dimensions();
    output_dimensions(Geometry::new(w, h), scale, led_style).ok_or_else(|| {
        Error::InvalidParameter(format!("{}x{} at scale {} overflows the canvas", w, h, scale))
    })
}

fn scale_color(pixel: &Pixel, factor: f32) -> Pixel {
    Rgb(pixel.0.map(|c| (c as f32 * factor).min(255.0) as u8))
}

fn fill_disk(image: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Pixel) {
    let (w, h) = (image.width() as i64, image.height() as i64);
    for y in (cy - radius).max(0)..=(cy + radius).min(h - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(w - 1) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= radius * radius {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
