//! Frame compositor: resize, brightness, pixel-order correction, packing
//!
//! # Pipeline
//!
//! ```text
//! source (any size)
//!   │  resize (fit / fill / stretch)      -> FrameBuffer at panel geometry
//!   │  brightness (truncating multiply)
//!   │  mirror columns                     -> shift-register load order
//!   ▼  pack RGB565 little-endian          -> 2·W·H bytes
//! ```
//!
//! The HUB75 shift registers are loaded right to left: the last column
//! clocked in ends up physically leftmost. Mirroring must happen exactly once
//! per frame, after brightness and before packing.

use crate::core::types::{BLACK, FitMode, FrameBuffer, Geometry};
use crate::frame::packing::pack_frame;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Resampling filter for all scaled paths (area-like for downscaling)
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Turns arbitrary source images into wire-ready RGB565 frames
#[derive(Debug, Clone)]
pub struct Compositor {
    geometry: Geometry,
    fit_mode: FitMode,
    brightness: f32,
}

impl Compositor {
    /// Create a compositor; `brightness` is clamped to `[0.0, 1.0]`
    pub fn new(geometry: Geometry, fit_mode: FitMode, brightness: f32) -> Self {
        Self {
            geometry,
            fit_mode,
            brightness: clamp_brightness(brightness),
        }
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[inline]
    pub fn fit_mode(&self) -> FitMode {
        self.fit_mode
    }

    #[inline]
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = clamp_brightness(brightness);
    }

    /// Resize and dim a source image into a geometry-sized frame
    ///
    /// The result is in logical (viewer) column order.
    pub fn compose(&self, source: &RgbImage) -> FrameBuffer {
        let mut image = resize_to(source, self.geometry, self.fit_mode);
        apply_brightness(&mut image, self.brightness);

        assert_eq!(
            (image.width(), image.height()),
            (self.geometry.width, self.geometry.height),
            "compositor produced a frame outside the panel geometry"
        );

        let mut frame = FrameBuffer::black(self.geometry);
        *frame.image_mut() = image;
        frame
    }

    /// Mirror a composed frame into shift-register order and pack it
    pub fn pack(&self, frame: &FrameBuffer) -> Vec<u8> {
        pack_frame(&mirror_columns(frame))
    }

    /// Full per-frame path: compose, mirror, pack
    pub fn render(&self, source: &RgbImage) -> Vec<u8> {
        self.pack(&self.compose(source))
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Geometry::default(), FitMode::default(), 1.0)
    }
}

/// One-shot [`Compositor::compose`]
pub fn compose(source: &RgbImage, geometry: Geometry, fit_mode: FitMode, brightness: f32) -> FrameBuffer {
    Compositor::new(geometry, fit_mode, brightness).compose(source)
}

/// Clamp a brightness factor into `[0.0, 1.0]`; NaN means full brightness
pub fn clamp_brightness(factor: f32) -> f32 {
    if factor.is_nan() {
        1.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Scale `source` to exactly `geometry` under the given fit policy
pub fn resize_to(source: &RgbImage, geometry: Geometry, fit_mode: FitMode) -> RgbImage {
    let (src_w, src_h) = source.dimensions();
    let (dst_w, dst_h) = (geometry.width, geometry.height);

    if (src_w, src_h) == (dst_w, dst_h) {
        return source.clone();
    }

    if src_w == 0 || src_h == 0 {
        log::warn!("Empty {}x{} source, composing a black frame", src_w, src_h);
        return RgbImage::from_pixel(dst_w, dst_h, BLACK);
    }

    if fit_mode == FitMode::Stretch {
        return imageops::resize(source, dst_w, dst_h, RESIZE_FILTER);
    }

    let scale_w = dst_w as f64 / src_w as f64;
    let scale_h = dst_h as f64 / src_h as f64;
    let scale = match fit_mode {
        FitMode::Fit => scale_w.min(scale_h),
        _ => scale_w.max(scale_h),
    };

    let scaled_w = ((src_w as f64 * scale) as u32).max(1);
    let scaled_h = ((src_h as f64 * scale) as u32).max(1);

    let scaled = if (scaled_w, scaled_h) == (src_w, src_h) {
        source.clone()
    } else {
        imageops::resize(source, scaled_w, scaled_h, RESIZE_FILTER)
    };

    let (src_x, dst_x, copy_w) = axis_placement(scaled_w, dst_w);
    let (src_y, dst_y, copy_h) = axis_placement(scaled_h, dst_h);

    let mut canvas = RgbImage::from_pixel(dst_w, dst_h, BLACK);
    for y in 0..copy_h {
        for x in 0..copy_w {
            let pixel = *scaled.get_pixel(src_x + x, src_y + y);
            canvas.put_pixel(dst_x + x, dst_y + y, pixel);
        }
    }
    canvas
}

/// Placement of a scaled axis on the target: `(src_offset, dst_offset, copy_len)`
///
/// Overflow is center-cropped, underflow is centered with padding. The copy
/// length is clamped on both sides so a one-pixel rounding mismatch can never
/// index past either buffer.
fn axis_placement(scaled: u32, target: u32) -> (u32, u32, u32) {
    if scaled > target {
        let crop = (scaled - target) / 2;
        (crop, 0, (scaled - crop).min(target))
    } else {
        let pad = (target - scaled) / 2;
        (0, pad, scaled.min(target - pad))
    }
}

/// Multiply every channel by `factor`, truncating toward zero
///
/// A factor of 1.0 leaves the image untouched.
pub fn apply_brightness(image: &mut RgbImage, factor: f32) {
    let factor = clamp_brightness(factor);
    if factor >= 1.0 {
        return;
    }
    for Rgb(channels) in image.pixels_mut() {
        for c in channels.iter_mut() {
            *c = (*c as f32 * factor) as u8;
        }
    }
}

/// Reverse column order (left-right mirror)
pub fn mirror_columns(frame: &FrameBuffer) -> FrameBuffer {
    let mut mirrored = frame.clone();
    imageops::flip_horizontal_in_place(mirrored.image_mut());
    mirrored
}
