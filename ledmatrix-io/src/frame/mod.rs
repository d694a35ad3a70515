//! Frame preparation: compositing and RGB565 packing

pub mod compositor;
pub mod packing;

pub use compositor::Compositor;
pub use packing::{pack_frame, pack_rgb565, unpack_frame, unpack_rgb565};
