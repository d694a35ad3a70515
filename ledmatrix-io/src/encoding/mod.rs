//! Wire encodings for packed RGB565 frames
//!
//! # Frame Layouts
//!
//! ```text
//! Raw     ┌──────┬──────┬─────────────────────────┐
//!         │ 0xFF │ 0x00 │ 2·W·H bytes RGB565 LE   │   no terminator
//!         └──────┴──────┴─────────────────────────┘
//! Base64  ┌─────────────────────────────┬──────┐
//!         │ Base64(2·W·H bytes)         │ '\n' │
//!         └─────────────────────────────┴──────┘
//! COBS    ┌─────────────────────────────┬──────┐
//!         │ COBS(2·W·H bytes)           │ 0x00 │
//!         └─────────────────────────────┴──────┘
//! ```
//!
//! The receiver knows the panel geometry, so the raw form needs no length
//! field: it reads exactly `2 + 2·W·H` bytes after the magic. Frames do not
//! carry their encoding; both ends are configured for the same one.
//!
//! The decode half exists for simulator sinks and for verifying what a real
//! device would receive.

pub mod cobs;

use crate::core::types::{EncodedFrame, Encoding, FrameBuffer, Geometry};
use crate::error::{Error, Result};
use crate::frame::packing::unpack_frame;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// Magic prefix of a raw binary frame
pub const RAW_MAGIC: [u8; 2] = [0xFF, 0x00];

/// Line delimiter of a Base64 frame
pub const TEXT_TERMINATOR: u8 = b'\n';

/// Frame delimiter of a COBS frame
pub const COBS_TERMINATOR: u8 = 0x00;

/// Wrap packed RGB565 bytes in the selected wire format
pub fn encode(packed: &[u8], encoding: Encoding) -> EncodedFrame {
    match encoding {
        Encoding::Raw => {
            let mut out = Vec::with_capacity(RAW_MAGIC.len() + packed.len());
            out.extend_from_slice(&RAW_MAGIC);
            out.extend_from_slice(packed);
            EncodedFrame::RawBinary(out)
        }
        Encoding::Base64 => {
            let mut out = BASE64.encode(packed).into_bytes();
            out.push(TEXT_TERMINATOR);
            EncodedFrame::Base64Text(out)
        }
        Encoding::Cobs => {
            let mut out = Vec::with_capacity(cobs::max_encoded_len(packed.len()) + 1);
            cobs::encode_into(packed, &mut out);
            out.push(COBS_TERMINATOR);
            EncodedFrame::CobsFramed(out)
        }
    }
}

/// Exact wire size of a frame for fixed-size encodings
///
/// COBS output depends on the payload, so only its upper bound is known.
pub fn wire_len(geometry: Geometry, encoding: Encoding) -> usize {
    let packed = geometry.packed_len();
    match encoding {
        Encoding::Raw => RAW_MAGIC.len() + packed,
        Encoding::Base64 => packed.div_ceil(3) * 4 + 1,
        Encoding::Cobs => cobs::max_encoded_len(packed) + 1,
    }
}

/// Strip the wire framing and return the packed RGB565 payload
pub fn decode_payload(bytes: &[u8], encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Raw => bytes
            .strip_prefix(&RAW_MAGIC[..])
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Decode("raw frame is missing the 0xFF 0x00 magic".to_string())),
        Encoding::Base64 => {
            let text = bytes.strip_suffix(&[TEXT_TERMINATOR]).unwrap_or(bytes);
            let text = text.strip_suffix(b"\r").unwrap_or(text);
            BASE64
                .decode(text)
                .map_err(|e| Error::Decode(format!("invalid Base64 frame: {}", e)))
        }
        Encoding::Cobs => {
            let stuffed = bytes
                .strip_suffix(&[COBS_TERMINATOR])
                .ok_or_else(|| Error::Decode("COBS frame is missing its 0x00 terminator".to_string()))?;
            cobs::decode(stuffed)
        }
    }
}

/// Decode wire bytes back into an approximate RGB888 frame
///
/// The frame comes back in wire (shift-register) column order.
pub fn decode(bytes: &[u8], encoding: Encoding, geometry: Geometry) -> Result<FrameBuffer> {
    let payload = decode_payload(bytes, encoding)?;
    unpack_frame(&payload, geometry)
}

/// [`decode`] using the frame's own tag
pub fn decode_frame(frame: &EncodedFrame, geometry: Geometry) -> Result<FrameBuffer> {
    decode(frame.as_bytes(), frame.encoding(), geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::packing::pack_rgb565;
    use image::Rgb;

    fn packed_panel(geometry: Geometry, color: (u8, u8, u8)) -> Vec<u8> {
        pack_rgb565(color.0, color.1, color.2)
            .to_le_bytes()
            .repeat(geometry.pixel_count())
    }

    #[test]
    fn test_raw_layout() {
        let geometry = Geometry::default();
        let packed = packed_panel(geometry, (255, 0, 0));
        let frame = encode(&packed, Encoding::Raw);

        assert_eq!(frame.encoding(), Encoding::Raw);
        assert_eq!(frame.len(), 2 + 2 * 128 * 32);
        assert_eq!(frame.len(), wire_len(geometry, Encoding::Raw));
        assert_eq!(&frame.as_bytes()[..2], &[0xFF, 0x00]);
        assert_eq!(&frame.as_bytes()[2..4], &[0x00, 0xF8]);
    }

    #[test]
    fn test_base64_layout() {
        let geometry = Geometry::default();
        let packed = packed_panel(geometry, (0, 255, 0));
        let frame = encode(&packed, Encoding::Base64);
        let bytes = frame.as_bytes();

        assert_eq!(frame.len(), wire_len(geometry, Encoding::Base64));
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
        assert!(
            bytes[..bytes.len() - 1]
                .iter()
                .all(|b| b.is_ascii_alphanumeric() || b"+/=".contains(b))
        );
    }

    #[test]
    fn test_cobs_layout() {
        let geometry = Geometry::default();
        let packed = packed_panel(geometry, (0, 0, 0));
        let frame = encode(&packed, Encoding::Cobs);
        let bytes = frame.as_bytes();

        assert_eq!(bytes.last(), Some(&0x00));
        assert_eq!(bytes.iter().filter(|&&b| b == 0).count(), 1);
        assert!(frame.len() <= wire_len(geometry, Encoding::Cobs));
    }

    #[test]
    fn test_empty_payload_cobs() {
        assert_eq!(encode(&[], Encoding::Cobs).as_bytes(), &[0x01, 0x00]);
    }

    #[test]
    fn test_decode_every_encoding() {
        let geometry = Geometry::new(4, 2);
        let mut packed = packed_panel(geometry, (0, 0, 255));
        packed[0..2].copy_from_slice(&pack_rgb565(255, 255, 255).to_le_bytes());

        for encoding in [Encoding::Raw, Encoding::Base64, Encoding::Cobs] {
            let frame = encode(&packed, encoding);
            assert_eq!(decode_payload(frame.as_bytes(), encoding).unwrap(), packed);

            let decoded = decode_frame(&frame, geometry).unwrap();
            assert_eq!(decoded.pixel(0, 0), Rgb([248, 252, 248]));
            assert_eq!(decoded.pixel(3, 1), Rgb([0, 0, 248]));
        }
    }

    #[test]
    fn test_decode_rejects_wrong_framing() {
        let geometry = Geometry::new(2, 1);
        assert!(decode(&[0x00, 0xFF, 1, 2, 3, 4], Encoding::Raw, geometry).is_err());
        assert!(decode(&[0x02, 0x11], Encoding::Cobs, geometry).is_err());
        assert!(decode(b"!!!!\n", Encoding::Base64, geometry).is_err());
        // Well-framed but the wrong size for the geometry
        assert!(decode(&[0xFF, 0x00, 1, 2], Encoding::Raw, geometry).is_err());
    }
}
