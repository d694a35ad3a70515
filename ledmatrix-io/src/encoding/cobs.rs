//! Consistent Overhead Byte Stuffing
//!
//! Removes every `0x00` from a payload so a single zero can terminate the
//! frame on the wire. Each run starts with a code byte equal to one plus the
//! number of non-zero bytes that follow it:
//!
//! ```text
//! input:   11 22 00 33
//! encoded: 03 11 22 02 33
//!          ^code    ^code
//! ```
//!
//! A code below `0xFF` implies a zero after its run (except for the final
//! run). A run of 254 non-zero bytes is closed with code `0xFF`, which implies
//! no zero, so a code byte never covers more than 254 data bytes. Worst-case
//! overhead is one byte per 254 bytes of payload, plus one.
//!
//! The terminator is not part of the encoding; callers append it.

use crate::error::{Error, Result};

/// Largest code value; closes a run of 254 non-zero bytes with no implied zero
const MAX_CODE: u8 = 0xFF;

/// Upper bound on the encoded size of `len` input bytes (terminator excluded)
#[inline]
pub const fn max_encoded_len(len: usize) -> usize {
    len + len / 254 + 1
}

/// COBS-encode `data`. Empty input encodes to `[0x01]`.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(max_encoded_len(data.len()));
    encode_into(data, &mut out);
    out
}

/// COBS-encode `data`, appending to `out`
pub fn encode_into(data: &[u8], out: &mut Vec<u8>) {
    let mut code_index = out.len();
    let mut code: u8 = 1;
    out.push(0); // placeholder for the first code

    for &byte in data {
        if byte == 0 {
            out[code_index] = code;
            code_index = out.len();
            out.push(0);
            code = 1;
        } else {
            out.push(byte);
            code += 1;

            if code == MAX_CODE {
                out[code_index] = code;
                code_index = out.len();
                out.push(0);
                code = 1;
            }
        }
    }

    out[code_index] = code;
}

/// Reverse [`encode`]. `data` must not include the frame terminator.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let code = data[i];
        if code == 0 {
            return Err(Error::Decode(format!(
                "COBS: unexpected zero code byte at offset {}",
                i
            )));
        }
        i += 1;

        let run = code as usize - 1;
        let Some(block) = data.get(i..i + run) else {
            return Err(Error::Decode(format!(
                "COBS: code 0x{:02X} at offset {} overruns {} byte input",
                code,
                i - 1,
                data.len()
            )));
        };
        if block.contains(&0) {
            return Err(Error::Decode(
                "COBS: zero byte inside a stuffed run".to_string(),
            ));
        }
        out.extend_from_slice(block);
        i += run;

        if code != MAX_CODE && i < data.len() {
            out.push(0);
        }
    }

    Ok(out)
}
