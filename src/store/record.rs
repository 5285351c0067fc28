//! On-disk record framing.
//!
//! Each stored record consists of:
//! - Length (4 bytes): Length of the payload
//! - Checksum (4 bytes): CRC32 of the payload
//! - Payload (variable): Codec output for one record

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};
use crc32fast::Hasher;
use std::io::{self, Read};

/// Size of the frame header (length + checksum)
pub const HEADER_SIZE: usize = 8;

/// Largest payload a single frame may carry
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Append one framed payload to `buf`.
///
/// Format: [length: u32][checksum: u32][payload: bytes]
pub fn encode_frame(payload: &[u8], buf: &mut Vec<u8>) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::invalid_argument(format!(
            "Record of {} bytes exceeds frame limit",
            payload.len()
        )));
    }
    buf.reserve(HEADER_SIZE + payload.len());
    buf.put_u32_le(payload.len() as u32);
    buf.put_u32_le(checksum(payload));
    buf.put_slice(payload);
    Ok(())
}

/// Read the next frame's payload into `payload`, replacing its contents.
///
/// Returns `Ok(false)` on a clean end of stream at a frame boundary. A stream
/// that ends inside a frame, or a payload that fails its checksum, is
/// reported as corruption.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, payload: &mut Vec<u8>) -> Result<bool> {
    let mut header = [0u8; HEADER_SIZE];
    let filled = fill(reader, &mut header)?;
    if filled == 0 {
        return Ok(false);
    }
    if filled < HEADER_SIZE {
        return Err(Error::corruption(format!("Truncated frame header: {} bytes", filled)));
    }

    let mut header = &header[..];
    let length = header.get_u32_le() as usize;
    let expected = header.get_u32_le();

    payload.clear();
    payload.resize(length, 0);
    let filled = fill(reader, payload)?;
    if filled < length {
        return Err(Error::corruption(format!(
            "Incomplete record: expected {} bytes, got {}",
            length, filled
        )));
    }

    let actual = checksum(payload);
    if actual != expected {
        return Err(Error::corruption(format!(
            "Checksum mismatch: expected {:#x}, got {:#x}",
            expected, actual
        )));
    }
    Ok(true)
}

/// Read until `buf` is full or the stream ends, returning the bytes read.
fn fill<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(filled)
}

/// Calculate CRC32 checksum for a payload
fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}
