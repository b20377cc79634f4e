// ============================================
// File: crates/centi-core/src/crypto/frame.rs
// ============================================
//! # Fixed-Length Framing
//!
//! Wraps a payload into a frame of exactly `size` bytes so observers
//! cannot learn the real payload length:
//!
//! ```text
//! ┌─────────────────────┬───────────────┬─────────────────────────┐
//! │ length (u64 LE, 8)  │ payload       │ random padding          │
//! └─────────────────────┴───────────────┴─────────────────────────┘
//! |<──────────────────────── size ─────────────────────────────────>|
//! ```

use bytes::{Buf, BufMut, BytesMut};

use centi_common::random::fill_random;

use super::FRAME_HEADER_SIZE;
use crate::error::{CoreError, Result};

/// Frames `data` into exactly `size` bytes with random padding.
///
/// # Errors
/// - `FrameOverflow`: `data` plus the length prefix exceeds `size`
pub fn pack_fixed(data: &[u8], size: usize) -> Result<Vec<u8>> {
    let needed = data.len().saturating_add(FRAME_HEADER_SIZE);
    if size < needed {
        return Err(CoreError::FrameOverflow {
            payload: data.len(),
            size,
        });
    }

    let mut padding = vec![0u8; size - needed];
    fill_random(&mut padding)?;

    let mut frame = BytesMut::with_capacity(size);
    frame.put_u64_le(data.len() as u64);
    frame.put_slice(data);
    frame.put_slice(&padding);
    Ok(frame.to_vec())
}

/// Extracts the payload from a frame produced by [`pack_fixed`].
///
/// # Errors
/// - `InvalidPacket`: the frame is not `size` bytes or its length prefix
///   points past the end
pub fn unpack_fixed(frame: &[u8], size: usize) -> Result<&[u8]> {
    if frame.len() != size || size < FRAME_HEADER_SIZE {
        return Err(CoreError::InvalidPacket);
    }

    let mut header = &frame[..FRAME_HEADER_SIZE];
    let length = usize::try_from(header.get_u64_le()).map_err(|_| CoreError::InvalidPacket)?;

    let end = FRAME_HEADER_SIZE
        .checked_add(length)
        .filter(|end| *end <= size)
        .ok_or(CoreError::InvalidPacket)?;
    Ok(&frame[FRAME_HEADER_SIZE..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let frame = pack_fixed(b"hello", 64).unwrap();
        assert_eq!(frame.len(), 64);
        assert_eq!(&frame[..8], &5u64.to_le_bytes());
        assert_eq!(unpack_fixed(&frame, 64).unwrap(), b"hello");
    }

    #[test]
    fn test_exact_fit() {
        let data = [0xAA; 56];
        let frame = pack_fixed(&data, 64).unwrap();
        assert_eq!(unpack_fixed(&frame, 64).unwrap(), &data);
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            pack_fixed(&[0u8; 57], 64),
            Err(CoreError::FrameOverflow { payload: 57, size: 64 })
        ));
    }

    #[test]
    fn test_empty_payload() {
        let frame = pack_fixed(b"", 16).unwrap();
        assert!(unpack_fixed(&frame, 16).unwrap().is_empty());
    }

    #[test]
    fn test_padding_is_random() {
        let a = pack_fixed(b"x", 128).unwrap();
        let b = pack_fixed(b"x", 128).unwrap();
        assert_eq!(a[..9], b[..9]);
        assert_ne!(a[9..], b[9..]);
    }

    #[test]
    fn test_unpack_rejects_wrong_size() {
        let frame = pack_fixed(b"hello", 64).unwrap();
        assert!(unpack_fixed(&frame, 63).is_err());
        assert!(unpack_fixed(&frame[..63], 64).is_err());
    }

    #[test]
    fn test_unpack_rejects_bad_length_prefix() {
        let mut frame = pack_fixed(b"hello", 64).unwrap();
        frame[..8].copy_from_slice(&57u64.to_le_bytes());
        assert!(unpack_fixed(&frame, 64).is_err());

        frame[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(unpack_fixed(&frame, 64).is_err());
    }
}
