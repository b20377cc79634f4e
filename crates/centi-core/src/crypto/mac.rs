// ============================================
// File: crates/centi-core/src/crypto/mac.rs
// ============================================
//! # Keyed Hashing
//!
//! HMAC-SHA512 tags for packet bodies, handshake blobs and public key
//! distribution. Verification goes through `Mac::verify_slice`, which
//! compares in constant time.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};

use centi_common::error::CommonError;

use super::HASH_SIZE;
use crate::error::Result;

type HmacSha512 = Hmac<Sha512>;

/// Computes HMAC-SHA512 of `data` under `key`.
///
/// # Errors
/// Returns an input error if the MAC cannot be keyed.
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; HASH_SIZE]> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
        .map_err(|e| CommonError::invalid_input("hmac key", e.to_string()))?;
    mac.update(data);
    let mut tag = [0u8; HASH_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Verifies an HMAC-SHA512 tag in constant time.
#[must_use]
pub fn verify_hmac_sha512(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let Ok(mut mac) = <HmacSha512 as Mac>::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

/// Returns the lowercase hex SHA-512 digest of `data`.
///
/// Used to give peers learned only by public key a stable alias.
#[must_use]
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}
