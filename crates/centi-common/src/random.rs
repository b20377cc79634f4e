// ============================================
// File: crates/centi-common/src/random.rs
// ============================================
//! # Randomness Helpers
//!
//! ## Creation Reason
//! Padding, nonces, relay selection and send jitter all draw from the
//! operating system CSPRNG. These helpers keep that in one place and turn
//! RNG failure into a typed error instead of a panic.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always use `OsRng` here, never `thread_rng()` for key-adjacent data
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

use std::time::Duration;

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::error::{CommonError, Result};

/// Fills `buf` with cryptographically secure random bytes.
///
/// # Errors
/// Returns `CommonError::Internal` if the OS RNG is unavailable.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CommonError::internal(format!("OS random source failed: {e}")))
}

/// Returns `len` cryptographically secure random bytes.
///
/// # Errors
/// Returns `CommonError::Internal` if the OS RNG is unavailable.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf)?;
    Ok(buf)
}

/// Picks a uniformly random index in `0..upper`.
///
/// # Errors
/// Returns `CommonError::InvalidInput` if `upper` is zero.
pub fn random_index(upper: usize) -> Result<usize> {
    if upper == 0 {
        return Err(CommonError::invalid_input("upper", "cannot pick from an empty range"));
    }
    Ok(OsRng.gen_range(0..upper))
}

/// Returns a random duration in `[min, max]`.
///
/// If `max <= min` the result is `min`.
#[must_use]
pub fn random_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = max - min;
    let nanos = u64::try_from(span.as_nanos()).unwrap_or(u64::MAX);
    min + Duration::from_nanos(OsRng.gen_range(0..=nanos))
}
