// ============================================
// File: crates/centi-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Creation Reason
//! Two derivations live here:
//! - the hybrid session key, combining the Kyber768 and X25519 shared
//!   secrets with HKDF-SHA512
//! - the network key, stretched from a salted passphrase with Argon2i
//!
//! ## Session Key Derivation
//! ```text
//! session_key = HKDF-SHA512(
//!     ikm:  kem_shared_secret,
//!     salt: ecdh_shared_secret,
//!     info: "" ,
//!     len:  32
//! )
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Changing argument order breaks interoperability with deployed peers
//! - Never log the inputs or outputs of these functions
//!
//! ## Last Modified
//! v0.1.0 - Initial KDF implementation

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha512;
use tracing::debug;

use centi_common::SaltedPassphrase;

use super::keys::{NetworkKey, SessionKey};
use super::SYM_KEY_SIZE;
use crate::error::{CoreError, Result};

/// Combines the KEM and ECDH shared secrets into a session key.
///
/// # Errors
/// - `KeyDerivation`: HKDF expansion failed
pub fn combine_shared_secrets(kem_secret: &[u8], ecdh_secret: &[u8]) -> Result<SessionKey> {
    let hk = Hkdf::<Sha512>::new(Some(ecdh_secret), kem_secret);

    let mut okm = [0u8; SYM_KEY_SIZE];
    hk.expand(&[], &mut okm)
        .map_err(|_| CoreError::key_derivation("HKDF-SHA512 expansion failed"))?;

    Ok(SessionKey::from_bytes(okm))
}

// ============================================
// Network Key
// ============================================

/// Argon2i cost parameters for network key stretching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkKeyParams {
    /// Number of passes.
    pub time_cost: u32,
    /// Memory in KiB.
    pub memory_kib: u32,
    /// Degree of parallelism.
    pub lanes: u32,
}

impl NetworkKeyParams {
    /// Returns the default parameters with a custom lane count.
    #[must_use]
    pub fn with_lanes(lanes: u32) -> Self {
        Self {
            lanes,
            ..Self::default()
        }
    }
}

impl Default for NetworkKeyParams {
    fn default() -> Self {
        Self {
            time_cost: 3,
            memory_kib: 32 * 1024,
            lanes: 1,
        }
    }
}

/// Stretches a salted passphrase into the 32-byte network key.
///
/// Every node of a network must use the same parameters, lane count
/// included, or they will derive different keys.
///
/// # Errors
/// - `KeyDerivation`: invalid parameters or a salt shorter than 8 bytes
pub fn derive_network_key(
    passphrase: &SaltedPassphrase,
    params: NetworkKeyParams,
) -> Result<NetworkKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.lanes,
        Some(SYM_KEY_SIZE),
    )
    .map_err(|e| CoreError::key_derivation(format!("argon2 parameters: {e}")))?;

    let argon = Argon2::new(Algorithm::Argon2i, Version::V0x13, argon_params);

    let mut out = [0u8; SYM_KEY_SIZE];
    argon
        .hash_password_into(passphrase.password(), passphrase.salt(), &mut out)
        .map_err(|e| CoreError::key_derivation(format!("argon2: {e}")))?;

    debug!(
        time_cost = params.time_cost,
        memory_kib = params.memory_kib,
        lanes = params.lanes,
        "Network key derived"
    );
    Ok(NetworkKey::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> NetworkKeyParams {
        NetworkKeyParams {
            time_cost: 1,
            memory_kib: 64,
            lanes: 1,
        }
    }

    #[test]
    fn test_combine_is_deterministic() {
        let a = combine_shared_secrets(&[1u8; 32], &[2u8; 32]).unwrap();
        let b = combine_shared_secrets(&[1u8; 32], &[2u8; 32]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_combine_depends_on_both_secrets() {
        let base = combine_shared_secrets(&[1u8; 32], &[2u8; 32]).unwrap();
        assert_ne!(base, combine_shared_secrets(&[9u8; 32], &[2u8; 32]).unwrap());
        assert_ne!(base, combine_shared_secrets(&[1u8; 32], &[9u8; 32]).unwrap());
    }

    #[test]
    fn test_combine_roles_not_interchangeable() {
        let a = combine_shared_secrets(&[1u8; 32], &[2u8; 32]).unwrap();
        let b = combine_shared_secrets(&[2u8; 32], &[1u8; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_network_key_deterministic() {
        let p = SaltedPassphrase::new(b"0123456789abcdef".to_vec(), "correct horse");
        let a = derive_network_key(&p, fast_params()).unwrap();
        let b = derive_network_key(&p, fast_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_network_key_depends_on_salt() {
        let a = SaltedPassphrase::new(b"0123456789abcdef".to_vec(), "pw");
        let b = SaltedPassphrase::new(b"fedcba9876543210".to_vec(), "pw");
        assert_ne!(
            derive_network_key(&a, fast_params()).unwrap(),
            derive_network_key(&b, fast_params()).unwrap()
        );
    }

    #[test]
    fn test_network_key_short_salt_rejected() {
        let p = SaltedPassphrase::new(b"short".to_vec(), "pw");
        let result = derive_network_key(&p, fast_params());
        assert!(matches!(result, Err(CoreError::KeyDerivation { .. })));
    }

    #[test]
    fn test_default_params() {
        let params = NetworkKeyParams::default();
        assert_eq!(params.time_cost, 3);
        assert_eq!(params.memory_kib, 32 * 1024);
        assert_eq!(NetworkKeyParams::with_lanes(4).lanes, 4);
    }
}
