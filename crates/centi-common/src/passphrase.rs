// ============================================
// File: crates/centi-common/src/passphrase.rs
// ============================================
//! # Salted Passphrases
//!
//! Network keys are configured as `<base64 salt>:<password>`. Only the
//! first `:` separates the two parts; the password itself may contain
//! further colons.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{CommonError, Result};

/// A password paired with the salt it should be stretched with.
#[derive(Clone, PartialEq, Eq)]
pub struct SaltedPassphrase {
    salt: Vec<u8>,
    password: String,
}

impl SaltedPassphrase {
    /// Creates a passphrase from its parts.
    pub fn new(salt: impl Into<Vec<u8>>, password: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            password: password.into(),
        }
    }

    /// Returns the decoded salt bytes.
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Returns the password bytes.
    #[must_use]
    pub fn password(&self) -> &[u8] {
        self.password.as_bytes()
    }
}

impl FromStr for SaltedPassphrase {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        let (salt, password) = s
            .split_once(':')
            .ok_or_else(|| CommonError::invalid_input("passphrase", "no salt supplied"))?;
        let salt = STANDARD.decode(salt)?;
        Ok(Self::new(salt, password))
    }
}

impl fmt::Debug for SaltedPassphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaltedPassphrase")
            .field("salt_len", &self.salt.len())
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let p: SaltedPassphrase = "c2FsdHNhbHQ=:hunter2".parse().unwrap();
        assert_eq!(p.salt(), b"saltsalt");
        assert_eq!(p.password(), b"hunter2");
    }

    #[test]
    fn test_parse_password_with_colons() {
        let p: SaltedPassphrase = "c2FsdHNhbHQ=:a:b:c".parse().unwrap();
        assert_eq!(p.password(), b"a:b:c");
    }

    #[test]
    fn test_parse_missing_salt() {
        let err = "no-delimiter".parse::<SaltedPassphrase>().unwrap_err();
        assert!(matches!(err, CommonError::InvalidInput { .. }));
    }

    #[test]
    fn test_parse_bad_base64() {
        let err = "***:password".parse::<SaltedPassphrase>().unwrap_err();
        assert!(matches!(err, CommonError::Decoding { .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let p = SaltedPassphrase::new(b"saltsalt".to_vec(), "topsecret");
        assert!(!format!("{p:?}").contains("topsecret"));
    }
}
