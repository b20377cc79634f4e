// ============================================
// File: crates/centi-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Failures that do not belong to any one layer: passphrase parsing,
//! text encodings and the OS random source.
//!
//! ## Main Functionality
//! - `CommonError`: validation, encoding and randomness failures
//! - `From` impls for the base64 and hex decoders
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include key bytes or passwords in error messages
//! - Each crate wraps `CommonError` in its own error enum
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;
use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across centi crates.
///
/// # Categories
/// - **Validation**: Bad passphrases, keys and numeric bounds
/// - **Encoding**: base64, hex and JSON failures
/// - **Internal**: The OS random source
///
/// # Example
/// ```
/// use centi_common::error::{CommonError, Result};
///
/// fn validate_alias(alias: &str) -> Result<()> {
///     if alias.is_empty() {
///         return Err(CommonError::invalid_input("alias", "cannot be empty"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Value is out of acceptable range.
    #[error("Value out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        /// The value that was out of range
        value: String,
        /// Minimum acceptable value
        min: String,
        /// Maximum acceptable value
        max: String,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Failed to encode/serialize data.
    #[error("Encoding error: {context}")]
    Encoding {
        /// What was being encoded
        context: String,
        /// Error details
        details: String,
    },

    /// Failed to decode/deserialize data.
    #[error("Decoding error: {context}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },

    // ========================================
    // Internal Errors
    // ========================================

    /// Local failure outside the caller's control (OS randomness).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong
        message: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `OutOfRange` error.
    pub fn out_of_range(
        value: impl fmt::Display,
        min: impl fmt::Display,
        max: impl fmt::Display,
    ) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Creates an `Encoding` error.
    pub fn encoding(context: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::Encoding {
            context: context.into(),
            details: details.to_string(),
        }
    }

    /// Creates a `Decoding` error.
    pub fn decoding(context: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::Decoding {
            context: context.into(),
            details: details.to_string(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error was caused by bad input rather than
    /// a local failure.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::OutOfRange { .. } | Self::Decoding { .. }
        )
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<base64::DecodeError> for CommonError {
    fn from(err: base64::DecodeError) -> Self {
        Self::decoding("base64 decode", err)
    }
}

impl From<hex::FromHexError> for CommonError {
    fn from(err: hex::FromHexError) -> Self {
        Self::decoding("hex decode", err)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("alias", "cannot be empty");
        assert!(err.to_string().contains("alias"));
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CommonError::out_of_range(7, 0, 5).is_input_error());
        assert!(!CommonError::internal("rng").is_input_error());
        assert!(!CommonError::encoding("packet document", "bad").is_input_error());
    }

    #[test]
    fn test_base64_error_conversion() {
        use base64::Engine as _;
        let err = base64::engine::general_purpose::STANDARD
            .decode("!!not base64!!")
            .unwrap_err();
        let common_err: CommonError = err.into();
        assert!(matches!(common_err, CommonError::Decoding { .. }));
    }
}
