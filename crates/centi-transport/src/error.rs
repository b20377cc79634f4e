// ============================================
// File: crates/centi-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for transport modules and the module registry.
//!
//! ## Error Categories
//! 1. **Channel Errors**: send/receive failures, inactive transports
//! 2. **Registry Errors**: unknown or duplicate module names
//! 3. **Wrapped Errors**: common encoding and validation failures
//!
//! ## ⚠️ Important Note for Next Developer
//! - Channel errors are usually transient; the node retries on the next poll
//! - Never put packet bytes in error messages
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use centi_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Channel Errors
    // ========================================

    /// Send operation failed.
    #[error("Failed to send via '{transport}': {reason}")]
    SendFailed {
        /// Transport name
        transport: String,
        /// Why send failed
        reason: String,
    },

    /// Receive operation failed.
    #[error("Failed to receive via '{transport}': {reason}")]
    ReceiveFailed {
        /// Transport name
        transport: String,
        /// Why receive failed
        reason: String,
    },

    /// Channels were not initialised, or were deleted.
    #[error("Transport '{0}' is not active")]
    NotActive(String),

    /// Payload exceeds what the transport can carry.
    #[error("Payload of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Transport limit
        limit: usize,
    },

    // ========================================
    // Registry Errors
    // ========================================

    /// No module registered under this name.
    #[error("Unknown transport module '{0}'")]
    UnknownModule(String),

    /// A module with this name is already registered.
    #[error("Transport module '{0}' is already registered")]
    ModuleAlreadyRegistered(String),

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `SendFailed` error.
    pub fn send_failed(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ReceiveFailed` error.
    pub fn receive_failed(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReceiveFailed {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SendFailed { .. } | Self::ReceiveFailed { .. })
    }

    /// Returns `true` if this is a registry error.
    #[must_use]
    pub const fn is_registry_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownModule(_) | Self::ModuleAlreadyRegistered(_)
        )
    }
}

// ============================================
// Tests
// ============================================
