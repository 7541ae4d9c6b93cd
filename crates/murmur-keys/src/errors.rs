//! Error types for identity key handling.

use thiserror::Error;

/// Errors that can occur parsing identifiers or verifying signatures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The identifier or seed carries an unknown role prefix.
    #[error("Invalid role prefix: {0:?}")]
    InvalidPrefix(char),

    /// The identifier or seed body is not valid hex of the right length.
    #[error("Invalid key encoding")]
    InvalidEncoding,

    /// The bytes do not form a valid Ed25519 public key point.
    #[error("Invalid public key")]
    InvalidKey,

    /// Signature is malformed (wrong length) or does not verify.
    #[error("Signature verification failed")]
    InvalidSignature,
}
