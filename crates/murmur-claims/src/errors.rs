//! Error types for claim encoding and decoding.

use thiserror::Error;

/// Errors that can occur handling credential envelopes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimsError {
    /// The envelope is structurally broken: wrong segment count, bad
    /// base64, or a payload that does not deserialize.
    #[error("Malformed credential")]
    Malformed,

    /// The header names an algorithm this implementation does not speak.
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not verify under the issuer's public key.
    #[error("Credential signature verification failed")]
    BadSignature,

    /// The envelope decoded fine but carries the wrong claim kind.
    #[error("Unexpected claim kind: expected {expected}, got {got}")]
    UnexpectedKind {
        expected: &'static str,
        got: String,
    },

    /// A subject pattern inside the payload is invalid.
    #[error("Invalid subject: {0:?}")]
    InvalidSubject(String),
}
