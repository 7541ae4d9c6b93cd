//! Error taxonomy for the authorization subsystem.
//!
//! Display strings for limit and expiry violations are part of the
//! operator-facing contract and must not change.

use murmur_claims::ClaimsError;
use murmur_keys::PublicId;
use thiserror::Error;

/// Errors produced while authorizing connections and enforcing limits.
///
/// Every variant is scoped to a single connection, subscription, or
/// import; none is process-fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The connect payload is missing its credential or nonce signature.
    #[error("Authorization Violation")]
    MissingCredentials,

    /// The credential failed to decode or its envelope signature is bad.
    #[error("Invalid credential: {0}")]
    BadCredentials(#[from] ClaimsError),

    /// The nonce proof signature does not verify under the user's key.
    #[error("Nonce signature verification failed")]
    BadNonceSignature,

    /// The account claims' issuer is not in the trusted operator set.
    #[error("Untrusted issuer")]
    UntrustedIssuer,

    /// The user claims were not issued by the account they name, or a
    /// claims subject does not carry the expected role.
    #[error("Issuer mismatch")]
    WrongIssuer,

    /// The user credential's validity window has ended.
    #[error("User Authentication Expired")]
    ExpiredUser,

    /// The owning account's validity window has ended.
    #[error("Account Authentication Expired")]
    ExpiredAccount,

    /// The resolver has no claims for this account.
    #[error("Account not found: {0}")]
    AccountNotFound(PublicId),

    /// The resolver store is unreachable; prior state is retained and a
    /// later re-fetch may succeed.
    #[error("Account resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// The connection was already closed by the server; no further
    /// operations may be charged against its account.
    #[error("Connection Closed")]
    ConnectionClosed,

    /// The user's permission set does not cover this operation.
    #[error("Permissions Violation for {operation} to {subject:?}")]
    PermissionViolation {
        operation: &'static str,
        subject: String,
    },

    /// The account's connection ceiling is reached.
    #[error("Maximum Connections Exceeded")]
    MaxConnectionsExceeded,

    /// The account's subscription ceiling is reached.
    #[error("Maximum Subscriptions Exceeded")]
    MaxSubscriptionsExceeded,

    /// The message payload exceeds the effective ceiling. The connection
    /// itself stays up.
    #[error("Maximum Payload Violation")]
    MaxPayloadExceeded,
}
