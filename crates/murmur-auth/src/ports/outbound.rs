//! Outbound ports: capabilities this subsystem needs from collaborators.

use crate::domain::entities::ShadowRecord;
use async_trait::async_trait;
use murmur_keys::PublicId;
use thiserror::Error;

/// Error from account resolver operations.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The backing store is unreachable. Treated as not-found for this
    /// attempt; the caller retains prior state.
    #[error("Resolver unavailable: {0}")]
    Unavailable(String),

    /// This resolver variant does not support storing claims.
    #[error("Store not supported by this resolver")]
    Unsupported,
}

/// Pluggable lookup of an account's current signed claims by public
/// identifier.
///
/// Consulted only on a registry cache miss or a scheduled re-fetch. May
/// block on I/O; must never be called while an entity lock is held.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Fetch the current claims envelope for `account`. Not-found is a
    /// distinguishable outcome (`Ok(None)`), not an error.
    async fn fetch(&self, account: &PublicId) -> Result<Option<String>, ResolverError>;

    /// Store or overwrite claims for `account` (in-memory variant only).
    async fn store(&self, account: &PublicId, claims: String) -> Result<(), ResolverError>;
}

/// Out-of-band retrieval of activation token envelopes by URL.
#[async_trait]
pub trait ActivationFetcher: Send + Sync {
    /// GET `url` and return the response body verbatim as the credential
    /// string.
    async fn fetch_token(&self, url: &str) -> Result<String, ResolverError>;
}

/// Hook into the external routing table for shadow subscriptions.
///
/// Implementations must be cheap and non-blocking; calls may happen with
/// entity locks held.
pub trait RouteSink: Send + Sync {
    fn install_shadow(&self, record: &ShadowRecord);
    fn remove_shadow(&self, record: &ShadowRecord);
}
