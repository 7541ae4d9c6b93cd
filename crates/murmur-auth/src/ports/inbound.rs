//! Inbound port: the authorization API consumed by the protocol layer.

use crate::domain::entities::{ClientHandle, CloseReason, Connection};
use crate::domain::errors::AuthError;
use async_trait::async_trait;
use murmur_claims::Subject;
use std::sync::Arc;

/// Decoded CONNECT fields this subsystem consumes, plus the nonce the
/// server issued in its greeting for this connection.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// The user credential envelope.
    pub jwt: Option<String>,
    /// Standard-base64 Ed25519 signature over the nonce bytes.
    pub sig: Option<String>,
    /// The nonce this connection was challenged with.
    pub nonce: String,
}

/// Authorization and enforcement surface for one broker node.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Verify the credential chain and the nonce proof, resolve the
    /// owning account, and attach a new connection to it.
    ///
    /// May block on resolver I/O for an account cache miss.
    async fn authorize(&self, request: AuthRequest) -> Result<ClientHandle, AuthError>;

    /// Register a subscription, enforcing permissions and the
    /// subscription ceiling, and derive shadow subscriptions for any
    /// matching imports.
    fn subscribe(&self, conn: &Arc<Connection>, sid: u64, subject: Subject)
        -> Result<(), AuthError>;

    /// Remove a subscription and its shadows.
    fn unsubscribe(&self, conn: &Arc<Connection>, sid: u64);

    /// Enforce publish permissions and the payload ceiling. A violation
    /// rejects the message only; the connection stays up.
    fn check_publish(
        &self,
        conn: &Connection,
        subject: &str,
        payload_len: usize,
    ) -> Result<(), AuthError>;

    /// Tear a connection down: remove its subscriptions and shadows,
    /// cancel its timers, detach it from its account, and deliver
    /// `reason` on the connection's close channel.
    fn disconnect(&self, conn: &Arc<Connection>, reason: CloseReason);
}
