//! Node-wide authorization configuration.

use serde::Deserialize;
use std::time::Duration;

/// Node-wide ceilings and tunables.
///
/// Ceilings set here clip account-claimed limits downward; `None` leaves
/// the account's own limit in force.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Node-wide subscription ceiling per account.
    pub max_subscriptions: Option<u64>,
    /// Node-wide payload-size ceiling in bytes.
    pub max_payload: Option<u64>,
    /// Node-wide connection ceiling per account.
    pub max_connections: Option<u64>,
    /// Minimum seconds between resolver re-fetches of one account,
    /// counted from its last successful claims application.
    pub refetch_min_interval_secs: u64,
    /// Timeout applied to resolver and token-fetch HTTP requests.
    pub resolver_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_subscriptions: None,
            max_payload: None,
            max_connections: None,
            refetch_min_interval_secs: 60,
            resolver_timeout_secs: 2,
        }
    }
}

impl AuthConfig {
    /// Timeout applied when building HTTP resolver/fetcher clients.
    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_secs)
    }
}
