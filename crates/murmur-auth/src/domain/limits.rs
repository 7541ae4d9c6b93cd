//! Effective resource ceilings.
//!
//! An account's claimed limit is clipped downward by the node-wide
//! configured ceiling; whichever is stricter wins. `None` means
//! unlimited on either side.

use crate::config::AuthConfig;
use murmur_claims::Limits;

/// `min` of two optional bounds, treating `None` as +infinity.
pub fn effective(account: Option<u64>, node: Option<u64>) -> Option<u64> {
    match (account, node) {
        (Some(a), Some(n)) => Some(a.min(n)),
        (Some(a), None) => Some(a),
        (None, Some(n)) => Some(n),
        (None, None) => None,
    }
}

/// Clip every claimed limit by the node-wide configuration.
pub fn effective_limits(claimed: &Limits, config: &AuthConfig) -> Limits {
    Limits {
        max_subs: effective(claimed.max_subs, config.max_subscriptions),
        max_payload: effective(claimed.max_payload, config.max_payload),
        max_conns: effective(claimed.max_conns, config.max_connections),
    }
}
