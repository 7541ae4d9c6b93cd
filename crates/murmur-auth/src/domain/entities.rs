//! Live authorization entities.
//!
//! An `Account` is created on first successful resolve and mutated in
//! place by every later claims update; its derived tables are always a
//! pure function of the last successfully applied claims. A
//! `Connection`'s permission and limit snapshot is fixed at authorization
//! time and never rewritten.

use crate::service::expiry::ExpiryTimer;
use murmur_claims::{AccountClaims, Export, ExportKind, Limits, Permissions, Subject};
use murmur_keys::PublicId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// An import that passed resolution against the exporter's exports (and
/// activation-token checks, when required).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    /// The exporting account.
    pub exporter: PublicId,
    /// Subject on the exporter's side.
    pub remote_subject: Subject,
    /// Subject the import is known by locally (the rewrite, if any).
    pub local_subject: Subject,
    pub kind: ExportKind,
    /// Activation expiry bounding any shadow derived from this import.
    pub expires: Option<u64>,
}

/// A shadow-subscription record handed to the external routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowRecord {
    pub id: Uuid,
    pub conn_id: Uuid,
    pub sid: u64,
    /// Upstream account the shadow mirrors.
    pub exporter: PublicId,
    /// Upstream subject the shadow mirrors.
    pub remote_subject: Subject,
    /// Local subject the importing subscription listens on.
    pub local_subject: Subject,
}

/// A shadow subscription attached to one local subscription.
#[derive(Debug)]
pub struct ShadowSub {
    pub record: ShadowRecord,
    /// Activation expiry bounding this shadow's lifetime, if any.
    pub expires: Option<u64>,
    pub(crate) timer: Option<ExpiryTimer>,
}

/// A local subscription with its derived shadows.
#[derive(Debug)]
pub struct Subscription {
    pub sid: u64,
    pub subject: Subject,
    pub shadows: Vec<ShadowSub>,
}

/// Why a connection was closed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    AccountExpired,
    UserExpired,
    MaxSubscriptionsExceeded,
    /// Orderly teardown requested by the protocol layer.
    ClientClosed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CloseReason::AccountExpired => "Account Authentication Expired",
            CloseReason::UserExpired => "User Authentication Expired",
            CloseReason::MaxSubscriptionsExceeded => "Maximum Subscriptions Exceeded",
            CloseReason::ClientClosed => "Client Closed",
        };
        f.write_str(msg)
    }
}

// =============================================================================
// ACCOUNT
// =============================================================================

pub(crate) struct AccountState {
    pub claims: AccountClaims,
    /// Derived export table, keyed by export subject.
    pub exports: HashMap<Subject, Export>,
    /// Derived import table, keyed by local subject; holds only imports
    /// that passed verification.
    pub imports: HashMap<Subject, ResolvedImport>,
    /// Claimed limits clipped by node-wide configuration.
    pub limits: Limits,
    pub conns: HashMap<Uuid, Arc<Connection>>,
    /// Live subscription count across all of the account's connections.
    pub subs_total: u64,
    /// Unix seconds of the last successful claims application.
    pub updated_at: u64,
    pub expired: bool,
    pub expiry_timer: Option<ExpiryTimer>,
}

/// Live, in-registry account state.
pub struct Account {
    pub id: PublicId,
    pub(crate) state: Mutex<AccountState>,
}

impl Account {
    pub(crate) fn new(
        id: PublicId,
        claims: AccountClaims,
        exports: HashMap<Subject, Export>,
        limits: Limits,
        now: u64,
    ) -> Self {
        let expired = claims.is_expired(now);
        Self {
            id,
            state: Mutex::new(AccountState {
                claims,
                exports,
                imports: HashMap::new(),
                limits,
                conns: HashMap::new(),
                subs_total: 0,
                updated_at: now,
                expired,
                expiry_timer: None,
            }),
        }
    }

    /// Number of entries in the derived export table.
    pub fn export_count(&self) -> usize {
        self.state.lock().exports.len()
    }

    /// Number of verified entries in the derived import table.
    pub fn import_count(&self) -> usize {
        self.state.lock().imports.len()
    }

    /// Look up a verified import by its local subject.
    pub fn import(&self, local_subject: &Subject) -> Option<ResolvedImport> {
        self.state.lock().imports.get(local_subject).cloned()
    }

    /// Effective (node-clipped) limits.
    pub fn limits(&self) -> Limits {
        self.state.lock().limits
    }

    /// Live attached connections.
    pub fn connection_count(&self) -> usize {
        self.state.lock().conns.len()
    }

    /// Live subscriptions across all connections.
    pub fn subscription_count(&self) -> u64 {
        self.state.lock().subs_total
    }

    /// Whether the account is currently marked expired.
    pub fn is_expired(&self) -> bool {
        self.state.lock().expired
    }

    /// Unix seconds of the last successful claims application.
    pub fn last_updated(&self) -> u64 {
        self.state.lock().updated_at
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account").field("id", &self.id).finish()
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

#[derive(Debug)]
pub(crate) struct ConnState {
    pub subs: HashMap<u64, Subscription>,
    pub expiry_timer: Option<ExpiryTimer>,
    pub closed: bool,
}

/// A live authorized client connection.
///
/// The permission set and limit ceilings are snapshots taken at
/// authorization time; later account updates act on the live counters or
/// close the connection, never on this snapshot.
pub struct Connection {
    pub id: Uuid,
    pub account: Arc<Account>,
    pub permissions: Permissions,
    /// Effective subscription ceiling at authorization time.
    pub max_subs: Option<u64>,
    /// Effective payload ceiling at authorization time.
    pub max_payload: Option<u64>,
    pub(crate) state: Mutex<ConnState>,
    pub(crate) events: UnboundedSender<CloseReason>,
}

impl Connection {
    /// Subscriptions currently held by this connection.
    pub fn sub_count(&self) -> usize {
        self.state.lock().subs.len()
    }

    /// Shadow subscriptions attached to one subscription, if it exists.
    pub fn shadow_count(&self, sid: u64) -> Option<usize> {
        self.state.lock().subs.get(&sid).map(|s| s.shadows.len())
    }

    /// Whether the server has closed this connection.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("account", &self.account.id)
            .finish()
    }
}

/// What the protocol layer holds after a successful authorization: the
/// connection plus the channel on which forced closes are delivered.
#[derive(Debug)]
pub struct ClientHandle {
    pub connection: Arc<Connection>,
    pub closed: UnboundedReceiver<CloseReason>,
}
