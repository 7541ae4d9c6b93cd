//! Application service layer.
//!
//! `AuthService` wires the domain logic to the ports: it owns the
//! account registry, consults the resolver and activation fetcher, pushes
//! shadow records at the route sink, and enforces limits at connect,
//! subscribe, and publish time.

mod imports;
mod registry;
mod shadow;

pub(crate) mod expiry;

use crate::config::AuthConfig;
use crate::domain::entities::{
    Account, ClientHandle, CloseReason, ConnState, Connection, Subscription,
};
use crate::domain::errors::AuthError;
use crate::domain::trust;
use crate::ports::inbound::{AuthApi, AuthRequest};
use crate::ports::outbound::{AccountResolver, ActivationFetcher, RouteSink};
use crate::service::expiry::ExpiryTimer;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use murmur_claims::{decode_user, now_secs, Subject};
use murmur_keys::{KeyRole, PublicId};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Length of the connect-time challenge nonce.
const NONCE_LEN: usize = 16;

/// Generate a random challenge nonce for a server greeting.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// The authorization service: trust roots, node config, account
/// registry, and the outbound capabilities.
///
/// Lock order is always registry map → account → connection; resolver
/// and token fetches run with no lock held.
pub struct AuthService {
    trusted: HashSet<PublicId>,
    pub(crate) config: AuthConfig,
    pub(crate) resolver: Arc<dyn AccountResolver>,
    pub(crate) fetcher: Arc<dyn ActivationFetcher>,
    pub(crate) routes: Arc<dyn RouteSink>,
    pub(crate) accounts: Mutex<HashMap<PublicId, Arc<Account>>>,
    /// Weak self-reference so timer tasks never keep the service alive.
    pub(crate) self_ref: Weak<AuthService>,
}

impl AuthService {
    /// Build the service. The trusted set is the explicit allow-list of
    /// root identifiers account claims may be issued by.
    pub fn new(
        trusted: HashSet<PublicId>,
        config: AuthConfig,
        resolver: Arc<dyn AccountResolver>,
        fetcher: Arc<dyn ActivationFetcher>,
        routes: Arc<dyn RouteSink>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            trusted,
            config,
            resolver,
            fetcher,
            routes,
            accounts: Mutex::new(HashMap::new()),
            self_ref: self_ref.clone(),
        })
    }

    pub(crate) fn trusted(&self) -> &HashSet<PublicId> {
        &self.trusted
    }

    async fn authorize_inner(&self, request: AuthRequest) -> Result<ClientHandle, AuthError> {
        let jwt = request
            .jwt
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingCredentials)?;
        let sig_b64 = request
            .sig
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        // Decoding verifies the envelope signature under `iss`, i.e. the
        // owning account's key.
        let user = decode_user(jwt)?;

        // Proof of possession: the client signed our nonce with the key
        // named by the user claims' subject.
        let sig = BASE64_STANDARD
            .decode(sig_b64)
            .map_err(|_| AuthError::BadNonceSignature)?;
        user.sub
            .verify(request.nonce.as_bytes(), &sig)
            .map_err(|_| AuthError::BadNonceSignature)?;

        if user.iss.role() != KeyRole::Account {
            return Err(AuthError::WrongIssuer);
        }
        let account = self.lookup_or_load(&user.iss).await?;
        trust::verify_user(&user, &account.id)?;

        let now = now_secs();
        if user.is_expired(now) {
            return Err(AuthError::ExpiredUser);
        }

        let (events, closed) = mpsc::unbounded_channel();
        let conn = {
            let mut st = account.state.lock();
            if st.expired || st.claims.is_expired(now) {
                return Err(AuthError::ExpiredAccount);
            }
            if let Some(max) = st.limits.max_conns {
                if st.conns.len() as u64 >= max {
                    return Err(AuthError::MaxConnectionsExceeded);
                }
            }
            let conn = Arc::new(Connection {
                id: Uuid::new_v4(),
                account: account.clone(),
                permissions: user.payload.permissions.clone(),
                max_subs: st.limits.max_subs,
                max_payload: st.limits.max_payload,
                state: Mutex::new(ConnState {
                    subs: HashMap::new(),
                    expiry_timer: None,
                    closed: false,
                }),
                events,
            });
            st.conns.insert(conn.id, conn.clone());
            conn
        };

        if let Some(exp) = user.exp {
            let service = self.self_ref.clone();
            let conn_weak = Arc::downgrade(&conn);
            let timer = ExpiryTimer::arm(exp, async move {
                if let (Some(service), Some(conn)) = (service.upgrade(), conn_weak.upgrade()) {
                    debug!(conn = %conn.id, "user credential expired");
                    service.disconnect_inner(&conn, CloseReason::UserExpired);
                }
            });
            conn.state.lock().expiry_timer = Some(timer);
        }

        info!(conn = %conn.id, account = %account.id, user = %user.sub, "connection authorized");
        Ok(ClientHandle {
            connection: conn,
            closed,
        })
    }

    fn subscribe_inner(
        &self,
        conn: &Arc<Connection>,
        sid: u64,
        subject: Subject,
    ) -> Result<(), AuthError> {
        if !conn.permissions.can_subscribe(subject.as_str()) {
            return Err(AuthError::PermissionViolation {
                operation: "subscription",
                subject: subject.to_string(),
            });
        }

        // Re-subscribing an existing sid replaces the subscription.
        if conn.state.lock().subs.contains_key(&sid) {
            self.unsubscribe_inner(conn, sid);
        }

        // Both locks stay held through the insert so a concurrent claims
        // application either sees the new subscription or runs fully
        // before it; no shadow can be derived from a stale import table.
        let mut acct = conn.account.state.lock();
        let mut st = conn.state.lock();
        if st.closed {
            // A forced close won the race; the account no longer tracks
            // this connection.
            return Err(AuthError::ConnectionClosed);
        }
        if let Some(max) = acct.limits.max_subs {
            if acct.subs_total >= max {
                return Err(AuthError::MaxSubscriptionsExceeded);
            }
        }
        acct.subs_total += 1;

        let mut sub = Subscription {
            sid,
            subject,
            shadows: Vec::new(),
        };
        self.reconcile_sub(conn, &mut sub, &acct.imports);
        debug!(conn = %conn.id, sid, subject = %sub.subject, shadows = sub.shadows.len(), "subscription added");
        st.subs.insert(sid, sub);
        Ok(())
    }

    fn unsubscribe_inner(&self, conn: &Arc<Connection>, sid: u64) {
        let removed = conn.state.lock().subs.remove(&sid);
        if let Some(sub) = removed {
            for shadow in &sub.shadows {
                if let Some(timer) = &shadow.timer {
                    timer.cancel();
                }
                self.routes.remove_shadow(&shadow.record);
            }
            let mut st = conn.account.state.lock();
            st.subs_total = st.subs_total.saturating_sub(1);
            debug!(conn = %conn.id, sid, "subscription removed");
        }
    }

    fn check_publish_inner(
        &self,
        conn: &Connection,
        subject: &str,
        payload_len: usize,
    ) -> Result<(), AuthError> {
        if !conn.permissions.can_publish(subject) {
            return Err(AuthError::PermissionViolation {
                operation: "publish",
                subject: subject.to_string(),
            });
        }
        if let Some(max) = conn.max_payload {
            if payload_len as u64 > max {
                return Err(AuthError::MaxPayloadExceeded);
            }
        }
        Ok(())
    }

    pub(crate) fn disconnect_inner(&self, conn: &Arc<Connection>, reason: CloseReason) {
        let subs = {
            let mut st = conn.state.lock();
            if st.closed {
                return;
            }
            st.closed = true;
            // Teardown supersedes any pending user-expiry fire.
            if let Some(timer) = st.expiry_timer.take() {
                timer.cancel();
            }
            std::mem::take(&mut st.subs)
        };

        let n = subs.len() as u64;
        for sub in subs.into_values() {
            for shadow in &sub.shadows {
                if let Some(timer) = &shadow.timer {
                    timer.cancel();
                }
                self.routes.remove_shadow(&shadow.record);
            }
        }

        {
            let mut st = conn.account.state.lock();
            st.conns.remove(&conn.id);
            st.subs_total = st.subs_total.saturating_sub(n);
        }

        let _ = conn.events.send(reason);
        info!(conn = %conn.id, account = %conn.account.id, %reason, "connection closed");
    }
}

#[async_trait]
impl AuthApi for AuthService {
    async fn authorize(&self, request: AuthRequest) -> Result<ClientHandle, AuthError> {
        self.authorize_inner(request).await
    }

    fn subscribe(
        &self,
        conn: &Arc<Connection>,
        sid: u64,
        subject: Subject,
    ) -> Result<(), AuthError> {
        self.subscribe_inner(conn, sid, subject)
    }

    fn unsubscribe(&self, conn: &Arc<Connection>, sid: u64) {
        self.unsubscribe_inner(conn, sid)
    }

    fn check_publish(
        &self,
        conn: &Connection,
        subject: &str,
        payload_len: usize,
    ) -> Result<(), AuthError> {
        self.check_publish_inner(conn, subject, payload_len)
    }

    fn disconnect(&self, conn: &Arc<Connection>, reason: CloseReason) {
        self.disconnect_inner(conn, reason)
    }
}
