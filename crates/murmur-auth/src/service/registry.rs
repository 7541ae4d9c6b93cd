//! The account registry: lazy loading, claims application, and
//! account-credential expiration.
//!
//! `apply_account_claims` is the single mutation path for account state.
//! It recomputes the derived export/import/limit tables from the given
//! claims every time — never an incremental diff — so the derived state
//! is always exactly reproducible from current claims plus current
//! exporter state.

use crate::domain::entities::{Account, CloseReason, Connection};
use crate::domain::errors::AuthError;
use crate::domain::{limits, trust};
use crate::service::expiry::ExpiryTimer;
use crate::service::AuthService;
use murmur_claims::{decode_account, now_secs, AccountClaims, Export, Subject};
use murmur_keys::PublicId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Export table keyed by export subject, derived purely from claims.
fn derive_exports(claims: &AccountClaims) -> HashMap<Subject, Export> {
    claims
        .payload
        .exports
        .iter()
        .map(|e| (e.subject.clone(), e.clone()))
        .collect()
}

impl AuthService {
    /// Return the live account, loading it through the resolver on a
    /// cache miss. The resolver runs with no locks held.
    pub async fn lookup_or_load(&self, id: &PublicId) -> Result<Arc<Account>, AuthError> {
        if let Some(account) = self.accounts.lock().get(id).cloned() {
            return Ok(account);
        }

        let jwt = self
            .resolver
            .fetch(id)
            .await
            .map_err(|e| AuthError::ResolverUnavailable(e.to_string()))?
            .ok_or(AuthError::AccountNotFound(*id))?;
        let claims = decode_account(&jwt)?;
        trust::verify_account(&claims, self.trusted())?;
        if claims.sub != *id {
            return Err(AuthError::WrongIssuer);
        }

        self.install_account(claims).await
    }

    /// Apply externally delivered account claims: update the live
    /// account if one exists, otherwise create it. The claims must
    /// verify against the trusted roots.
    pub async fn update_account_claims(&self, jwt: &str) -> Result<Arc<Account>, AuthError> {
        let claims = decode_account(jwt)?;
        trust::verify_account(&claims, self.trusted())?;

        let existing = self.accounts.lock().get(&claims.sub).cloned();
        match existing {
            Some(account) => {
                self.apply_account_claims(&account, claims).await?;
                Ok(account)
            }
            None => self.install_account(claims).await,
        }
    }

    /// Insert a new account, exports and limits visible immediately so
    /// that cyclic imports resolve in one pass, then run the full
    /// claims application.
    async fn install_account(&self, claims: AccountClaims) -> Result<Arc<Account>, AuthError> {
        let id = claims.sub;
        let now = now_secs();
        let (account, fresh) = {
            let mut map = self.accounts.lock();
            match map.get(&id) {
                // Lost a load race; the winner runs the application.
                Some(existing) => (existing.clone(), false),
                None => {
                    let account = Arc::new(Account::new(
                        id,
                        claims.clone(),
                        derive_exports(&claims),
                        limits::effective_limits(&claims.payload.limits, &self.config),
                        now,
                    ));
                    map.insert(id, account.clone());
                    (account, true)
                }
            }
        };
        if fresh {
            info!(account = %id, "account loaded");
            self.apply_account_claims(&account, claims).await?;
        }
        Ok(account)
    }

    /// Recompute the account's derived state from `claims` and swap it
    /// in atomically, then reconcile shadows, re-check ceilings, and
    /// re-arm the expiration timer.
    ///
    /// Idempotent: re-applying identical claims yields identical derived
    /// tables and no routing churn beyond timer re-arming.
    ///
    /// Boxed because import resolution can recursively load the
    /// exporting account, which applies *its* claims.
    pub fn apply_account_claims<'a>(
        &'a self,
        account: &'a Arc<Account>,
        claims: AccountClaims,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuthError>> + Send + 'a>> {
        Box::pin(async move {
            // Phase A: import resolution does resolver and token I/O;
            // no entity lock may be held here.
            let imports = self.resolve_imports(&account.id, &claims).await;

            // Phase B: rebuild derived state from empty and swap under
            // the account lock.
            let now = now_secs();
            let (conns, imports_snapshot, max_subs, expired) = {
                let mut st = account.state.lock();
                st.exports = derive_exports(&claims);
                st.imports = imports;
                st.limits = limits::effective_limits(&claims.payload.limits, &self.config);
                st.expired = claims.is_expired(now);
                st.claims = claims;
                st.updated_at = now;

                // Cancel the stale timer before arming the new one; at
                // most one pending timer per credential.
                if let Some(timer) = st.expiry_timer.take() {
                    timer.cancel();
                }
                if !st.expired {
                    if let Some(exp) = st.claims.exp {
                        st.expiry_timer = Some(self.arm_account_expiry(account, exp));
                    }
                }

                (
                    st.conns.values().cloned().collect::<Vec<_>>(),
                    st.imports.clone(),
                    st.limits.max_subs,
                    st.expired,
                )
            };
            debug!(
                account = %account.id,
                imports = imports_snapshot.len(),
                "account claims applied"
            );

            // Phase C: act on connections outside the account lock.
            for conn in &conns {
                self.reconcile_connection(conn, &imports_snapshot);
            }
            if let Some(max) = max_subs {
                self.enforce_sub_ceiling(account, max);
            }
            if expired {
                for conn in &conns {
                    self.disconnect_inner(conn, CloseReason::AccountExpired);
                }
            }
            Ok(())
        })
    }

    /// Disconnect connections, most subscriptions first, until the
    /// account's live subscription count fits the ceiling again.
    fn enforce_sub_ceiling(&self, account: &Arc<Account>, max: u64) {
        loop {
            let victim: Option<Arc<Connection>> = {
                let st = account.state.lock();
                if st.subs_total <= max {
                    return;
                }
                st.conns.values().max_by_key(|c| c.sub_count()).cloned()
            };
            let Some(conn) = victim else { return };
            warn!(
                account = %account.id,
                conn = %conn.id,
                "subscription ceiling lowered below live count"
            );
            self.disconnect_inner(&conn, CloseReason::MaxSubscriptionsExceeded);
        }
    }

    fn arm_account_expiry(&self, account: &Arc<Account>, expires_at: u64) -> ExpiryTimer {
        let service = self.self_ref.clone();
        let account_weak = Arc::downgrade(account);
        ExpiryTimer::arm(expires_at, async move {
            if let (Some(service), Some(account)) = (service.upgrade(), account_weak.upgrade()) {
                service.account_expiry_fired(&account).await;
            }
        })
    }

    /// An account credential's validity window ended: try to renew from
    /// the resolver; failing that, mark the account expired and drop its
    /// connections.
    async fn account_expiry_fired(&self, account: &Arc<Account>) {
        let (updated_at, still_expired) = {
            let st = account.state.lock();
            (st.updated_at, st.claims.is_expired(now_secs()))
        };
        if !still_expired {
            // Claims were replaced while this task was in flight.
            return;
        }

        let now = now_secs();
        if now.saturating_sub(updated_at) >= self.config.refetch_min_interval_secs {
            if let Some(claims) = self.refetch_claims(&account.id, now).await {
                info!(account = %account.id, "account renewed from resolver");
                if self.apply_account_claims(account, claims).await.is_ok() {
                    return;
                }
            }
        } else {
            debug!(account = %account.id, "re-fetch suppressed, updated too recently");
        }

        self.expire_account(account);
    }

    /// Fetch and validate renewal claims; any failure means no renewal.
    async fn refetch_claims(&self, id: &PublicId, now: u64) -> Option<AccountClaims> {
        let jwt = match self.resolver.fetch(id).await {
            Ok(Some(jwt)) => jwt,
            Ok(None) => return None,
            Err(err) => {
                warn!(account = %id, %err, "resolver unavailable during renewal");
                return None;
            }
        };
        let claims = decode_account(&jwt).ok()?;
        trust::verify_account(&claims, self.trusted()).ok()?;
        if claims.sub != *id || claims.is_expired(now) {
            return None;
        }
        Some(claims)
    }

    fn expire_account(&self, account: &Arc<Account>) {
        let conns = {
            let mut st = account.state.lock();
            st.expired = true;
            if let Some(timer) = st.expiry_timer.take() {
                timer.cancel();
            }
            st.conns.values().cloned().collect::<Vec<_>>()
        };
        warn!(account = %account.id, conns = conns.len(), "account authentication expired");
        for conn in conns {
            self.disconnect_inner(&conn, CloseReason::AccountExpired);
        }
    }
}
