//! Shadow-subscription reconciliation.
//!
//! Whenever a subscription is added or an account's import table
//! changes, each subscription's shadow set is made to mirror exactly the
//! verified imports overlapping its subject. Shadows that still match
//! are kept untouched, so re-applying identical claims produces no
//! routing churn.

use crate::domain::entities::{Connection, ResolvedImport, ShadowRecord, ShadowSub, Subscription};
use crate::service::expiry::ExpiryTimer;
use crate::service::AuthService;
use murmur_claims::Subject;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// An import feeds a subscription when either pattern covers the other.
fn overlaps(a: &Subject, b: &Subject) -> bool {
    a.subsumes(b) || b.subsumes(a)
}

/// A kept shadow must agree with the import in every routing-relevant
/// field, expiry included.
fn shadow_matches(shadow: &ShadowSub, ri: &ResolvedImport) -> bool {
    shadow.record.exporter == ri.exporter
        && shadow.record.remote_subject == ri.remote_subject
        && shadow.record.local_subject == ri.local_subject
        && shadow.expires == ri.expires
}

impl AuthService {
    /// Re-derive the shadow sets of every subscription on `conn` from
    /// the given import table.
    pub(crate) fn reconcile_connection(
        &self,
        conn: &Arc<Connection>,
        imports: &HashMap<Subject, ResolvedImport>,
    ) {
        let mut st = conn.state.lock();
        if st.closed {
            return;
        }
        for sub in st.subs.values_mut() {
            self.reconcile_sub(conn, sub, imports);
        }
    }

    /// Make `sub.shadows` mirror the imports overlapping its subject.
    ///
    /// Callers already hold the connection lock; nothing here may take
    /// it again.
    pub(crate) fn reconcile_sub(
        &self,
        conn: &Arc<Connection>,
        sub: &mut Subscription,
        imports: &HashMap<Subject, ResolvedImport>,
    ) {
        let desired: Vec<&ResolvedImport> = imports
            .values()
            .filter(|ri| overlaps(&ri.local_subject, &sub.subject))
            .collect();

        // Drop shadows whose import disappeared or changed shape.
        sub.shadows.retain(|shadow| {
            if desired.iter().any(|ri| shadow_matches(shadow, ri)) {
                return true;
            }
            if let Some(timer) = &shadow.timer {
                timer.cancel();
            }
            self.routes.remove_shadow(&shadow.record);
            debug!(conn = %conn.id, sid = sub.sid, shadow = %shadow.record.id, "shadow removed");
            false
        });

        // Attach shadows for imports not yet mirrored.
        for ri in desired {
            if sub.shadows.iter().any(|s| shadow_matches(s, ri)) {
                continue;
            }
            self.attach_shadow(conn, sub, ri);
        }
    }

    fn attach_shadow(&self, conn: &Arc<Connection>, sub: &mut Subscription, ri: &ResolvedImport) {
        let record = ShadowRecord {
            id: Uuid::new_v4(),
            conn_id: conn.id,
            sid: sub.sid,
            exporter: ri.exporter,
            remote_subject: ri.remote_subject.clone(),
            local_subject: ri.local_subject.clone(),
        };
        self.routes.install_shadow(&record);
        debug!(conn = %conn.id, sid = sub.sid, shadow = %record.id, exporter = %ri.exporter, "shadow installed");

        // A shadow backed by an expiring activation dies with it.
        let timer = ri.expires.map(|exp| {
            let service = self.self_ref.clone();
            let conn_weak = Arc::downgrade(conn);
            let (sid, shadow_id) = (sub.sid, record.id);
            ExpiryTimer::arm(exp, async move {
                if let (Some(service), Some(conn)) = (service.upgrade(), conn_weak.upgrade()) {
                    service.expire_shadow(&conn, sid, shadow_id);
                }
            })
        });

        sub.shadows.push(ShadowSub {
            record,
            expires: ri.expires,
            timer,
        });
    }

    /// Remove one expired shadow; the subscription itself stays live.
    fn expire_shadow(&self, conn: &Arc<Connection>, sid: u64, shadow_id: Uuid) {
        let mut st = conn.state.lock();
        if st.closed {
            return;
        }
        let Some(sub) = st.subs.get_mut(&sid) else {
            return;
        };
        sub.shadows.retain(|shadow| {
            if shadow.record.id != shadow_id {
                return true;
            }
            self.routes.remove_shadow(&shadow.record);
            debug!(conn = %conn.id, sid, shadow = %shadow_id, "shadow expired");
            false
        });
    }
}
