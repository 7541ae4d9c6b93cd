//! Import resolution.
//!
//! Every claimed import is checked against the exporting account's live
//! export table and, for token-gated exports, against an activation
//! token. A failed import is dropped from the derived table with a log
//! line; it never fails the whole claims application.

use crate::domain::entities::ResolvedImport;
use crate::service::AuthService;
use murmur_claims::{decode_activation, now_secs, AccountClaims, Export, Import, Subject};
use murmur_keys::PublicId;
use std::collections::HashMap;
use tracing::debug;

impl AuthService {
    /// Resolve all claimed imports into the verified import table, keyed
    /// by local subject. Runs resolver and token I/O; callers must hold
    /// no entity lock.
    pub(crate) async fn resolve_imports(
        &self,
        importer: &PublicId,
        claims: &AccountClaims,
    ) -> HashMap<Subject, ResolvedImport> {
        let mut table = HashMap::new();
        for imp in &claims.payload.imports {
            if let Some(resolved) = self.resolve_import(importer, imp).await {
                table.insert(resolved.local_subject.clone(), resolved);
            }
        }
        table
    }

    async fn resolve_import(&self, importer: &PublicId, imp: &Import) -> Option<ResolvedImport> {
        if imp.account == *importer {
            debug!(account = %importer, subject = %imp.subject, "self-import dropped");
            return None;
        }

        let exporter = match self.lookup_or_load(&imp.account).await {
            Ok(account) => account,
            Err(err) => {
                debug!(
                    account = %importer,
                    exporter = %imp.account,
                    subject = %imp.subject,
                    %err,
                    "import dropped, exporter unavailable"
                );
                return None;
            }
        };

        // The export whose pattern covers the imported subject, matching
        // kind. Cloned out so no lock is held across token fetches.
        let export: Option<Export> = {
            let st = exporter.state.lock();
            st.exports
                .values()
                .find(|e| e.kind == imp.kind && e.subject.subsumes(&imp.subject))
                .cloned()
        };
        let Some(export) = export else {
            debug!(
                account = %importer,
                exporter = %imp.account,
                subject = %imp.subject,
                "import dropped, no matching export"
            );
            return None;
        };

        let expires = if export.token_req {
            match self.verify_activation(importer, imp).await {
                Ok(expires) => expires,
                Err(why) => {
                    debug!(
                        account = %importer,
                        exporter = %imp.account,
                        subject = %imp.subject,
                        why,
                        "import dropped, activation rejected"
                    );
                    return None;
                }
            }
        } else {
            None
        };

        Some(ResolvedImport {
            exporter: imp.account,
            remote_subject: imp.subject.clone(),
            local_subject: imp.local_subject().clone(),
            kind: imp.kind,
            expires,
        })
    }

    /// Validate the activation token attached to a token-gated import
    /// and return its expiry bound. The `Err` string names the reject
    /// reason for the log line.
    async fn verify_activation(
        &self,
        importer: &PublicId,
        imp: &Import,
    ) -> Result<Option<u64>, &'static str> {
        let token = imp.token.as_deref().ok_or("token required but absent")?;

        // An http(s) value is a pointer to the token, not the token.
        let envelope = if token.starts_with("http://") || token.starts_with("https://") {
            match self.fetcher.fetch_token(token).await {
                Ok(body) => body,
                Err(_) => return Err("token fetch failed"),
            }
        } else {
            token.to_string()
        };

        let act = decode_activation(&envelope).map_err(|_| "token malformed or badly signed")?;
        if act.iss != imp.account {
            return Err("token not signed by exporter");
        }
        if act.sub != *importer {
            return Err("token addressed to another account");
        }
        if act.payload.import_subject != imp.subject || act.payload.import_kind != imp.kind {
            return Err("token covers a different export");
        }
        if act.is_expired(now_secs()) {
            return Err("token expired");
        }
        Ok(act.exp)
    }
}
