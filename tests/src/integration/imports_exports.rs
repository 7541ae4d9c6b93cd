//! Cross-account subject sharing: export matching, activation tokens,
//! and shadow-subscription reconciliation.

#[cfg(test)]
mod tests {
    use crate::support::{subj, Harness};
    use murmur_auth::AuthApi;
    use murmur_claims::{
        now_secs, AccountClaims, ActivationClaims, Export, ExportKind, Import,
    };
    use murmur_keys::{KeyPair, KeyRole, PublicId};

    fn stream_export(subject: &str, token_req: bool) -> Export {
        Export {
            subject: subj(subject),
            kind: ExportKind::Stream,
            token_req,
        }
    }

    fn stream_import(exporter: PublicId, subject: &str) -> Import {
        Import {
            account: exporter,
            subject: subj(subject),
            to: None,
            kind: ExportKind::Stream,
            token: None,
        }
    }

    /// Exporter offering `events.>` as a stream, publish-ready.
    async fn exporter(h: &Harness, token_req: bool) -> KeyPair {
        let bkp = KeyPair::generate(KeyRole::Account);
        let mut bc = AccountClaims::new(bkp.public_id());
        bc.payload.exports.push(stream_export("events.>", token_req));
        h.publish_account(&bc).await;
        bkp
    }

    #[tokio::test]
    async fn test_open_stream_import_creates_shadow() {
        let h = Harness::new();
        let bkp = exporter(&h, false).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(stream_import(bkp.public_id(), "events.orders"));
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        let account = handle.connection.account.clone();
        assert_eq!(account.import_count(), 1);

        h.service
            .subscribe(&handle.connection, 1, subj("events.orders"))
            .unwrap();
        assert_eq!(handle.connection.shadow_count(1), Some(1));

        let live = h.routes.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].exporter, bkp.public_id());
        assert_eq!(live[0].remote_subject, subj("events.orders"));
        assert_eq!(live[0].local_subject, subj("events.orders"));
    }

    #[tokio::test]
    async fn test_import_rewrite_keys_local_subject() {
        let h = Harness::new();
        let bkp = exporter(&h, false).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        let mut imp = stream_import(bkp.public_id(), "events.orders");
        imp.to = Some(subj("orders.incoming"));
        ac.payload.imports.push(imp);
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();

        // The remote name is not visible locally once rewritten.
        h.service
            .subscribe(&handle.connection, 1, subj("events.orders"))
            .unwrap();
        assert_eq!(handle.connection.shadow_count(1), Some(0));

        h.service
            .subscribe(&handle.connection, 2, subj("orders.incoming"))
            .unwrap();
        assert_eq!(handle.connection.shadow_count(2), Some(1));
        let live = h.routes.live();
        assert_eq!(live[0].remote_subject, subj("events.orders"));
        assert_eq!(live[0].local_subject, subj("orders.incoming"));
    }

    #[tokio::test]
    async fn test_token_required_import_without_token_dropped() {
        let h = Harness::new();
        let bkp = exporter(&h, true).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(stream_import(bkp.public_id(), "events.orders"));
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 0);

        h.service
            .subscribe(&handle.connection, 1, subj("events.orders"))
            .unwrap();
        assert_eq!(handle.connection.shadow_count(1), Some(0));
        assert!(h.routes.live().is_empty());
    }

    #[tokio::test]
    async fn test_garbage_token_dropped() {
        let h = Harness::new();
        let bkp = exporter(&h, true).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        let mut imp = stream_import(bkp.public_id(), "events.orders");
        imp.token = Some("not an activation".into());
        ac.payload.imports.push(imp);
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 0);
    }

    #[tokio::test]
    async fn test_inline_activation_token_accepted() {
        let h = Harness::new();
        let bkp = exporter(&h, true).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let act = ActivationClaims::new(
            akp.public_id(),
            subj("events.orders"),
            ExportKind::Stream,
        );
        let mut imp = stream_import(bkp.public_id(), "events.orders");
        imp.token = Some(act.encode(&bkp).unwrap());

        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(imp);
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 1);

        h.service
            .subscribe(&handle.connection, 1, subj("events.orders"))
            .unwrap();
        assert_eq!(handle.connection.shadow_count(1), Some(1));
    }

    #[tokio::test]
    async fn test_url_activation_token_fetched() {
        let h = Harness::new();
        let bkp = exporter(&h, true).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let act = ActivationClaims::new(
            akp.public_id(),
            subj("events.orders"),
            ExportKind::Stream,
        );
        let url = "https://tokens.example/acme-events";
        h.fetcher.put(url, act.encode(&bkp).unwrap());

        let mut imp = stream_import(bkp.public_id(), "events.orders");
        imp.token = Some(url.into());
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(imp);
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_activation_token_dropped() {
        let h = Harness::new();
        let bkp = exporter(&h, true).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut act = ActivationClaims::new(
            akp.public_id(),
            subj("events.orders"),
            ExportKind::Stream,
        );
        act.exp = Some(now_secs() - 10);

        let mut imp = stream_import(bkp.public_id(), "events.orders");
        imp.token = Some(act.encode(&bkp).unwrap());
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(imp);
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 0);
    }

    #[tokio::test]
    async fn test_activation_for_another_account_dropped() {
        let h = Harness::new();
        let bkp = exporter(&h, true).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let stranger = KeyPair::generate(KeyRole::Account);

        // Token addressed to the stranger, presented by us.
        let act = ActivationClaims::new(
            stranger.public_id(),
            subj("events.orders"),
            ExportKind::Stream,
        );
        let mut imp = stream_import(bkp.public_id(), "events.orders");
        imp.token = Some(act.encode(&bkp).unwrap());

        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(imp);
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 0);
    }

    #[tokio::test]
    async fn test_kind_mismatch_dropped() {
        let h = Harness::new();
        let bkp = KeyPair::generate(KeyRole::Account);
        let mut bc = AccountClaims::new(bkp.public_id());
        bc.payload.exports.push(Export {
            subject: subj("rpc.lookup"),
            kind: ExportKind::Service,
            token_req: false,
        });
        h.publish_account(&bc).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(stream_import(bkp.public_id(), "rpc.lookup"));
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 0);
    }

    #[tokio::test]
    async fn test_self_import_dropped() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.exports.push(stream_export("events.>", false));
        ac.payload.imports.push(stream_import(akp.public_id(), "events.orders"));
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 0);
    }

    #[tokio::test]
    async fn test_mutual_imports_resolve() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let bkp = KeyPair::generate(KeyRole::Account);

        // Each account imports from the other; resolution must not
        // chase the cycle forever.
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.exports.push(stream_export("a.>", false));
        ac.payload.imports.push(stream_import(bkp.public_id(), "b.data"));
        h.publish_account(&ac).await;

        let mut bc = AccountClaims::new(bkp.public_id());
        bc.payload.exports.push(stream_export("b.>", false));
        bc.payload.imports.push(stream_import(akp.public_id(), "a.data"));
        h.publish_account(&bc).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.import_count(), 1);
        assert!(handle.connection.account.import(&subj("b.data")).is_some());
    }

    #[tokio::test]
    async fn test_claims_update_reconciles_shadows() {
        let h = Harness::new();
        let bkp = exporter(&h, false).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut with_import = AccountClaims::new(akp.public_id());
        with_import
            .payload
            .imports
            .push(stream_import(bkp.public_id(), "events.orders"));
        h.publish_account(&with_import).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        h.service
            .subscribe(&handle.connection, 1, subj("events.orders"))
            .unwrap();
        assert_eq!(h.routes.live().len(), 1);

        // Import dropped from the account: the shadow goes with it.
        let mut without_import = with_import.clone();
        without_import.payload.imports.clear();
        without_import.iat = now_secs();
        let jwt = without_import.encode(&h.operator).unwrap();
        h.service.update_account_claims(&jwt).await.unwrap();
        assert_eq!(handle.connection.shadow_count(1), Some(0));
        assert!(h.routes.live().is_empty());

        // Import restored: the shadow comes back.
        let jwt = with_import.encode(&h.operator).unwrap();
        h.service.update_account_claims(&jwt).await.unwrap();
        assert_eq!(handle.connection.shadow_count(1), Some(1));
        assert_eq!(h.routes.live().len(), 1);
    }

    #[tokio::test]
    async fn test_reapplying_identical_claims_is_quiet() {
        let h = Harness::new();
        let bkp = exporter(&h, false).await;

        let akp = KeyPair::generate(KeyRole::Account);
        let mut ac = AccountClaims::new(akp.public_id());
        ac.payload.imports.push(stream_import(bkp.public_id(), "events.orders"));
        h.publish_account(&ac).await;

        let ukp = KeyPair::generate(KeyRole::User);
        let handle = h.connect(&akp, &ukp).await.unwrap();
        h.service
            .subscribe(&handle.connection, 1, subj("events.orders"))
            .unwrap();
        let ops_before = h.routes.ops().len();

        let jwt = ac.encode(&h.operator).unwrap();
        h.service.update_account_claims(&jwt).await.unwrap();
        h.service.update_account_claims(&jwt).await.unwrap();

        // Unchanged shadows are kept in place, not reinstalled.
        assert_eq!(h.routes.ops().len(), ops_before);
        assert_eq!(handle.connection.shadow_count(1), Some(1));
    }
}
