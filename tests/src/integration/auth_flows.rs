//! Connect-time authorization: credential chain, nonce proof, account
//! resolution, and orderly teardown.

#[cfg(test)]
mod tests {
    use crate::support::{subj, Harness};
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine;
    use murmur_auth::{
        generate_nonce, AccountResolver, AuthApi, AuthError, AuthRequest, CloseReason,
    };
    use murmur_claims::{now_secs, AccountClaims, UserClaims};
    use murmur_keys::{KeyPair, KeyRole};

    #[tokio::test]
    async fn test_authorize_happy_path() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);
        h.publish_account(&AccountClaims::new(akp.public_id())).await;

        let handle = h.connect(&akp, &ukp).await.unwrap();
        assert_eq!(handle.connection.account.id, akp.public_id());
        assert!(!handle.connection.is_closed());
        assert_eq!(handle.connection.account.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let h = Harness::new();
        let err = h
            .service
            .authorize(AuthRequest {
                jwt: None,
                sig: None,
                nonce: generate_nonce(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::MissingCredentials);
        assert_eq!(err.to_string(), "Authorization Violation");
    }

    #[tokio::test]
    async fn test_garbage_credential_rejected() {
        let h = Harness::new();
        let ukp = KeyPair::generate(KeyRole::User);
        let nonce = generate_nonce();
        let sig = BASE64_STANDARD.encode(ukp.sign(nonce.as_bytes()));

        let err = h
            .service
            .authorize(AuthRequest {
                jwt: Some("not a credential".into()),
                sig: Some(sig),
                nonce,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadCredentials(_)));
    }

    #[tokio::test]
    async fn test_bad_nonce_proof_rejected() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);
        h.publish_account(&AccountClaims::new(akp.public_id())).await;

        let jwt = UserClaims::new(ukp.public_id()).encode(&akp).unwrap();
        // Signature over the wrong bytes.
        let sig = BASE64_STANDARD.encode(ukp.sign(b"some other nonce"));
        let err = h
            .service
            .authorize(AuthRequest {
                jwt: Some(jwt),
                sig: Some(sig),
                nonce: generate_nonce(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::BadNonceSignature);
    }

    #[tokio::test]
    async fn test_untrusted_operator_rejected() {
        let h = Harness::new();
        let rogue = KeyPair::generate(KeyRole::Operator);
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);

        // Valid signature chain, but the signing operator is not in the
        // trusted set.
        let jwt = AccountClaims::new(akp.public_id()).encode(&rogue).unwrap();
        h.resolver.store(&akp.public_id(), jwt).await.unwrap();

        let err = h.connect(&akp, &ukp).await.unwrap_err();
        assert_eq!(err, AuthError::UntrustedIssuer);
    }

    #[tokio::test]
    async fn test_unknown_account_rejected() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);

        let err = h.connect(&akp, &ukp).await.unwrap_err();
        assert_eq!(err, AuthError::AccountNotFound(akp.public_id()));
    }

    #[tokio::test]
    async fn test_user_issued_by_non_account_rejected() {
        let h = Harness::new();
        let ukp = KeyPair::generate(KeyRole::User);
        let signer = KeyPair::generate(KeyRole::User);

        // A user key cannot stand in for an account as issuer.
        let err = h.connect_claims(&signer, &ukp, UserClaims::new(ukp.public_id()))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::WrongIssuer);
    }

    #[tokio::test]
    async fn test_expired_user_rejected() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);
        h.publish_account(&AccountClaims::new(akp.public_id())).await;

        let mut uc = UserClaims::new(ukp.public_id());
        uc.exp = Some(now_secs() - 10);
        let err = h.connect_claims(&akp, &ukp, uc).await.unwrap_err();
        assert_eq!(err, AuthError::ExpiredUser);
        assert!(err.to_string().contains("Expired"));
    }

    #[tokio::test]
    async fn test_expired_account_gates_users() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);

        let mut ac = AccountClaims::new(akp.public_id());
        ac.exp = Some(now_secs() - 10);
        h.publish_account(&ac).await;

        // A valid user of an expired account is still turned away.
        let err = h.connect(&akp, &ukp).await.unwrap_err();
        assert_eq!(err, AuthError::ExpiredAccount);
        assert!(err.to_string().contains("Expired"));
    }

    #[tokio::test]
    async fn test_renewed_claims_reopen_account() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);

        let mut ac = AccountClaims::new(akp.public_id());
        ac.exp = Some(now_secs() - 10);
        h.publish_account(&ac).await;
        assert!(h.connect(&akp, &ukp).await.is_err());

        // Push renewed claims directly at the service.
        ac.exp = None;
        let jwt = ac.encode(&h.operator).unwrap();
        let account = h.service.update_account_claims(&jwt).await.unwrap();
        assert!(!account.is_expired());

        assert!(h.connect(&akp, &ukp).await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_is_orderly_and_idempotent() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);
        h.publish_account(&AccountClaims::new(akp.public_id())).await;

        let mut handle = h.connect(&akp, &ukp).await.unwrap();
        let conn = handle.connection.clone();

        h.service.disconnect(&conn, CloseReason::ClientClosed);
        assert!(conn.is_closed());
        assert_eq!(handle.closed.try_recv(), Ok(CloseReason::ClientClosed));
        assert_eq!(conn.account.connection_count(), 0);

        // A second disconnect is a no-op; no second close event.
        h.service.disconnect(&conn, CloseReason::ClientClosed);
        assert!(handle.closed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_after_forced_close_rejected() {
        let h = Harness::new();
        let akp = KeyPair::generate(KeyRole::Account);
        let ukp = KeyPair::generate(KeyRole::User);
        h.publish_account(&AccountClaims::new(akp.public_id())).await;

        let handle = h.connect(&akp, &ukp).await.unwrap();
        let conn = handle.connection.clone();
        h.service.disconnect(&conn, CloseReason::UserExpired);

        // A subscribe racing in after the close must not charge the
        // account or install routes.
        let err = h.service.subscribe(&conn, 1, subj("a")).unwrap_err();
        assert_eq!(err, AuthError::ConnectionClosed);
        assert_eq!(conn.sub_count(), 0);
        assert_eq!(conn.account.subscription_count(), 0);
        assert!(h.routes.live().is_empty());
    }
}
