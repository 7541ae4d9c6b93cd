//! Trust-chain verification.
//!
//! Pure checks over already-decoded claims. Envelope signatures are
//! verified at decode time by `murmur-claims`; this module confirms the
//! issuer linkage: the account claims' issuer must be a member of the
//! trusted root set, and the user claims' issuer must be the owning
//! account. No network or storage access occurs here.

use crate::domain::errors::AuthError;
use murmur_claims::{AccountClaims, UserClaims};
use murmur_keys::{KeyRole, PublicId};
use std::collections::HashSet;

/// Verify account claims against the trusted-root allow list.
///
/// Self-signed roots are permitted when the account identifier itself is
/// a member of the trusted set.
pub fn verify_account(
    claims: &AccountClaims,
    trusted: &HashSet<PublicId>,
) -> Result<(), AuthError> {
    if claims.sub.role() != KeyRole::Account {
        return Err(AuthError::WrongIssuer);
    }
    if !trusted.contains(&claims.iss) {
        return Err(AuthError::UntrustedIssuer);
    }
    Ok(())
}

/// Verify user claims were issued by `account`.
pub fn verify_user(claims: &UserClaims, account: &PublicId) -> Result<(), AuthError> {
    if claims.sub.role() != KeyRole::User {
        return Err(AuthError::WrongIssuer);
    }
    if claims.iss != *account {
        return Err(AuthError::WrongIssuer);
    }
    Ok(())
}
