//! Claim payloads and their typed encode/decode entry points.

use crate::envelope;
use crate::errors::ClaimsError;
use crate::subject::Subject;
use murmur_keys::{KeyPair, PublicId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Tag distinguishing the three claim kinds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimsKind {
    Account,
    User,
    Activation,
}

impl ClaimsKind {
    fn name(self) -> &'static str {
        match self {
            ClaimsKind::Account => "account",
            ClaimsKind::User => "user",
            ClaimsKind::Activation => "activation",
        }
    }
}

/// The signed-envelope shape shared by all claim kinds.
///
/// `iss` is stamped from the signing key at encode time; decoding verifies
/// the envelope signature under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims<T> {
    /// Issuer identifier (who signed this).
    pub iss: PublicId,
    /// Subject identifier (who this is about).
    pub sub: PublicId,
    /// Issued-at, unix seconds.
    pub iat: u64,
    /// Optional expiry, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Claim kind tag.
    pub kind: ClaimsKind,
    /// Kind-specific payload.
    pub payload: T,
}

impl<T> Claims<T> {
    /// True once `now` has reached the expiry, if one is set.
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.exp, Some(exp) if exp <= now)
    }
}

impl<T: Serialize + Clone> Claims<T> {
    /// Sign and serialize, stamping `iss` from the signer.
    pub fn encode(&self, signer: &KeyPair) -> Result<String, ClaimsError> {
        let mut claims = self.clone();
        claims.iss = signer.public_id();
        envelope::seal(&claims, signer)
    }
}

/// Current unix time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// ACCOUNT CLAIMS
// =============================================================================

/// Export kind: a stream of messages or a request/reply service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Stream,
    Service,
}

/// A subject pattern an account offers to other accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub subject: Subject,
    pub kind: ExportKind,
    /// Importers must present a valid activation token.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub token_req: bool,
}

/// A subject pattern an account consumes from another account's export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// The exporting account.
    pub account: PublicId,
    /// The exporter-side subject to import.
    pub subject: Subject,
    /// Optional local rewrite; the import is keyed by this subject locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Subject>,
    pub kind: ExportKind,
    /// Inline activation envelope, or an http(s) URL to fetch one from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Import {
    /// Subject this import is known by inside the importing account.
    pub fn local_subject(&self) -> &Subject {
        self.to.as_ref().unwrap_or(&self.subject)
    }
}

/// Per-account resource ceilings; `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_subs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conns: Option<u64>,
}

/// Account claim payload: what the account shares and what it may consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<Export>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    #[serde(default)]
    pub limits: Limits,
}

pub type AccountClaims = Claims<AccountPayload>;

impl AccountClaims {
    /// Fresh account claims for `account`, issued now, no expiry.
    pub fn new(account: PublicId) -> Self {
        Claims {
            iss: account,
            sub: account,
            iat: now_secs(),
            exp: None,
            kind: ClaimsKind::Account,
            payload: AccountPayload::default(),
        }
    }
}

// =============================================================================
// USER CLAIMS
// =============================================================================

/// Publish/subscribe permission sets.
///
/// Empty allow list means allow-all; deny always wins over allow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pub_allow: Vec<Subject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pub_deny: Vec<Subject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_allow: Vec<Subject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_deny: Vec<Subject>,
}

impl Permissions {
    fn check(allow: &[Subject], deny: &[Subject], subject: &str) -> bool {
        if deny.iter().any(|p| p.matches(subject)) {
            return false;
        }
        allow.is_empty() || allow.iter().any(|p| p.matches(subject))
    }

    /// May the holder publish on `subject`?
    pub fn can_publish(&self, subject: &str) -> bool {
        Self::check(&self.pub_allow, &self.pub_deny, subject)
    }

    /// May the holder subscribe to `subject`?
    pub fn can_subscribe(&self, subject: &str) -> bool {
        Self::check(&self.sub_allow, &self.sub_deny, subject)
    }
}

/// User claim payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub permissions: Permissions,
}

pub type UserClaims = Claims<UserPayload>;

impl UserClaims {
    /// Fresh user claims for `user`, issued now, no expiry.
    pub fn new(user: PublicId) -> Self {
        Claims {
            iss: user,
            sub: user,
            iat: now_secs(),
            exp: None,
            kind: ClaimsKind::User,
            payload: UserPayload::default(),
        }
    }
}

// =============================================================================
// ACTIVATION CLAIMS
// =============================================================================

/// Activation claim payload: authorizes `sub` (the importing account) to
/// use one specific export of `iss` (the exporting account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationPayload {
    pub import_subject: Subject,
    pub import_kind: ExportKind,
}

pub type ActivationClaims = Claims<ActivationPayload>;

impl ActivationClaims {
    /// Fresh activation claims addressed to `importer`, issued now.
    pub fn new(importer: PublicId, import_subject: Subject, import_kind: ExportKind) -> Self {
        Claims {
            iss: importer,
            sub: importer,
            iat: now_secs(),
            exp: None,
            kind: ClaimsKind::Activation,
            payload: ActivationPayload {
                import_subject,
                import_kind,
            },
        }
    }
}

// =============================================================================
// TYPED DECODE
// =============================================================================

fn decode_kind<T: DeserializeOwned>(
    envelope_str: &str,
    expected: ClaimsKind,
) -> Result<Claims<T>, ClaimsError> {
    let claims: Claims<T> = envelope::open(envelope_str, |c: &Claims<T>| c.iss)?;
    if claims.kind != expected {
        return Err(ClaimsError::UnexpectedKind {
            expected: expected.name(),
            got: claims.kind.name().to_string(),
        });
    }
    Ok(claims)
}

/// Decode and signature-verify account claims.
pub fn decode_account(envelope_str: &str) -> Result<AccountClaims, ClaimsError> {
    decode_kind(envelope_str, ClaimsKind::Account)
}

/// Decode and signature-verify user claims.
pub fn decode_user(envelope_str: &str) -> Result<UserClaims, ClaimsError> {
    decode_kind(envelope_str, ClaimsKind::User)
}

/// Decode and signature-verify activation claims.
pub fn decode_activation(envelope_str: &str) -> Result<ActivationClaims, ClaimsError> {
    decode_kind(envelope_str, ClaimsKind::Activation)
}
