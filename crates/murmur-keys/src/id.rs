//! Role-prefixed public identifiers.
//!
//! A `PublicId` is both an entity's stable name and the Ed25519 verifying
//! key for anything that entity signs. The textual form is a single role
//! prefix character followed by the uppercase-hex key bytes, e.g.
//! `A3F1...` for an account.

use crate::errors::KeyError;
use ed25519_dalek::{Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity role encoded in the identifier prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyRole {
    /// Trusted root identity; signs account claims.
    Operator,
    /// Tenant boundary; signs user claims and activation tokens.
    Account,
    /// Per-connection identity scoped to one account.
    User,
}

impl KeyRole {
    /// Prefix character for public identifiers.
    pub fn prefix(self) -> char {
        match self {
            KeyRole::Operator => 'O',
            KeyRole::Account => 'A',
            KeyRole::User => 'U',
        }
    }

    /// Map a prefix character back to a role.
    pub fn from_prefix(c: char) -> Result<Self, KeyError> {
        match c {
            'O' => Ok(KeyRole::Operator),
            'A' => Ok(KeyRole::Account),
            'U' => Ok(KeyRole::User),
            other => Err(KeyError::InvalidPrefix(other)),
        }
    }
}

/// A role-prefixed Ed25519 public identifier.
///
/// Ordered and hashable so it can key registry maps directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicId {
    role: KeyRole,
    key: [u8; 32],
}

impl PublicId {
    /// Build from a role and raw verifying-key bytes.
    ///
    /// Validates that the bytes form a valid curve point.
    pub fn from_key_bytes(role: KeyRole, key: [u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&key).map_err(|_| KeyError::InvalidKey)?;
        Ok(Self { role, key })
    }

    /// Construct from bytes already known to be a valid verifying key.
    pub(crate) fn from_valid(role: KeyRole, key: [u8; 32]) -> Self {
        Self { role, key }
    }

    /// Parse the textual form: role prefix + 64 uppercase hex chars.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let mut chars = s.chars();
        let prefix = chars.next().ok_or(KeyError::InvalidEncoding)?;
        let role = KeyRole::from_prefix(prefix)?;
        let body = &s[prefix.len_utf8()..];
        let bytes = hex::decode(body).map_err(|_| KeyError::InvalidEncoding)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidEncoding)?;
        Self::from_key_bytes(role, key)
    }

    /// The entity role this identifier carries.
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Raw verifying-key bytes.
    pub fn key_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Verify an Ed25519 signature over `message`.
    ///
    /// `signature` must be exactly 64 bytes.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), KeyError> {
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| KeyError::InvalidSignature)?;
        let verifying_key =
            VerifyingKey::from_bytes(&self.key).map_err(|_| KeyError::InvalidKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| KeyError::InvalidSignature)
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role.prefix(), hex::encode_upper(self.key))
    }
}

impl fmt::Debug for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicId({self})")
    }
}

impl FromStr for PublicId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PublicId {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PublicId> for String {
    fn from(id: PublicId) -> Self {
        id.to_string()
    }
}
