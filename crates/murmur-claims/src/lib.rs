//! # Murmur Claims
//!
//! The signed credential envelope and the three claim kinds that ride in it:
//!
//! - *Account claims* — issued by an operator to an account; carry the
//!   account's exports, imports, and resource limits.
//! - *User claims* — issued by an account to a user; carry publish and
//!   subscribe permissions.
//! - *Activation claims* — issued by an exporting account to an importing
//!   account; authorize use of one token-gated export.
//!
//! ## Envelope Integrity
//!
//! - Three base64url segments: header, payload, Ed25519 signature.
//! - The signature covers the first two segments verbatim; decoding always
//!   verifies it under the payload's `iss` identifier.
//! - Expiry is *not* checked at decode time; callers compare
//!   [`Claims::is_expired`] against their own clock.

pub mod claims;
pub mod envelope;
pub mod errors;
pub mod subject;

pub use claims::{
    AccountClaims, AccountPayload, ActivationClaims, ActivationPayload, Claims, ClaimsKind,
    Export, ExportKind, Import, Limits, Permissions, UserClaims, UserPayload,
};
pub use claims::{decode_account, decode_activation, decode_user, now_secs};
pub use errors::ClaimsError;
pub use subject::Subject;
