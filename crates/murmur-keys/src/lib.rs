//! # Murmur Identity Keys
//!
//! Ed25519 key pairs used as stable entity identities throughout Murmur.
//! The public half doubles as the entity's name: a role-prefixed string
//! (`O...` operator, `A...` account, `U...` user) that any holder can use
//! to verify signatures made with the matching private key.
//!
//! ## Security Properties
//!
//! - Deterministic signatures (no RNG dependency after key generation)
//! - Secret seeds are zeroized on drop
//! - Identifiers are self-describing: the role prefix is validated on parse

pub mod errors;
pub mod id;
pub mod pair;

pub use errors::KeyError;
pub use id::{KeyRole, PublicId};
pub use pair::KeyPair;
