//! Ed25519 key pairs with printable seeds.

use crate::errors::KeyError;
use crate::id::{KeyRole, PublicId};
use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroize;

/// An identity key pair.
///
/// Only the public half ever leaves this process; the seed form exists so
/// operators can persist and transport signing identities out of band.
pub struct KeyPair {
    role: KeyRole,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh random key pair for `role`.
    pub fn generate(role: KeyRole) -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { role, signing_key }
    }

    /// Restore from a printable seed: `'S'` + role prefix + hex seed bytes.
    pub fn from_seed(seed: &str) -> Result<Self, KeyError> {
        let mut chars = seed.chars();
        if chars.next() != Some('S') {
            return Err(KeyError::InvalidEncoding);
        }
        let role = KeyRole::from_prefix(chars.next().ok_or(KeyError::InvalidEncoding)?)?;
        let mut bytes =
            hex::decode(&seed[2..]).map_err(|_| KeyError::InvalidEncoding)?;
        let seed_bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidEncoding)?;
        bytes.zeroize();
        let signing_key = SigningKey::from_bytes(&seed_bytes);
        Ok(Self { role, signing_key })
    }

    /// Printable seed for persistence.
    pub fn seed(&self) -> String {
        format!(
            "S{}{}",
            self.role.prefix(),
            hex::encode_upper(self.signing_key.to_bytes())
        )
    }

    /// The role this pair was created for.
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Public identifier for the verifying half.
    pub fn public_id(&self) -> PublicId {
        let verifying_key = self.signing_key.verifying_key();
        // A derived verifying key is always a valid point.
        PublicId::from_valid(self.role, verifying_key.to_bytes())
    }

    /// Sign a message (deterministic, no RNG needed).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}
