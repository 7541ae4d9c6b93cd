//! The three-part signed envelope.
//!
//! Wire form: `b64url(header) "." b64url(payload) "." b64url(signature)`.
//! The Ed25519 signature covers the ASCII bytes of the first two segments
//! joined by the dot, and verifies under the identifier named in the
//! payload's `iss` field.

use crate::errors::ClaimsError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use murmur_keys::{KeyPair, PublicId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Envelope type tag.
pub const ENVELOPE_TYPE: &str = "jwt";

/// The only signature algorithm this envelope speaks.
pub const ALGORITHM: &str = "ed25519";

/// Envelope header, first segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub typ: String,
    pub alg: String,
}

impl Header {
    fn current() -> Self {
        Self {
            typ: ENVELOPE_TYPE.to_string(),
            alg: ALGORITHM.to_string(),
        }
    }
}

/// Serialize `payload`, sign header+payload with `signer`, emit the
/// three-segment form.
pub fn seal<T: Serialize>(payload: &T, signer: &KeyPair) -> Result<String, ClaimsError> {
    let header_json = serde_json::to_vec(&Header::current()).map_err(|_| ClaimsError::Malformed)?;
    let payload_json = serde_json::to_vec(payload).map_err(|_| ClaimsError::Malformed)?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );
    let signature = signer.sign(signing_input.as_bytes());

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Decode the envelope, returning the payload and the raw signature check
/// inputs so the caller can verify under the right issuer.
///
/// Structural validation only; see [`open`] for the verified path.
fn split<T: DeserializeOwned>(envelope: &str) -> Result<(T, String, Vec<u8>), ClaimsError> {
    let mut segments = envelope.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClaimsError::Malformed);
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| ClaimsError::Malformed)?;
    let header: Header =
        serde_json::from_slice(&header_json).map_err(|_| ClaimsError::Malformed)?;
    if !header.typ.eq_ignore_ascii_case(ENVELOPE_TYPE) {
        return Err(ClaimsError::Malformed);
    }
    if !header.alg.eq_ignore_ascii_case(ALGORITHM) {
        return Err(ClaimsError::UnsupportedAlgorithm(header.alg));
    }

    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| ClaimsError::Malformed)?;
    let payload: T = serde_json::from_slice(&payload_json).map_err(|_| ClaimsError::Malformed)?;

    let signature = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| ClaimsError::Malformed)?;
    let signing_input = format!("{header_b64}.{payload_b64}");

    Ok((payload, signing_input, signature))
}

/// Decode and verify an envelope whose payload names its own issuer.
///
/// `issuer_of` extracts the verifying identity from the decoded payload.
pub fn open<T, F>(envelope: &str, issuer_of: F) -> Result<T, ClaimsError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> PublicId,
{
    let (payload, signing_input, signature) = split::<T>(envelope)?;
    issuer_of(&payload)
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| ClaimsError::BadSignature)?;
    Ok(payload)
}
