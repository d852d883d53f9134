//! Serialized envelope format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "id": "<storage key>",
//!   "kind": "store",
//!   "scheme": "simple" | "PBES2" | "shared",
//!   "kdf": { "salt": "<base64>", "m_cost": 19456, "t_cost": 2, "p_cost": 1 },
//!   "participants": [ { "publicIdentity": { ... }, "wrappedKey": { ... } } ],
//!   "data": { "nonce": "<base64>", "ciphertext": "<base64>" }
//! }
//! ```
//!
//! `kdf` is present only for password-derived envelopes and `participants`
//! only for shared ones.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Participant;
use crate::Result;
use crate::constants::ENVELOPE_VERSION;
use crate::crypto::{CryptoError, EncryptionScheme, KdfParams, Salt, Sealed};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    pub version: u32,
    pub id: String,
    pub kind: String,
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KdfInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Participant>,
    pub data: Sealed,
}

/// Salt and cost parameters of a password-derived envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct KdfInfo {
    pub salt: Salt,
    #[serde(flatten)]
    pub params: KdfParams,
}

/// Only the scheme tag, read before the rest so that unknown schemes are
/// reported as such even when their layout differs.
#[derive(Deserialize)]
struct SchemeTag {
    scheme: String,
}

fn invalid(reason: impl Into<String>) -> crate::Error {
    CryptoError::InvalidEnvelope {
        reason: reason.into(),
    }
    .into()
}

/// Associated data binding a sealed payload to its envelope header.
///
/// Relabeling the id, kind or scheme of an envelope makes decryption fail.
pub(crate) fn header_aad(id: &str, kind: &str, scheme: EncryptionScheme) -> Vec<u8> {
    let mut aad = Vec::with_capacity(id.len() + kind.len() + 16);
    for part in [id.as_bytes(), kind.as_bytes(), scheme.as_tag().as_bytes()] {
        aad.extend_from_slice(&(part.len() as u64).to_be_bytes());
        aad.extend_from_slice(part);
    }
    aad
}

/// Parse and validate a serialized envelope.
pub(crate) fn parse(raw: &[u8]) -> Result<(EncryptionScheme, Envelope)> {
    let tag: SchemeTag =
        serde_json::from_slice(raw).map_err(|e| invalid(format!("unreadable envelope: {e}")))?;
    let scheme: EncryptionScheme = tag.scheme.parse()?;

    let envelope: Envelope =
        serde_json::from_slice(raw).map_err(|e| invalid(format!("malformed envelope: {e}")))?;

    if envelope.version > ENVELOPE_VERSION {
        return Err(invalid(format!(
            "envelope version {} is newer than supported version {ENVELOPE_VERSION}",
            envelope.version
        )));
    }

    match scheme {
        EncryptionScheme::PasswordDerived => {
            let kdf = envelope
                .kdf
                .as_ref()
                .ok_or_else(|| invalid("password-derived envelope has no kdf parameters"))?;
            if let Some(reason) = kdf.params.limit_violation() {
                return Err(invalid(format!("kdf parameters out of range: {reason}")));
            }
        }
        EncryptionScheme::Shared => {
            let mut seen = HashSet::new();
            for participant in &envelope.participants {
                if !seen.insert(participant.public_identity.id.as_str()) {
                    return Err(invalid(format!(
                        "duplicate participant '{}'",
                        participant.public_identity.id
                    )));
                }
            }
        }
        _ => {}
    }

    Ok((scheme, envelope))
}
