use aead::{AeadInOut, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};

use crate::error::{DecryptReason, EnvelopeError};

// --- Aliases ---

pub type Aes = Aes256Gcm;
pub type ChaCha = ChaCha20Poly1305;

/// AEAD ciphers usable by the envelope engine.
///
/// The algorithm identifier is persisted in every envelope so that a stored
/// blob can never be silently reinterpreted under a different cipher.
pub trait EnvelopeCipher: AeadInOut + KeyInit + 'static {
    /// Stable identifier written into the `alg` field of produced envelopes.
    const ALG: &'static str;
}

impl EnvelopeCipher for Aes {
    const ALG: &'static str = "aes-256-gcm";
}

impl EnvelopeCipher for ChaCha {
    const ALG: &'static str = "chacha20-poly1305";
}

// --- Envelope format constants ---

/// Envelope format version for [`EncEnvelope`].
pub(crate) const ENVELOPE_VERSION_V1: u8 = 1;

/// AEAD nonce length (96-bit).
pub(crate) const NONCE_LEN: usize = 12;

/// AEAD tag length (128-bit).
pub(crate) const TAG_LEN: usize = 16;

// --- Container ---

/// The self-describing persisted form of one encrypted value.
///
/// Serialized as a JSON object with base64-encoded binary fields:
///
/// ```text
/// {"v":1,"alg":"aes-256-gcm","nonce":"...","ciphertext":"...","tag":"..."}
/// ```
///
/// The associated-data string bound at encryption time is deliberately NOT
/// part of the envelope; readers recompute it from the record the envelope
/// belongs to, so a ciphertext moved into another record's slot fails
/// verification.
///
/// An envelope is immutable once produced. Updating a record means producing
/// a new envelope, never editing fields of an old one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncEnvelope {
    /// Format/algorithm version; unknown versions are rejected at decrypt.
    pub v: u8,
    /// Cipher identifier, stored rather than negotiated.
    pub alg: String,
    /// Fresh 96-bit random value, unique per encryption call.
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    /// Opaque encrypted bytes.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// 128-bit authentication tag.
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
}

impl std::fmt::Debug for EncEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncEnvelope")
            .field("v", &self.v)
            .field("alg", &self.alg)
            .field("nonce_len", &self.nonce.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .field("tag_len", &self.tag.len())
            .finish()
    }
}

impl EncEnvelope {
    /// Serializes the envelope into its persisted JSON string form.
    ///
    /// # Results
    /// Returns the JSON text that round-trips byte-for-byte via [`EncEnvelope::from_json`].
    ///
    /// # Errors
    /// * [`EnvelopeError::Serialization`] If JSON encoding fails.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an envelope from its persisted JSON string form.
    ///
    /// # Results
    /// Returns the decoded envelope.
    ///
    /// # Errors
    /// * [`EnvelopeError::Decryption`] with [`DecryptReason::MalformedEnvelope`]
    ///   if the text is not a valid envelope object.
    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(text).map_err(|e| EnvelopeError::Decryption {
            reason: DecryptReason::MalformedEnvelope,
            context: Some(e.to_string().into()),
        })
    }
}

mod b64 {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
