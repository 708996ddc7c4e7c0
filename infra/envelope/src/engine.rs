use aead::Nonce;
use aead::inout::InOutBuf;
use getrandom::fill;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::builder::EnvelopeCryptoBuilder;
use crate::error::{DecryptReason, EnvelopeError, EnvelopeErrorExt};
use crate::types::{Aes, EncEnvelope, ENVELOPE_VERSION_V1, EnvelopeCipher, NONCE_LEN, TAG_LEN};

/// Inner engine state: the cipher (absent when encryption is disabled) and
/// the associated-data namespace it was keyed for.
#[allow(unreachable_pub)]
pub struct CryptoInner<C = Aes>
where
    C: EnvelopeCipher,
{
    pub(crate) cipher: Option<C>,
    pub(crate) namespace: String,
}

impl<C: EnvelopeCipher> std::fmt::Debug for CryptoInner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoInner")
            .field("alg", &C::ALG)
            .field("enabled", &self.cipher.is_some())
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// A thread-safe engine that turns byte strings into self-describing
/// authenticated-encryption envelopes and back.
///
/// `EnvelopeCrypto` is the only place in the system that touches the master
/// key. It wraps its state in an [`Arc`], making it cheaply clonable and safe
/// to share across tasks.
///
/// ### Disabled mode
/// When no master key is configured the engine still constructs, but
/// [`EnvelopeCrypto::enabled`] returns `false` and every cryptographic
/// operation fails with [`EnvelopeError::Configuration`]. Callers decide
/// whether to fall back to a plaintext path (the audit trail does) or refuse
/// the operation (the vault store does).
///
/// ### Generic parameters
/// * `C`: the AEAD cipher. Defaults to [`Aes`] (AES-256-GCM) for hardware
///   acceleration; [`crate::types::ChaCha`] is available for algorithm agility.
///
/// ### Example
/// ```rust
/// use fiscus_envelope::prelude::*;
///
/// # fn main() -> Result<(), EnvelopeError> {
/// let crypto = EnvelopeCrypto::<Aes>::builder()
///     .namespace("savings_vault")
///     .master_key("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=")
///     .build()?;
///
/// let envelope = crypto.encrypt_bytes(b"sensitive", Some("record:ctx"))?;
/// let plaintext = crypto.decrypt_bytes(&envelope, Some("record:ctx"))?;
/// assert_eq!(plaintext, b"sensitive");
/// # Ok(())
/// # }
/// ```
pub struct EnvelopeCrypto<C = Aes>
where
    C: EnvelopeCipher,
{
    inner: Arc<CryptoInner<C>>,
}

impl<C: EnvelopeCipher> std::fmt::Debug for EnvelopeCrypto<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCrypto").field("inner", &self.inner).finish()
    }
}

impl<C: EnvelopeCipher> Clone for EnvelopeCrypto<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> EnvelopeCrypto<C>
where
    C: EnvelopeCipher,
{
    /// Returns a new [`EnvelopeCryptoBuilder`] to configure the engine.
    #[must_use]
    pub fn builder() -> EnvelopeCryptoBuilder<C> {
        EnvelopeCryptoBuilder::<C>::new()
    }

    pub(crate) fn from_inner(inner: Arc<CryptoInner<C>>) -> Self {
        Self { inner }
    }

    /// Returns `true` iff a master key is configured.
    ///
    /// Every other operation on this engine errors when this is `false`;
    /// callers must branch on it before attempting encryption.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.inner.cipher.is_some()
    }

    /// The associated-data namespace this engine was keyed for.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    fn cipher(&self) -> Result<&C, EnvelopeError> {
        self.inner.cipher.as_ref().ok_or(EnvelopeError::Configuration {
            message: "No master key configured".into(),
            context: None,
        })
    }

    /// Generates a unique random nonce from the OS RNG.
    ///
    /// Never derived from content or a counter: a restart can therefore never
    /// silently repeat a nonce under the same key.
    fn next_nonce() -> Result<Nonce<C>, EnvelopeError> {
        let mut nonce = Nonce::<C>::default();
        fill(&mut nonce).map_err(|e| EnvelopeError::Encryption {
            message: "System RNG unavailable for nonce generation".into(),
            context: Some(e.to_string().into()),
        })?;
        Ok(nonce)
    }

    /// Encrypts raw bytes into an [`EncEnvelope`], optionally binding an
    /// associated-data string into the authentication tag.
    ///
    /// # Results
    /// Returns a fresh envelope with a unique nonce.
    ///
    /// # Errors
    /// * [`EnvelopeError::Configuration`] If no master key is configured.
    /// * [`EnvelopeError::Encryption`] If the AEAD encryption fails.
    pub fn encrypt_bytes(
        &self,
        plaintext: impl AsRef<[u8]>,
        aad: Option<&str>,
    ) -> Result<EncEnvelope, EnvelopeError> {
        let cipher = self.cipher()?;
        let nonce = Self::next_nonce()?;

        let mut buf = plaintext.as_ref().to_vec();
        let in_out = InOutBuf::from(&mut buf[..]);

        let tag = cipher
            .encrypt_inout_detached(&nonce, aad_bytes(aad), in_out)
            .map_err(|_| EnvelopeError::Encryption {
                message: "AEAD encryption failed".into(),
                context: None,
            })?;

        Ok(EncEnvelope {
            v: ENVELOPE_VERSION_V1,
            alg: C::ALG.to_owned(),
            nonce: nonce.as_slice().to_vec(),
            ciphertext: buf,
            tag: tag.as_slice().to_vec(),
        })
    }

    /// Decrypts an [`EncEnvelope`] back into plaintext bytes.
    ///
    /// When `aad` is provided it must equal the associated-data string bound
    /// at encryption time. The check happens inside AEAD verification, never
    /// as a comparison against stored metadata: the envelope does not carry
    /// the AAD, so there is nothing for a forger to substitute.
    ///
    /// # Results
    /// Returns the plaintext bytes.
    ///
    /// # Errors
    /// * [`EnvelopeError::Configuration`] If no master key is configured.
    /// * [`EnvelopeError::Decryption`] If the version or algorithm is
    ///   unsupported, the envelope is malformed, or tag verification fails
    ///   (wrong key, any flipped bit, or a mismatched associated-data string).
    pub fn decrypt_bytes(
        &self,
        envelope: &EncEnvelope,
        aad: Option<&str>,
    ) -> Result<Vec<u8>, EnvelopeError> {
        let cipher = self.cipher()?;

        if envelope.v != ENVELOPE_VERSION_V1 {
            return Err(EnvelopeError::Decryption {
                reason: DecryptReason::UnsupportedVersion,
                context: Some(format!("version={}", envelope.v).into()),
            });
        }
        if envelope.alg != C::ALG {
            return Err(EnvelopeError::Decryption {
                reason: DecryptReason::UnsupportedAlgorithm,
                context: Some(format!("alg={}", envelope.alg).into()),
            });
        }
        if envelope.nonce.len() != NONCE_LEN || envelope.tag.len() != TAG_LEN {
            return Err(EnvelopeError::Decryption {
                reason: DecryptReason::MalformedEnvelope,
                context: Some(
                    format!(
                        "nonce={} tag={} bytes, expected {NONCE_LEN}/{TAG_LEN}",
                        envelope.nonce.len(),
                        envelope.tag.len()
                    )
                    .into(),
                ),
            });
        }

        let nonce: Nonce<C> =
            envelope.nonce.as_slice().try_into().map_err(|_| {
                EnvelopeError::decryption(DecryptReason::MalformedEnvelope)
            })?;
        let tag = envelope.tag.as_slice().try_into().map_err(|_| {
            EnvelopeError::decryption(DecryptReason::MalformedEnvelope)
        })?;

        let mut buf = envelope.ciphertext.clone();
        let in_out = InOutBuf::from(&mut buf[..]);

        cipher.decrypt_inout_detached(&nonce, aad_bytes(aad), in_out, &tag).map_err(|_| {
            let reason = if aad.is_some_and(|a| !a.is_empty()) {
                DecryptReason::AadMismatch
            } else {
                DecryptReason::TagMismatch
            };
            EnvelopeError::decryption(reason)
        })?;

        Ok(buf)
    }

    /// Serializes a value as canonical JSON and encrypts it.
    ///
    /// # Results
    /// Returns an [`EncEnvelope`] over the JSON bytes, with `aad` bound into
    /// the tag if provided.
    ///
    /// # Errors
    /// * [`EnvelopeError::Serialization`] If the value cannot be serialized.
    /// * See [`EnvelopeCrypto::encrypt_bytes`] for the cryptographic failures.
    pub fn encrypt_json<T: Serialize>(
        &self,
        value: &T,
        aad: Option<&str>,
    ) -> Result<EncEnvelope, EnvelopeError> {
        let bytes = serde_json::to_vec(value).context("JSON encoding failed")?;
        self.encrypt_bytes(bytes, aad)
    }

    /// Decrypts an envelope and parses the plaintext as JSON.
    ///
    /// If `expected_aad` is provided it must equal the associated-data string
    /// used at encryption time, enforced by AEAD verification.
    ///
    /// # Results
    /// Returns the decoded value.
    ///
    /// # Errors
    /// * See [`EnvelopeCrypto::decrypt_bytes`] for the cryptographic failures.
    /// * [`EnvelopeError::Serialization`] If the plaintext is not valid JSON
    ///   for the target type.
    pub fn decrypt_json<T: DeserializeOwned>(
        &self,
        envelope: &EncEnvelope,
        expected_aad: Option<&str>,
    ) -> Result<T, EnvelopeError> {
        let bytes = self.decrypt_bytes(envelope, expected_aad)?;
        serde_json::from_slice(&bytes).context("JSON decoding failed")
    }
}

fn aad_bytes(aad: Option<&str>) -> &[u8] {
    aad.map_or(&[], str::as_bytes)
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    fn setup_crypto() -> EnvelopeCrypto<ChaCha> {
        EnvelopeCrypto::builder().master_key(KEY).build().expect("engine should build")
    }

    #[test]
    fn nonce_is_unique_per_call() {
        let crypto = setup_crypto();
        let a = crypto.encrypt_bytes(b"same", None).unwrap();
        let b = crypto.encrypt_bytes(b"same", None).unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn encrypt_decrypt_bytes_round_trip() {
        let crypto = setup_crypto();
        let data = b"sensitive advice payload";

        let envelope = crypto.encrypt_bytes(data, Some("record-ctx")).unwrap();
        let plaintext = crypto.decrypt_bytes(&envelope, Some("record-ctx")).unwrap();

        assert_eq!(data.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn decrypt_fails_with_wrong_aad() {
        let crypto = setup_crypto();
        let envelope = crypto.encrypt_bytes(b"data", Some("right")).unwrap();

        let err = crypto.decrypt_bytes(&envelope, Some("wrong")).unwrap_err();
        assert_eq!(err.decrypt_reason(), Some(DecryptReason::AadMismatch));
    }

    #[test]
    fn decrypt_without_aad_fails_when_aad_was_bound() {
        let crypto = setup_crypto();
        let envelope = crypto.encrypt_bytes(b"data", Some("bound")).unwrap();

        let err = crypto.decrypt_bytes(&envelope, None).unwrap_err();
        assert_eq!(err.decrypt_reason(), Some(DecryptReason::TagMismatch));
    }

    #[test]
    fn disabled_engine_refuses_every_operation() {
        let crypto = EnvelopeCrypto::<Aes>::builder().build().unwrap();
        assert!(!crypto.enabled());

        let err = crypto.encrypt_bytes(b"data", None).unwrap_err();
        assert!(matches!(err, EnvelopeError::Configuration { .. }));

        let envelope = setup_crypto_envelope();
        let err = crypto.decrypt_json::<serde_json::Value>(&envelope, None).unwrap_err();
        assert!(matches!(err, EnvelopeError::Configuration { .. }));
    }

    fn setup_crypto_envelope() -> EncEnvelope {
        EnvelopeCrypto::<Aes>::builder()
            .master_key(KEY)
            .build()
            .unwrap()
            .encrypt_bytes(b"{}", None)
            .unwrap()
    }
}
