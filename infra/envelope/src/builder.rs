use aead::Key;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hkdf::Hkdf;
use sha2::Sha256;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::engine::{CryptoInner, EnvelopeCrypto};
use crate::error::EnvelopeError;
use crate::types::{Aes, EnvelopeCipher};

/// Default associated-data namespace and key-derivation salt.
pub(crate) const DEFAULT_NAMESPACE: &str = "savings_vault";

/// HKDF expansion label; versioned so a future format can re-derive keys.
const KDF_INFO: &[u8] = b"fiscus:envelope:v1";

/// How the master secret was interpreted.
///
/// `Strong` means the configured value decoded to 32 random bytes
/// (base64 or hex). `Legacy` means a passphrase was supplied and the key was
/// derived from it; accepted for compatibility with early deployments and
/// logged as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    Strong,
    Legacy,
}

/// A builder for secure initialization of the [`EnvelopeCrypto`] engine.
///
/// Implements `ZeroizeOnDrop` so raw key material is cleared from memory as
/// soon as the builder is no longer needed. Building without a master key is
/// valid and produces a *disabled* engine: [`EnvelopeCrypto::enabled`]
/// returns `false` and every cryptographic operation fails with
/// [`EnvelopeError::Configuration`].
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeCryptoBuilder<C: EnvelopeCipher = Aes> {
    #[zeroize(skip)]
    _cipher: PhantomData<C>,
    #[zeroize(skip)]
    namespace: String,
    secret: Option<String>,
}

impl<C: EnvelopeCipher> Default for EnvelopeCryptoBuilder<C> {
    fn default() -> Self {
        Self { _cipher: PhantomData, namespace: DEFAULT_NAMESPACE.to_owned(), secret: None }
    }
}

impl<C: EnvelopeCipher> EnvelopeCryptoBuilder<C> {
    /// Creates a new builder with the default namespace and no key.
    #[must_use = "Builder does nothing until `build` is called"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the associated-data namespace, which doubles as the HKDF salt.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Provides the master secret.
    ///
    /// Accepted forms, in order of preference:
    /// * base64 of 32 random bytes ([`KeyMode::Strong`]),
    /// * hex of 32 random bytes ([`KeyMode::Strong`]),
    /// * any other non-empty string, treated as a passphrase ([`KeyMode::Legacy`]).
    ///
    /// A blank value is equivalent to not configuring a key at all.
    #[must_use]
    pub fn master_key(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Finalizes engine construction and zeroizes the builder.
    ///
    /// # Results
    /// Returns an [`EnvelopeCrypto`] engine; disabled when no usable master
    /// key was provided.
    ///
    /// # Errors
    /// Returns [`EnvelopeError::Configuration`] if key derivation or cipher
    /// initialization fails.
    pub fn build(mut self) -> Result<EnvelopeCrypto<C>, EnvelopeError> {
        let cipher = match self.secret.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let (ikm, mode) = parse_master_key(raw);
                if mode == KeyMode::Legacy {
                    warn!(
                        "Master key is not a 32-byte base64/hex value; deriving a legacy key \
                         from the passphrase"
                    );
                }
                let key = derive_key(&ikm, self.namespace.as_bytes())?;
                Some(init_cipher::<C>(&key)?)
            },
        };

        let inner = CryptoInner { cipher, namespace: std::mem::take(&mut self.namespace) };
        self.zeroize();

        Ok(EnvelopeCrypto::from_inner(Arc::new(inner)))
    }
}

/// Interprets the configured secret as input keying material.
pub(crate) fn parse_master_key(raw: &str) -> (Zeroizing<Vec<u8>>, KeyMode) {
    if let Ok(bytes) = STANDARD.decode(raw.as_bytes())
        && bytes.len() == 32
    {
        return (Zeroizing::new(bytes), KeyMode::Strong);
    }
    if let Ok(bytes) = hex::decode(raw)
        && bytes.len() == 32
    {
        return (Zeroizing::new(bytes), KeyMode::Strong);
    }
    (Zeroizing::new(raw.as_bytes().to_vec()), KeyMode::Legacy)
}

/// Derives the AEAD key from the master secret using HKDF-SHA256.
fn derive_key(ikm: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, EnvelopeError> {
    let (_, hk) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    let mut key = Zeroizing::new([0u8; 32]);

    hk.expand(KDF_INFO, &mut *key).map_err(|_| EnvelopeError::Configuration {
        message: "HKDF expansion failed for envelope key".into(),
        context: None,
    })?;

    Ok(key)
}

fn init_cipher<C: EnvelopeCipher>(key: &[u8; 32]) -> Result<C, EnvelopeError> {
    let key = Key::<C>::try_from(&key[..]).map_err(|_| EnvelopeError::Configuration {
        message: format!("Invalid key length {}, must be 32 bytes", key.len()).into(),
        context: Some(C::ALG.into()),
    })?;
    Ok(C::new(&key))
}
