//! Authenticated-encryption envelope layer for records at rest.
//!
//! This crate turns byte strings and JSON-serializable values into
//! self-describing [`EncEnvelope`] blobs and back. It is the only component
//! that touches the master key; everything above it works with opaque
//! envelopes.
//!
//! ## Persisted format
//!
//! Envelopes serialize to a JSON object with base64-encoded binary fields,
//! the only at-rest form external tooling needs to understand:
//!
//! ```text
//! {"v":1,"alg":"aes-256-gcm","nonce":"...","ciphertext":"...","tag":"..."}
//! ```
//!
//! The `alg` field is stored, not negotiated, so a blob can never be silently
//! reinterpreted under a different cipher; unknown `v` values are rejected.
//!
//! ## Associated data
//!
//! An optional associated-data string is bound into the authentication tag
//! at encryption time. It is intentionally NOT stored in the envelope:
//! readers recompute it from the record the envelope belongs to, which makes
//! a ciphertext swapped into another record's slot fail verification.
//!
//! ## Nonce policy
//!
//! Every encryption call draws a fresh random 96-bit nonce from the OS RNG.
//! This is the standard approach for `AES-GCM` and `ChaCha20Poly1305`, but it
//! is probabilistic; rotate keys before extremely high per-key volumes.
//!
//! ## Disabled mode
//!
//! Building without a master key yields a working engine whose cryptographic
//! operations all fail with a typed configuration error. Callers branch on
//! [`EnvelopeCrypto::enabled`] and decide whether to refuse or fall back to a
//! plaintext path.
//!
//! ## Example
//!
//! ```rust
//! use fiscus_envelope::prelude::*;
//!
//! # fn main() -> Result<(), EnvelopeError> {
//! let crypto = EnvelopeCrypto::<Aes>::builder()
//!     .master_key("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=")
//!     .build()?;
//!
//! let envelope = crypto.encrypt_json(&serde_json::json!({"discount": "10%"}), Some("ctx"))?;
//! let stored = envelope.to_json()?;
//!
//! let restored = EncEnvelope::from_json(&stored)?;
//! let value: serde_json::Value = crypto.decrypt_json(&restored, Some("ctx"))?;
//! assert_eq!(value["discount"], "10%");
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod types;

pub use builder::{EnvelopeCryptoBuilder, KeyMode};
pub use engine::EnvelopeCrypto;
pub use error::{DecryptReason, EnvelopeError, EnvelopeErrorExt};
pub use types::{EncEnvelope, EnvelopeCipher};

pub mod prelude {
    pub use crate::builder::{EnvelopeCryptoBuilder, KeyMode};
    pub use crate::engine::EnvelopeCrypto;
    pub use crate::error::{DecryptReason, EnvelopeError, EnvelopeErrorExt};
    pub use crate::types::{Aes, ChaCha, EncEnvelope};
}

pub mod algorithms {
    pub use crate::types::{Aes, ChaCha, EnvelopeCipher};
}
