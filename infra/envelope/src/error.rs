//! # Envelope Errors
//!
//! This module defines the [`EnvelopeError`] enum used throughout the envelope
//! crate for reporting cryptographic, serialization, and configuration failures.

use std::borrow::Cow;
use std::fmt;

/// Why a decryption attempt was rejected.
///
/// Tag-verification failures cannot be told apart cryptographically: a wrong
/// key, a flipped ciphertext bit, and a wrong associated-data string all
/// surface as the same AEAD failure. The reason is therefore classified by
/// what the caller supplied: [`DecryptReason::AadMismatch`] when an
/// associated-data string was bound at decrypt time, [`DecryptReason::TagMismatch`]
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptReason {
    /// The envelope declares a format version this build does not understand.
    UnsupportedVersion,
    /// The envelope was produced by a different cipher than the one configured.
    UnsupportedAlgorithm,
    /// The envelope is structurally invalid (bad field lengths or unparsable form).
    MalformedEnvelope,
    /// AEAD tag verification failed with no caller-supplied associated data.
    TagMismatch,
    /// AEAD tag verification failed while associated data was bound.
    AadMismatch,
}

impl fmt::Display for DecryptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsupportedVersion => "unsupported version",
            Self::UnsupportedAlgorithm => "unsupported algorithm",
            Self::MalformedEnvelope => "malformed envelope",
            Self::TagMismatch => "tag mismatch",
            Self::AadMismatch => "aad mismatch",
        };
        f.write_str(name)
    }
}

/// A specialized error enum for envelope crypto failures.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// No master key is configured; encryption and decryption are unavailable.
    ///
    /// Fatal for the calling request, never for the process.
    #[error("Configuration error{}: {message}", format_context(.context))]
    Configuration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure during the encryption process.
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Failure during the decryption process.
    ///
    /// Carries the classified [`DecryptReason`]. Never retried: repeating a
    /// failed cryptographic verification cannot succeed.
    #[error("Decryption error ({reason}){}", format_context(.context))]
    Decryption { reason: DecryptReason, context: Option<Cow<'static, str>> },

    /// Failure during JSON serialization or deserialization of a payload.
    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },
}

impl EnvelopeError {
    /// Shorthand for a decryption failure without additional context.
    #[must_use]
    pub const fn decryption(reason: DecryptReason) -> Self {
        Self::Decryption { reason, context: None }
    }

    /// Returns the decrypt-failure reason, if this is a decryption error.
    #[must_use]
    pub const fn decrypt_reason(&self) -> Option<DecryptReason> {
        match self {
            Self::Decryption { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EnvelopeError {
    #[inline]
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization { source, context: None }
    }
}

/// Adds `.context(...)` to results flowing through the envelope layer.
pub trait EnvelopeErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, EnvelopeError>;
}

impl<T> EnvelopeErrorExt<T> for Result<T, EnvelopeError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                EnvelopeError::Configuration { context: c, .. }
                | EnvelopeError::Encryption { context: c, .. }
                | EnvelopeError::Decryption { context: c, .. }
                | EnvelopeError::Serialization { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> EnvelopeErrorExt<T> for Result<T, serde_json::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, EnvelopeError> {
        self.map_err(|source| EnvelopeError::Serialization {
            source,
            context: Some(context.into()),
        })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
