use fiscus_database::DatabaseError;
use fiscus_envelope::EnvelopeError;
use std::borrow::Cow;

/// A specialized error enum for the vault record store.
///
/// "No such record" ([`VaultStoreError::NotFound`]) and "record exists but
/// could not be verified" ([`VaultStoreError::Decrypt`]) are deliberately
/// separate variants: the latter is a security-relevant event and is never
/// downgraded to the former.
#[derive(Debug, thiserror::Error)]
pub enum VaultStoreError {
    /// Input validation failed before any store call was made.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No record exists for the requested identity.
    #[error("Record not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A record exists but failed decryption or identity verification.
    ///
    /// Carries the record id so operators can locate the untouched ciphertext.
    #[error("Decrypt failed for record {id}{}: {source}", format_context(.context))]
    Decrypt {
        id: String,
        #[source]
        source: EnvelopeError,
        context: Option<Cow<'static, str>>,
    },

    /// A failure in the envelope layer on the write path.
    #[error("Envelope error{}: {source}", format_context(.context))]
    Envelope {
        #[source]
        source: EnvelopeError,
        context: Option<Cow<'static, str>>,
    },

    /// A failure in the backing store, including elapsed deadlines
    /// (transient `Unavailable`, which callers may retry).
    #[error("Database error{}: {source}", format_context(.context))]
    Database {
        #[source]
        source: DatabaseError,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal vault store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<EnvelopeError> for VaultStoreError {
    #[inline]
    fn from(source: EnvelopeError) -> Self {
        Self::Envelope { source, context: None }
    }
}

impl From<DatabaseError> for VaultStoreError {
    #[inline]
    fn from(source: DatabaseError) -> Self {
        Self::Database { source, context: None }
    }
}

/// Adds `.context(...)` to results flowing through the vault store.
pub trait VaultStoreErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, VaultStoreError>;
}

impl<T> VaultStoreErrorExt<T> for Result<T, VaultStoreError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                VaultStoreError::Validation { context: c, .. }
                | VaultStoreError::NotFound { context: c, .. }
                | VaultStoreError::Decrypt { context: c, .. }
                | VaultStoreError::Envelope { context: c, .. }
                | VaultStoreError::Database { context: c, .. }
                | VaultStoreError::Internal { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> VaultStoreErrorExt<T> for Result<T, DatabaseError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, VaultStoreError> {
        self.map_err(|source| VaultStoreError::Database { source, context: Some(context.into()) })
    }
}

impl<T> VaultStoreErrorExt<T> for Result<T, surrealdb::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, VaultStoreError> {
        self.map_err(|source| VaultStoreError::Database {
            source: source.into(),
            context: Some(context.into()),
        })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
