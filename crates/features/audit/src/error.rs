use fiscus_database::DatabaseError;
use fiscus_envelope::EnvelopeError;
use std::borrow::Cow;

/// A specialized error enum for the audit trail.
///
/// Only the read path surfaces these to callers; append failures are logged
/// and swallowed so that audit-trail unavailability can never block the
/// user-facing request.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A failure in the envelope layer while protecting or reading an entry.
    #[error("Envelope error{}: {source}", format_context(.context))]
    Envelope {
        #[source]
        source: EnvelopeError,
        context: Option<Cow<'static, str>>,
    },

    /// A failure in the backing store.
    #[error("Database error{}: {source}", format_context(.context))]
    Database {
        #[source]
        source: DatabaseError,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Audit error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<EnvelopeError> for AuditError {
    #[inline]
    fn from(source: EnvelopeError) -> Self {
        Self::Envelope { source, context: None }
    }
}

impl From<DatabaseError> for AuditError {
    #[inline]
    fn from(source: DatabaseError) -> Self {
        Self::Database { source, context: None }
    }
}

/// Adds `.context(...)` to results flowing through the audit trail.
pub trait AuditErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, AuditError>;
}

impl<T> AuditErrorExt<T> for Result<T, AuditError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                AuditError::Envelope { context: c, .. }
                | AuditError::Database { context: c, .. }
                | AuditError::Internal { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> AuditErrorExt<T> for Result<T, DatabaseError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, AuditError> {
        self.map_err(|source| AuditError::Database { source, context: Some(context.into()) })
    }
}

impl<T> AuditErrorExt<T> for Result<T, surrealdb::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, AuditError> {
        self.map_err(|source| AuditError::Database {
            source: source.into(),
            context: Some(context.into()),
        })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
