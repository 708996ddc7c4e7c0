use chrono::{DateTime, SecondsFormat, Utc};
use fiscus_database::{Database, DatabaseError};
use fiscus_envelope::algorithms::Aes;
use fiscus_envelope::{EncEnvelope, EnvelopeCipher, EnvelopeCrypto};
use fiscus_kernel::safe_nanoid;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use surrealdb::types::{Datetime, SurrealValue};
use tracing::warn;

use crate::error::{AuditError, AuditErrorExt};

/// Read limits; requests outside the window are clamped, not rejected.
const MIN_READ_LIMIT: usize = 1;
const MAX_READ_LIMIT: usize = 2000;

/// What an entry carries: an envelope when encryption was enabled at write
/// time, the plain detail otherwise.
///
/// The choice is stamped into the entry itself (`encrypted` column) so reads
/// never consult the *current* configuration to interpret *past* data.
#[derive(Debug, Clone)]
pub enum AuditBody {
    Encrypted(EncEnvelope),
    Plain(serde_json::Value),
}

impl AuditBody {
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

/// One security-relevant event, write-once.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: String,
    pub actor: String,
    pub event_type: String,
    pub body: AuditBody,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    fn detail_json(&self) -> Result<String, AuditError> {
        match &self.body {
            AuditBody::Encrypted(envelope) => Ok(envelope.to_json()?),
            AuditBody::Plain(value) => Ok(value.to_string()),
        }
    }
}

/// Read-side projection of one entry.
///
/// Encrypted entries are decrypted opportunistically; a failure is reported
/// per entry (`decrypted: false` plus `error`) without aborting the read.
#[derive(Debug, Clone)]
pub struct AuditEntryView {
    pub id: String,
    pub actor: String,
    pub event_type: String,
    pub encrypted: bool,
    pub created_at: Datetime,
    pub decrypted: bool,
    pub detail: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct AuditRow {
    id: String,
    actor: String,
    event_type: String,
    detail: String,
    encrypted: bool,
    created_at: Datetime,
}

/// Fields of an entry queued for persistence, detached from the caller.
#[derive(Debug)]
struct PendingEntry {
    id: String,
    actor: String,
    event_type: String,
    detail: String,
    encrypted: bool,
    created_at: String,
}

/// The append-only audit trail.
///
/// Appends are independent of the vault store's success or failure: a failed
/// or tampered vault write is still observable here. Persistence happens off
/// the caller's critical path in a short detached task; a persistence failure
/// is logged and swallowed, because audit-trail unavailability must never
/// block the user-facing request.
pub struct AuditTrail<C = Aes>
where
    C: EnvelopeCipher,
{
    db: Database,
    crypto: EnvelopeCrypto<C>,
    in_flight: Arc<AtomicUsize>,
}

impl<C: EnvelopeCipher> std::fmt::Debug for AuditTrail<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("db", &self.db)
            .field("crypto", &self.crypto)
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C: EnvelopeCipher> Clone for AuditTrail<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            crypto: self.crypto.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<C> AuditTrail<C>
where
    C: EnvelopeCipher,
{
    /// Creates a trail over the given store and envelope engine.
    #[must_use]
    pub fn new(db: Database, crypto: EnvelopeCrypto<C>) -> Self {
        Self { db, crypto, in_flight: Arc::new(AtomicUsize::new(0)) }
    }

    /// Appends one event. Infallible for the caller.
    ///
    /// When the envelope engine is enabled the detail is encrypted and the
    /// entry stamped `encrypted = true`; otherwise the detail is stored as
    /// plaintext with `encrypted = false`. The constructed entry is returned
    /// immediately; the store write is dispatched to a detached task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn append(
        &self,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        detail: serde_json::Value,
    ) -> AuditEntry {
        let event_type = event_type.into();
        let actor = actor.into();

        let body = if self.crypto.enabled() {
            match self.crypto.encrypt_json(&detail, None) {
                Ok(envelope) => AuditBody::Encrypted(envelope),
                Err(err) => {
                    warn!(error = %err, "Audit detail encryption failed, storing plaintext");
                    AuditBody::Plain(detail)
                },
            }
        } else {
            AuditBody::Plain(detail)
        };

        let entry = AuditEntry {
            id: safe_nanoid!(),
            actor,
            event_type,
            body,
            created_at: Utc::now(),
        };

        match entry.detail_json() {
            Ok(detail) => self.dispatch(PendingEntry {
                id: entry.id.clone(),
                actor: entry.actor.clone(),
                event_type: entry.event_type.clone(),
                detail,
                encrypted: entry.body.is_encrypted(),
                created_at: entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            }),
            Err(err) => {
                warn!(entry = %entry.id, error = %err, "Audit entry could not be serialized");
            },
        }

        entry
    }

    fn dispatch(&self, pending: PendingEntry) {
        let db = self.db.clone();
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(async move {
            if let Err(err) = persist(&db, pending).await {
                warn!(error = %err, "Audit entry persistence failed");
            }
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }

    /// Waits until all dispatched appends have settled.
    ///
    /// A synchronization point for shutdown and tests; normal callers never
    /// need it.
    pub async fn flush(&self) {
        while self.in_flight.load(Ordering::Acquire) > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Returns the most recent entries, newest first.
    ///
    /// `limit` is clamped to 1..=2000. Encrypted entries are decrypted
    /// opportunistically; individual failures are reported in the view
    /// without failing the read.
    ///
    /// # Errors
    /// * [`AuditError::Database`] If the store is unavailable or the query fails.
    pub async fn read_recent(&self, limit: usize) -> Result<Vec<AuditEntryView>, AuditError> {
        let limit = i64::try_from(limit.clamp(MIN_READ_LIMIT, MAX_READ_LIMIT))
            .unwrap_or_else(|_| i64::try_from(MAX_READ_LIMIT).unwrap_or(i64::MAX));

        let mut response = self
            .db
            .bounded(
                self.db
                    .query(
                        "SELECT record::id(id) AS id, actor, event_type, detail, encrypted, \
                         created_at FROM audit_entry \
                         ORDER BY created_at DESC, id ASC LIMIT $limit",
                    )
                    .bind(("limit", limit)),
            )
            .await?;

        let rows = response.take::<Vec<AuditRow>>(0).context("Parsing audit entries")?;

        Ok(rows.into_iter().map(|row| self.into_view(row)).collect())
    }

    fn into_view(&self, row: AuditRow) -> AuditEntryView {
        let (decrypted, detail, error) = if row.encrypted {
            match EncEnvelope::from_json(&row.detail)
                .and_then(|envelope| self.crypto.decrypt_json::<serde_json::Value>(&envelope, None))
            {
                Ok(value) => (true, Some(value), None),
                Err(err) => (false, None, Some(err.to_string())),
            }
        } else {
            match serde_json::from_str(&row.detail) {
                Ok(value) => (true, Some(value), None),
                Err(err) => (false, None, Some(err.to_string())),
            }
        };

        AuditEntryView {
            id: row.id,
            actor: row.actor,
            event_type: row.event_type,
            encrypted: row.encrypted,
            created_at: row.created_at,
            decrypted,
            detail,
            error,
        }
    }
}

async fn persist(db: &Database, pending: PendingEntry) -> Result<(), AuditError> {
    db.bounded(
        db.query(
            "CREATE type::thing('audit_entry', $id) SET \
             actor = $actor, event_type = $event_type, detail = $detail, \
             encrypted = $encrypted, created_at = <datetime> $created_at",
        )
        .bind(("id", pending.id))
        .bind(("actor", pending.actor))
        .bind(("event_type", pending.event_type))
        .bind(("detail", pending.detail))
        .bind(("encrypted", pending.encrypted))
        .bind(("created_at", pending.created_at)),
    )
    .await?
    .check()
    .map_err(surrealdb::Error::from)
    .map_err(DatabaseError::from)?;

    Ok(())
}
