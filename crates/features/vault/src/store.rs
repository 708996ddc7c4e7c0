use fiscus_audit::{AuditTrail, events};
use fiscus_database::Database;
use fiscus_envelope::algorithms::Aes;
use fiscus_envelope::{DecryptReason, EncEnvelope, EnvelopeCipher, EnvelopeCrypto, EnvelopeError};
use fxhash::{FxHashMap, FxHashSet};
use serde_json::json;
use std::str::FromStr;
use surrealdb::types::{Datetime, SurrealValue};
use tracing::{debug, warn};

use crate::error::{VaultStoreError, VaultStoreErrorExt};
use crate::identity::{Category, LogicalIdentity, RecordKind};
use crate::payload::VaultPayload;

/// Batch lookups are capped; generators chunk larger sets.
const MAX_BATCH: usize = 80;

/// Listing limits for the operator view.
const MIN_LIST_LIMIT: usize = 1;
const MAX_LIST_LIMIT: usize = 200;

/// Actor recorded on events the store appends about itself.
const SYSTEM_ACTOR: &str = "system";

const RECORD_FIELDS: &str = "record::id(id) AS id, kind, category, merchant, merchant_key, \
                             encrypted_payload, created_at, last_seen_at, revision";

/// One stored vault record, ciphertext intact.
#[derive(Debug, Clone)]
pub struct VaultRecord {
    pub id: String,
    pub kind: RecordKind,
    pub category: Category,
    /// Display form of the merchant name as last supplied.
    pub merchant: String,
    /// Normalized dedup key.
    pub merchant_key: String,
    pub envelope: EncEnvelope,
    pub created_at: Datetime,
    pub last_seen_at: Datetime,
    /// Bumped on every upsert; 1 on first insert.
    pub revision: i64,
}

impl VaultRecord {
    /// The identity tuple this record is stored under, rebuilt from its own
    /// columns.
    #[must_use]
    pub fn identity(&self) -> LogicalIdentity {
        LogicalIdentity::from_parts(self.kind, self.category, self.merchant_key.clone())
    }
}

#[derive(Debug, SurrealValue)]
struct VaultRow {
    id: String,
    kind: String,
    category: String,
    merchant: String,
    merchant_key: String,
    encrypted_payload: String,
    created_at: Datetime,
    last_seen_at: Datetime,
    revision: i64,
}

impl VaultRow {
    fn into_record(self) -> Result<VaultRecord, VaultStoreError> {
        let kind = RecordKind::from_str(&self.kind).map_err(|_| VaultStoreError::Internal {
            message: format!("Unknown record kind in store: {}", self.kind).into(),
            context: Some(self.id.clone().into()),
        })?;
        let category = Category::from_str(&self.category).map_err(|_| VaultStoreError::Internal {
            message: format!("Unknown category in store: {}", self.category).into(),
            context: Some(self.id.clone().into()),
        })?;
        let envelope = EncEnvelope::from_json(&self.encrypted_payload).map_err(|source| {
            VaultStoreError::Decrypt { id: self.id.clone(), source, context: None }
        })?;

        Ok(VaultRecord {
            id: self.id,
            kind,
            category,
            merchant: self.merchant,
            merchant_key: self.merchant_key,
            envelope,
            created_at: self.created_at,
            last_seen_at: self.last_seen_at,
            revision: self.revision,
        })
    }
}

/// The vault record store: one encrypted record per [`LogicalIdentity`],
/// batch dedup lookups for generators, identity-bound decryption for
/// privileged readers.
///
/// All operations are stateless per call; concurrent upserts for the same
/// identity are resolved by the store's atomic id-keyed `UPSERT`, never by a
/// read-then-write sequence. When an [`AuditTrail`] is attached, writes and
/// decrypt failures are recorded on it best-effort, independent of the
/// primary operation's outcome.
pub struct VaultStore<C = Aes>
where
    C: EnvelopeCipher,
{
    db: Database,
    crypto: EnvelopeCrypto<C>,
    audit: Option<AuditTrail<C>>,
}

impl<C: EnvelopeCipher> Clone for VaultStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), crypto: self.crypto.clone(), audit: self.audit.clone() }
    }
}

impl<C: EnvelopeCipher> std::fmt::Debug for VaultStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("db", &self.db)
            .field("crypto", &self.crypto)
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

impl<C> VaultStore<C>
where
    C: EnvelopeCipher,
{
    /// Creates a store over the given database and envelope engine.
    #[must_use]
    pub const fn new(db: Database, crypto: EnvelopeCrypto<C>) -> Self {
        Self { db, crypto, audit: None }
    }

    /// Attaches an audit trail; store writes and decrypt failures are
    /// recorded on it from then on.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditTrail<C>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Whether payload protection is available.
    #[must_use]
    pub fn encryption_enabled(&self) -> bool {
        self.crypto.enabled()
    }

    /// Looks up which of the given identities already have records, in a
    /// single round trip.
    ///
    /// Generators call this before expensive regeneration work. Input is
    /// de-duplicated and capped at 80 identities; the returned map's key set
    /// is exactly the covered subset of the input.
    ///
    /// # Errors
    /// * [`VaultStoreError::Database`] If the store call fails or times out.
    pub async fn find_batch(
        &self,
        identities: &[LogicalIdentity],
    ) -> Result<FxHashMap<LogicalIdentity, VaultRecord>, VaultStoreError> {
        let mut seen = FxHashSet::default();
        let unique: Vec<&LogicalIdentity> =
            identities.iter().filter(|i| seen.insert(*i)).take(MAX_BATCH).collect();

        if unique.len() < identities.len() {
            debug!(
                requested = identities.len(),
                queried = unique.len(),
                "Batch lookup input de-duplicated/capped"
            );
        }
        if unique.is_empty() {
            return Ok(FxHashMap::default());
        }

        let tuples: Vec<Vec<String>> = unique
            .iter()
            .map(|i| vec![i.kind.to_string(), i.category.to_string(), i.merchant_key.clone()])
            .collect();

        let mut response = self
            .db
            .bounded(
                self.db
                    .query(format!(
                        "SELECT {RECORD_FIELDS} FROM vault_record \
                         WHERE [kind, category, merchant_key] INSIDE $identities"
                    ))
                    .bind(("identities", tuples)),
            )
            .await?;

        let rows = response.take::<Vec<VaultRow>>(0).context("Parsing batch lookup")?;

        let mut found = FxHashMap::default();
        for row in rows {
            let record = row.into_record()?;
            found.insert(record.identity(), record);
        }
        Ok(found)
    }

    /// Encrypts `payload` bound to its identity and writes it in one atomic
    /// conditional statement: insert if absent, else replace the envelope,
    /// bump `revision`, and refresh `last_seen_at`.
    ///
    /// The record kind is taken from the payload variant, so a payload can
    /// never land under a foreign kind.
    ///
    /// # Errors
    /// * [`VaultStoreError::Validation`] If the merchant name normalizes to nothing.
    /// * [`VaultStoreError::Envelope`] If encryption is disabled or fails.
    /// * [`VaultStoreError::Database`] If the store call fails or times out.
    pub async fn upsert(
        &self,
        category: Category,
        merchant: &str,
        payload: &VaultPayload,
    ) -> Result<VaultRecord, VaultStoreError> {
        let identity = LogicalIdentity::new(payload.kind(), category, merchant)?;
        let aad = identity.associated_data(self.crypto.namespace());

        let envelope = self.crypto.encrypt_json(payload, Some(&aad))?;
        let encrypted_payload =
            envelope.to_json().map_err(VaultStoreError::from).context("Serializing envelope")?;

        let mut response = self
            .db
            .bounded(
                self.db
                    .query(
                        "UPSERT type::thing('vault_record', $key) SET \
                         kind = $kind, category = $category, \
                         merchant = $merchant, merchant_key = $merchant_key, \
                         encrypted_payload = $encrypted_payload, \
                         created_at = created_at ?? time::now(), \
                         last_seen_at = time::now(), \
                         revision = (revision ?? 0) + 1 \
                         RETURN record::id(id) AS id, kind, category, merchant, merchant_key, \
                                encrypted_payload, created_at, last_seen_at, revision",
                    )
                    .bind(("key", identity.record_key()))
                    .bind(("kind", identity.kind.to_string()))
                    .bind(("category", identity.category.to_string()))
                    .bind(("merchant", merchant.trim().to_owned()))
                    .bind(("merchant_key", identity.merchant_key.clone()))
                    .bind(("encrypted_payload", encrypted_payload)),
            )
            .await?;

        let record = response
            .take::<Vec<VaultRow>>(0)
            .context("Parsing upsert result")?
            .into_iter()
            .next()
            .ok_or(VaultStoreError::Internal {
                message: "Upsert returned no record".into(),
                context: None,
            })?
            .into_record()?;

        debug!(id = %record.id, revision = record.revision, "Vault record upserted");

        if let Some(audit) = &self.audit {
            audit.append(
                events::VAULT_UPSERT,
                SYSTEM_ACTOR,
                json!({
                    "id": record.id,
                    "kind": record.kind.to_string(),
                    "category": record.category.to_string(),
                    "merchant_key": record.merchant_key,
                    "revision": record.revision,
                }),
            );
        }

        Ok(record)
    }

    /// Fetches a record without decrypting it: the untouched-ciphertext path
    /// used by operators after a decrypt failure.
    ///
    /// # Errors
    /// * [`VaultStoreError::NotFound`] If no record exists for the identity.
    /// * [`VaultStoreError::Database`] If the store call fails or times out.
    pub async fn read_record(
        &self,
        identity: &LogicalIdentity,
    ) -> Result<VaultRecord, VaultStoreError> {
        let mut response = self
            .db
            .bounded(
                self.db
                    .query(format!(
                        "SELECT {RECORD_FIELDS} FROM vault_record \
                         WHERE id = type::thing('vault_record', $key)"
                    ))
                    .bind(("key", identity.record_key())),
            )
            .await?;

        response
            .take::<Vec<VaultRow>>(0)
            .context("Parsing record lookup")?
            .into_iter()
            .next()
            .ok_or_else(|| VaultStoreError::NotFound {
                message: identity.to_string().into(),
                context: None,
            })?
            .into_record()
    }

    /// Fetches and decrypts the record for `identity`.
    ///
    /// The associated-data string is recomputed from the record's own
    /// columns, never taken from the caller: a row whose columns were edited,
    /// or whose ciphertext was swapped in from another row, fails
    /// verification here.
    ///
    /// # Errors
    /// * [`VaultStoreError::NotFound`] If no record exists; kept distinct
    ///   from decrypt failures.
    /// * [`VaultStoreError::Decrypt`] If the record exists but cannot be
    ///   verified; carries the record id and leaves the ciphertext untouched.
    /// * [`VaultStoreError::Database`] If the store call fails or times out.
    pub async fn read_decrypted(
        &self,
        identity: &LogicalIdentity,
    ) -> Result<VaultPayload, VaultStoreError> {
        let record = self.read_record(identity).await?;
        let aad = record.identity().associated_data(self.crypto.namespace());

        let payload: VaultPayload = match self.crypto.decrypt_json(&record.envelope, Some(&aad)) {
            Ok(payload) => payload,
            Err(source) => return Err(self.decrypt_failure(&record, source)),
        };

        // The kind announced inside the plaintext must agree with the column
        // the AAD was computed from.
        if payload.kind() != record.kind {
            let source = EnvelopeError::Decryption {
                reason: DecryptReason::AadMismatch,
                context: Some(
                    format!(
                        "payload kind {} does not match record kind {}",
                        payload.kind(),
                        record.kind
                    )
                    .into(),
                ),
            };
            return Err(self.decrypt_failure(&record, source));
        }

        Ok(payload)
    }

    /// Lists records for the operator view: `last_seen_at` descending, ties
    /// broken by `id` ascending for determinism. `limit` is clamped to
    /// 1..=200.
    ///
    /// # Errors
    /// * [`VaultStoreError::Database`] If the store call fails or times out.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<VaultRecord>, VaultStoreError> {
        let limit = i64::try_from(limit.clamp(MIN_LIST_LIMIT, MAX_LIST_LIMIT))
            .unwrap_or_else(|_| i64::try_from(MAX_LIST_LIMIT).unwrap_or(i64::MAX));

        let mut response = self
            .db
            .bounded(
                self.db
                    .query(format!(
                        "SELECT {RECORD_FIELDS} FROM vault_record \
                         ORDER BY last_seen_at DESC, id ASC LIMIT $limit"
                    ))
                    .bind(("limit", limit)),
            )
            .await?;

        response
            .take::<Vec<VaultRow>>(0)
            .context("Parsing record listing")?
            .into_iter()
            .map(VaultRow::into_record)
            .collect()
    }

    fn decrypt_failure(&self, record: &VaultRecord, source: EnvelopeError) -> VaultStoreError {
        warn!(id = %record.id, error = %source, "Vault record failed decryption");

        if let Some(audit) = &self.audit {
            audit.append(
                events::VAULT_DECRYPT_FAILED,
                SYSTEM_ACTOR,
                json!({
                    "id": record.id,
                    "kind": record.kind.to_string(),
                    "category": record.category.to_string(),
                    "merchant_key": record.merchant_key,
                    "error": source.to_string(),
                }),
            );
        }

        VaultStoreError::Decrypt { id: record.id.clone(), source, context: None }
    }
}
