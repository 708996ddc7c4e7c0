//! Subsystem schema, applied idempotently on every connection.
//!
//! `OVERWRITE` definitions make re-application safe; the UNIQUE index over
//! `(kind, category, merchant_key)` is what enforces the
//! one-record-per-identity invariant at the storage layer, independent of the
//! id-keyed upsert path.

use crate::error::{DatabaseError, DatabaseErrorExt};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tracing::debug;

const SCHEMA: &str = "
    DEFINE TABLE OVERWRITE vault_record SCHEMALESS;
    DEFINE INDEX OVERWRITE vault_record_identity
        ON TABLE vault_record FIELDS kind, category, merchant_key UNIQUE;

    DEFINE TABLE OVERWRITE audit_entry SCHEMALESS;
    DEFINE INDEX OVERWRITE audit_entry_created
        ON TABLE audit_entry FIELDS created_at;
";

pub(crate) async fn define(db: &Surreal<Any>) -> Result<(), DatabaseError> {
    db.query(SCHEMA)
        .await
        .context("Applying vault schema")?
        .check()
        .map_err(surrealdb::Error::from)?;

    debug!("Vault schema applied");
    Ok(())
}
