use fiscus_database::Database;
use fiscus_envelope::prelude::*;
use fiscus_vault::prelude::*;

pub const MASTER_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

/// Connects an in-memory store.
///
/// # Panics
/// * If the in-memory engine fails to initialize.
pub async fn setup_db() -> Database {
    Database::builder()
        .url("mem://")
        .session("vault_test", "core")
        .init()
        .await
        .expect("connect to mem://")
}

/// Builds an AES engine; `None` yields a disabled engine.
///
/// # Panics
/// * If engine setup fails.
#[must_use]
pub fn setup_crypto(master_key: Option<&str>) -> EnvelopeCrypto {
    let mut builder = EnvelopeCrypto::builder().namespace("savings_vault");
    if let Some(key) = master_key {
        builder = builder.master_key(key);
    }
    builder.build().expect("envelope engine setup failed")
}

/// A store over a fresh in-memory database with encryption enabled.
///
/// # Panics
/// * If any component fails to initialize.
pub async fn setup_store() -> VaultStore {
    VaultStore::new(setup_db().await, setup_crypto(Some(MASTER_KEY)))
}

#[must_use]
pub fn advice(title: &str, monthly_savings: f64) -> VaultPayload {
    VaultPayload::Advice(AdvicePayload {
        title: title.to_owned(),
        summary: None,
        monthly_savings,
        provider_name: None,
        provider_url: None,
        email_subject: None,
        email_body: None,
        rule: Some("discount 10%".to_owned()),
        company: None,
    })
}

/// The identity a payload of `advice(...)` lands under.
///
/// # Panics
/// * If the merchant normalizes to an empty key.
#[must_use]
pub fn advice_identity(category: Category, merchant: &str) -> LogicalIdentity {
    LogicalIdentity::new(RecordKind::Advice, category, merchant).expect("valid merchant")
}
