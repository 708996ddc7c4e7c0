//! Facade crate for the Fiscus encrypted vault and audit-trail subsystem.
//! Re-exports the subsystem crates and composes them into a ready-to-use
//! handle for host applications. Keep this crate thin: it should compose
//! other crates, not implement business logic.
//!
//! ## Usage
//!
//! ```rust
//! use fiscus::{Fiscus, domain::config::Settings};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Development defaults: in-memory store, encryption disabled.
//! let subsystem = Fiscus::init(&Settings::default()).await?;
//! assert!(!subsystem.vault.encryption_enabled());
//! # Ok(())
//! # }
//! ```
//!
//! In deployments, settings come from `fiscus.toml` plus `FISCUS__`-prefixed
//! environment variables (the master key arrives as
//! `FISCUS__VAULT__MASTER_KEY`); see [`load_settings`].

pub use fiscus_audit as audit;
pub use fiscus_database as database;
pub use fiscus_domain as domain;
pub use fiscus_envelope as envelope;
pub use fiscus_kernel as kernel;
pub use fiscus_logger as logger;
pub use fiscus_vault as vault;

use fiscus_audit::{AuditTrail, events};
use fiscus_database::Database;
use fiscus_domain::config::Settings;
use fiscus_envelope::EnvelopeCrypto;
use fiscus_kernel::config::{ConfigError, load_config};
use fiscus_logger::Logger;
use fiscus_vault::VaultStore;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod prelude {
    pub use fiscus_audit::{AuditEntry, AuditEntryView, AuditTrail};
    pub use fiscus_domain::config::Settings;
    pub use fiscus_envelope::prelude::*;
    pub use fiscus_vault::prelude::*;

    pub use crate::Fiscus;
}

/// Loads [`Settings`] from an optional file plus `FISCUS__` environment
/// overrides.
///
/// # Errors
/// Returns [`ConfigError`] if the file is missing or malformed.
pub fn load_settings(path: Option<impl AsRef<Path>>) -> Result<Settings, ConfigError> {
    load_config(path)
}

/// The composed subsystem: one database session, one envelope engine, the
/// vault store wired to the audit trail.
#[derive(Debug, Clone)]
pub struct Fiscus {
    pub settings: Settings,
    pub database: Database,
    pub crypto: EnvelopeCrypto,
    pub vault: VaultStore,
    pub audit: AuditTrail,
}

impl Fiscus {
    /// Reads the most recent audit entries using the configured default
    /// limit; callers with an explicit limit use
    /// [`AuditTrail::read_recent`] directly.
    ///
    /// # Errors
    /// See [`AuditTrail::read_recent`].
    pub async fn recent_audit_entries(
        &self,
    ) -> Result<Vec<fiscus_audit::AuditEntryView>, fiscus_audit::AuditError> {
        self.audit.read_recent(self.settings.audit.read_limit).await
    }
}

impl Fiscus {
    /// Initializes the subsystem from settings.
    ///
    /// Connects the database (applying the vault schema), builds the envelope
    /// engine from the configured master key, and wires the audit trail into
    /// the vault store. Records a configuration event on the trail stating
    /// whether encryption is enabled.
    ///
    /// # Errors
    /// Returns an error if the database connection or engine setup fails.
    /// A missing master key is NOT an error: it yields a disabled engine.
    pub async fn init(settings: &Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let mut db_builder = Database::builder()
            .url(settings.database.url.as_str())
            .session(settings.database.namespace.as_str(), settings.database.database.as_str())
            .timeout(Duration::from_millis(settings.database.timeout_ms));
        if let Some(credentials) = &settings.database.credentials {
            db_builder =
                db_builder.auth(credentials.username.as_str(), credentials.password.as_str());
        }
        let database = db_builder.init().await?;

        let mut crypto_builder =
            EnvelopeCrypto::builder().namespace(settings.vault.namespace.as_str());
        if let Some(master_key) = &settings.vault.master_key {
            crypto_builder = crypto_builder.master_key(master_key.as_str());
        }
        let crypto = crypto_builder.build()?;

        let audit = AuditTrail::new(database.clone(), crypto.clone());
        let vault = VaultStore::new(database.clone(), crypto.clone()).with_audit(audit.clone());

        audit.append(
            events::VAULT_CONFIG,
            "system",
            json!({
                "encryption_enabled": crypto.enabled(),
                "namespace": settings.vault.namespace,
            }),
        );

        info!(
            encryption_enabled = crypto.enabled(),
            namespace = %settings.vault.namespace,
            "Vault subsystem initialized"
        );

        Ok(Self { settings: settings.clone(), database, crypto, vault, audit })
    }

    /// Initializes console logging and the subsystem in one call, for
    /// binaries that don't manage their own tracing subscriber.
    ///
    /// Hold the returned [`Logger`] for the lifetime of the process.
    ///
    /// # Errors
    /// Returns an error if a global subscriber is already installed or if
    /// [`Fiscus::init`] fails.
    pub async fn bootstrap(
        settings: &Settings,
    ) -> Result<(Logger, Self), Box<dyn std::error::Error>> {
        let logger = Logger::builder().name("fiscus").init()?;
        let subsystem = Self::init(settings).await?;
        Ok((logger, subsystem))
    }
}
