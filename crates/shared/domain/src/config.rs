use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Top-level subsystem configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsInner {
    pub database: DatabaseConfig,
    pub vault: VaultConfig,
    pub audit: AuditConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(flatten, default)]
    inner: Arc<SettingsInner>,
}

impl Deref for Settings {
    type Target = SettingsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Settings {
    fn deref_mut(&mut self) -> &mut SettingsInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// `SurrealDB` connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DatabaseCredentials>,
    /// Per-call deadline in milliseconds; a timeout is a transient failure,
    /// never "record absent".
    pub timeout_ms: u64,
}

/// `SurrealDB` root credentials (optional when using unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// Envelope-crypto configuration.
///
/// The master key is read once at process start; in deployments it arrives via
/// the environment layer (`FISCUS__VAULT__MASTER_KEY`) or a secret manager
/// that populates it, never a checked-in file. Absence disables encryption
/// system-wide.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// 32 random bytes in base64 or hex, or a legacy passphrase.
    pub master_key: Option<String>,
    /// Associated-data namespace; also salts key derivation.
    pub namespace: String,
}

/// Audit-trail configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Default number of entries returned by reads when the caller does not
    /// specify a limit.
    pub read_limit: usize,
}

// --- Default ---

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "mem://".to_owned(),
            namespace: "fiscus".to_owned(),
            database: "core".to_owned(),
            // The in-memory default needs no credentials; remote engines set
            // them via configuration.
            credentials: None,
            timeout_ms: 5_000,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { master_key: None, namespace: "savings_vault".to_owned() }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { read_limit: 300 }
    }
}
