//! Append-only audit trail for security-relevant events.
//!
//! Built on the same envelope format as the vault store, but independent of
//! it: vault writes, decrypt attempts, and configuration changes are recorded
//! here whether or not the primary operation succeeded.
//!
//! An entry is write-once, read-many. The global `encryption_enabled` state
//! is sampled once per append and stamped onto the entry, so historical
//! entries remain self-describing even if configuration later changes.
//!
//! Appends never fail the caller: persistence runs in a short detached task
//! and failures are logged to the tracing channel and swallowed.

mod error;
mod trail;

pub use crate::error::{AuditError, AuditErrorExt};
pub use crate::trail::{AuditBody, AuditEntry, AuditEntryView, AuditTrail};

/// Well-known event types recorded by the subsystem itself.
pub mod events {
    /// A vault record was inserted or replaced.
    pub const VAULT_UPSERT: &str = "vault_upsert";
    /// A vault record failed decryption or identity verification.
    pub const VAULT_DECRYPT_FAILED: &str = "vault_decrypt_failed";
    /// The subsystem was (re)configured; detail records the encryption state.
    pub const VAULT_CONFIG: &str = "vault_config";
}
