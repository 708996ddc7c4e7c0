use fiscus_domain::config::{AuditConfig, DatabaseConfig, Settings, VaultConfig};
use serde_json::json;

#[test]
fn config_defaults_are_sane() {
    let db = DatabaseConfig::default();
    assert_eq!(db.url, "mem://");
    assert_eq!(db.namespace, "fiscus");
    assert_eq!(db.database, "core");
    assert!(db.credentials.is_none());
    assert_eq!(db.timeout_ms, 5_000);

    let vault = VaultConfig::default();
    assert!(vault.master_key.is_none());
    assert_eq!(vault.namespace, "savings_vault");

    let audit = AuditConfig::default();
    assert_eq!(audit.read_limit, 300);
}

#[test]
fn settings_deserialize() {
    let raw = json!({
        "database": { "url": "mem://", "namespace": "n", "database": "d", "credentials": null, "timeout_ms": 250 },
        "vault": { "master_key": "secret", "namespace": "custom_ns" },
        "audit": { "read_limit": 50 }
    });

    let cfg: Settings = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.database.namespace, "n");
    assert_eq!(cfg.database.timeout_ms, 250);
    assert_eq!(cfg.vault.master_key.as_deref(), Some("secret"));
    assert_eq!(cfg.vault.namespace, "custom_ns");
    assert_eq!(cfg.audit.read_limit, 50);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Settings = serde_json::from_value(json!({})).expect("config deserialize");
    assert_eq!(cfg.database.url, "mem://");
    assert!(cfg.vault.master_key.is_none());
}
