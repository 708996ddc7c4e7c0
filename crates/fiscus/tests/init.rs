use fiscus::prelude::*;
use fiscus::audit::events;
use serde_json::json;

fn settings_with_key() -> Settings {
    serde_json::from_value(json!({
        "vault": { "master_key": "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=" }
    }))
    .expect("settings deserialize")
}

#[tokio::test]
async fn init_with_defaults_runs_disabled() {
    let subsystem = Fiscus::init(&Settings::default()).await.expect("init");

    assert!(!subsystem.crypto.enabled());
    assert!(!subsystem.vault.encryption_enabled());

    // The configuration event is on the trail, stored as plaintext.
    subsystem.audit.flush().await;
    let entries = subsystem.recent_audit_entries().await.expect("read trail");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event_type, events::VAULT_CONFIG);
    assert!(!entries[0].encrypted);
    assert_eq!(entries[0].detail.as_ref().unwrap()["encryption_enabled"], false);
}

#[tokio::test]
async fn end_to_end_upsert_and_read_through_the_facade() {
    let subsystem = Fiscus::init(&settings_with_key()).await.expect("init");
    assert!(subsystem.vault.encryption_enabled());

    let payload = VaultPayload::Advice(AdvicePayload {
        title: "Bundle and save".to_owned(),
        summary: Some("Combine internet and mobile".to_owned()),
        monthly_savings: 18.0,
        provider_name: Some("Verizon".to_owned()),
        provider_url: None,
        email_subject: None,
        email_body: None,
        rule: None,
        company: None,
    });

    let record = subsystem
        .vault
        .upsert(Category::Cellular, "Verizon", &payload)
        .await
        .expect("upsert");

    let identity = record.identity();
    let decrypted = subsystem.vault.read_decrypted(&identity).await.expect("decrypt");
    assert_eq!(decrypted, payload);

    // Both the config event and the upsert are on the trail, encrypted.
    subsystem.audit.flush().await;
    let entries = subsystem.audit.read_recent(10).await.expect("read trail");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.event_type == events::VAULT_UPSERT));
    assert!(entries.iter().all(|e| e.encrypted));
}
