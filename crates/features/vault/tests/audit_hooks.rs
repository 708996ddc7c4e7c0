pub mod fixtures;

use fiscus_audit::{AuditTrail, events};
use fiscus_vault::prelude::*;
use fixtures::*;

#[tokio::test]
async fn upserts_are_recorded_on_the_attached_trail() {
    let db = setup_db().await;
    let crypto = setup_crypto(Some(MASTER_KEY));
    let trail = AuditTrail::new(db.clone(), crypto.clone());
    let store = VaultStore::new(db, crypto).with_audit(trail.clone());

    let record = store
        .upsert(Category::Cellular, "Verizon", &advice("Plan advice", 10.0))
        .await
        .expect("upsert");

    trail.flush().await;

    let entries = trail.read_recent(10).await.expect("read trail");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event_type, events::VAULT_UPSERT);
    assert!(entries[0].encrypted);

    let detail = entries[0].detail.as_ref().expect("decrypted detail");
    assert_eq!(detail["id"], record.id.as_str());
    assert_eq!(detail["merchant_key"], "verizon");
    assert_eq!(detail["revision"], 1);
}

#[tokio::test]
async fn decrypt_failures_reach_the_trail_even_though_the_read_fails() {
    let db = setup_db().await;
    let crypto = setup_crypto(Some(MASTER_KEY));
    let trail = AuditTrail::new(db.clone(), crypto.clone());
    let store = VaultStore::new(db.clone(), crypto).with_audit(trail.clone());

    let record = store
        .upsert(Category::Internet, "Comcast", &advice("Modem fee", 8.0))
        .await
        .expect("upsert");

    db.query("UPDATE type::thing('vault_record', $key) SET encrypted_payload = 'garbage'")
        .bind(("key", record.identity().record_key()))
        .await
        .expect("corrupt record")
        .check()
        .expect("corruption accepted");

    let err = store.read_decrypted(&record.identity()).await.unwrap_err();
    assert!(matches!(err, VaultStoreError::Decrypt { .. }));

    trail.flush().await;

    let entries = trail.read_recent(10).await.expect("read trail");
    let failure = entries
        .iter()
        .find(|e| e.event_type == events::VAULT_DECRYPT_FAILED)
        .expect("decrypt failure recorded");
    assert_eq!(failure.detail.as_ref().expect("detail")["id"], record.id.as_str());
}
