use fiscus_audit::{AuditTrail, events};
use fiscus_database::Database;
use fiscus_envelope::prelude::*;
use serde_json::json;
use std::time::Duration;

const MASTER_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

async fn setup_db() -> Database {
    Database::builder()
        .url("mem://")
        .session("audit_test", "core")
        .init()
        .await
        .expect("connect to mem://")
}

fn setup_crypto(master_key: Option<&str>) -> EnvelopeCrypto {
    let mut builder = EnvelopeCrypto::builder();
    if let Some(key) = master_key {
        builder = builder.master_key(key);
    }
    builder.build().expect("engine should build")
}

#[tokio::test]
async fn append_then_read_round_trip() {
    let db = setup_db().await;
    let trail = AuditTrail::new(db, setup_crypto(Some(MASTER_KEY)));

    let entry = trail.append(events::VAULT_UPSERT, "generator-1", json!({"merchant": "verizon"}));
    assert!(entry.body.is_encrypted());

    trail.flush().await;

    let views = trail.read_recent(10).await.expect("read_recent");
    assert_eq!(views.len(), 1);

    let view = &views[0];
    assert_eq!(view.id, entry.id);
    assert_eq!(view.actor, "generator-1");
    assert_eq!(view.event_type, events::VAULT_UPSERT);
    assert!(view.encrypted);
    assert!(view.decrypted);
    assert_eq!(view.detail.as_ref().unwrap()["merchant"], "verizon");
    assert!(view.error.is_none());
}

#[tokio::test]
async fn plaintext_entries_when_encryption_disabled() {
    let db = setup_db().await;
    let trail = AuditTrail::new(db, setup_crypto(None));

    let entry = trail.append("config_check", "operator", json!({"enabled": false}));
    assert!(!entry.body.is_encrypted());

    trail.flush().await;

    let views = trail.read_recent(10).await.expect("read_recent");
    assert_eq!(views.len(), 1);
    assert!(!views[0].encrypted);
    assert!(views[0].decrypted);
    assert_eq!(views[0].detail.as_ref().unwrap()["enabled"], false);
}

#[tokio::test]
async fn encrypted_flag_reflects_write_time_state_not_read_time() {
    let db = setup_db().await;

    // Write with encryption enabled.
    let writer = AuditTrail::new(db.clone(), setup_crypto(Some(MASTER_KEY)));
    writer.append("rotation", "system", json!({"step": 1}));
    writer.flush().await;

    // Read after the key was dropped from configuration: the entry still
    // says encrypted=true, and its detail is reported as unreadable rather
    // than silently missing.
    let keyless_reader = AuditTrail::new(db.clone(), setup_crypto(None));
    let views = keyless_reader.read_recent(10).await.expect("read_recent");
    assert_eq!(views.len(), 1);
    assert!(views[0].encrypted);
    assert!(!views[0].decrypted);
    assert!(views[0].error.is_some());

    // A reader with the key decrypts the same entry.
    let keyed_reader = AuditTrail::new(db, setup_crypto(Some(MASTER_KEY)));
    let views = keyed_reader.read_recent(10).await.expect("read_recent");
    assert!(views[0].decrypted);
}

#[tokio::test]
async fn newest_entries_come_first() {
    let db = setup_db().await;
    let trail = AuditTrail::new(db, setup_crypto(Some(MASTER_KEY)));

    for step in 0..3 {
        trail.append("ordered", "system", json!({"step": step}));
        trail.flush().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let views = trail.read_recent(10).await.expect("read_recent");
    assert_eq!(views.len(), 3);
    assert_eq!(views[0].detail.as_ref().unwrap()["step"], 2);
    assert_eq!(views[2].detail.as_ref().unwrap()["step"], 0);
}

#[tokio::test]
async fn read_limit_is_clamped_and_respected() {
    let db = setup_db().await;
    let trail = AuditTrail::new(db, setup_crypto(Some(MASTER_KEY)));

    for step in 0..5 {
        trail.append("clamped", "system", json!({"step": step}));
    }
    trail.flush().await;

    // Zero is clamped up to one entry, absurd limits are tolerated.
    assert_eq!(trail.read_recent(0).await.expect("read_recent").len(), 1);
    assert_eq!(trail.read_recent(2).await.expect("read_recent").len(), 2);
    assert_eq!(trail.read_recent(1_000_000).await.expect("read_recent").len(), 5);
}

#[tokio::test]
async fn corrupted_entry_does_not_abort_the_read() {
    let db = setup_db().await;
    let trail = AuditTrail::new(db.clone(), setup_crypto(Some(MASTER_KEY)));

    trail.append("good", "system", json!({"n": 1}));
    trail.append("bad", "system", json!({"n": 2}));
    trail.flush().await;

    db.query("UPDATE audit_entry SET detail = 'not-an-envelope' WHERE event_type = 'bad'")
        .await
        .expect("corrupt entry")
        .check()
        .expect("update accepted");

    let views = trail.read_recent(10).await.expect("read_recent");
    assert_eq!(views.len(), 2);

    let bad = views.iter().find(|v| v.event_type == "bad").expect("bad entry present");
    assert!(!bad.decrypted);
    assert!(bad.error.is_some());

    let good = views.iter().find(|v| v.event_type == "good").expect("good entry present");
    assert!(good.decrypted);
    assert_eq!(good.detail.as_ref().unwrap()["n"], 1);
}

#[tokio::test]
async fn appends_survive_a_store_that_rejects_writes() {
    let db = setup_db().await;

    // Make every insert into audit_entry fail its field assertion.
    db.query(
        "DEFINE FIELD OVERWRITE event_type ON audit_entry ASSERT $value == 'never-matches'",
    )
    .await
    .expect("define assert")
    .check()
    .expect("assert accepted");

    let trail = AuditTrail::new(db, setup_crypto(Some(MASTER_KEY)));

    // Audit unavailability must never raise to the caller.
    for step in 0..1000 {
        let entry = trail.append("rejected", "system", json!({"step": step}));
        assert!(!entry.id.is_empty());
    }
    trail.flush().await;

    let views = trail.read_recent(2000).await.expect("read_recent");
    assert!(views.is_empty(), "every insert should have been rejected by the assertion");
}
