pub mod fixtures;

use fixtures::setup_crypto;
use fiscus_envelope::prelude::*;

/// Flipping any single bit of the ciphertext must fail verification, with no
/// partial plaintext escaping.
#[test]
fn single_bit_flip_in_ciphertext_always_fails() {
    let crypto = setup_crypto();
    let envelope = crypto.encrypt_bytes(b"tamper-evident payload", None).unwrap();

    for byte in 0..envelope.ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = envelope.clone();
            tampered.ciphertext[byte] ^= 1 << bit;

            let err = crypto.decrypt_bytes(&tampered, None).unwrap_err();
            assert_eq!(
                err.decrypt_reason(),
                Some(DecryptReason::TagMismatch),
                "bit {bit} of byte {byte} survived tampering"
            );
        }
    }
}

#[test]
fn single_bit_flip_in_tag_always_fails() {
    let crypto = setup_crypto();
    let envelope = crypto.encrypt_bytes(b"tamper-evident payload", None).unwrap();

    for byte in 0..envelope.tag.len() {
        for bit in 0..8 {
            let mut tampered = envelope.clone();
            tampered.tag[byte] ^= 1 << bit;

            assert!(
                crypto.decrypt_bytes(&tampered, None).is_err(),
                "bit {bit} of tag byte {byte} survived tampering"
            );
        }
    }
}

#[test]
fn bit_flip_in_nonce_fails() {
    let crypto = setup_crypto();
    let envelope = crypto.encrypt_bytes(b"payload", Some("ctx")).unwrap();

    let mut tampered = envelope;
    tampered.nonce[0] ^= 0x01;

    assert!(crypto.decrypt_bytes(&tampered, Some("ctx")).is_err());
}

#[test]
fn truncated_nonce_or_tag_is_malformed() {
    let crypto = setup_crypto();
    let envelope = crypto.encrypt_bytes(b"payload", None).unwrap();

    let mut short_nonce = envelope.clone();
    short_nonce.nonce.pop();
    let err = crypto.decrypt_bytes(&short_nonce, None).unwrap_err();
    assert_eq!(err.decrypt_reason(), Some(DecryptReason::MalformedEnvelope));

    let mut short_tag = envelope;
    short_tag.tag.truncate(8);
    let err = crypto.decrypt_bytes(&short_tag, None).unwrap_err();
    assert_eq!(err.decrypt_reason(), Some(DecryptReason::MalformedEnvelope));
}

/// The associated data binds an envelope to its logical slot: a ciphertext
/// re-parented under another context must fail even though key, nonce, and
/// tag are all genuine.
#[test]
fn context_binding_security() {
    let crypto = setup_crypto();

    let envelope =
        crypto.encrypt_bytes(b"bound-data", Some("savings_vault:advice:v1:cellular:verizon")).unwrap();

    let err = crypto
        .decrypt_bytes(&envelope, Some("savings_vault:advice:v1:cellular:tmobile"))
        .unwrap_err();

    assert_eq!(err.decrypt_reason(), Some(DecryptReason::AadMismatch));
}
