use fiscus_envelope::prelude::*;
use proptest::prelude::*;

const MASTER_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

proptest! {
    #[test]
    fn roundtrip_arbitrary_bytes_both_ciphers(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let aes = EnvelopeCrypto::<Aes>::builder()
            .master_key(MASTER_KEY)
            .build()
            .unwrap();
        let envelope = aes.encrypt_bytes(&data, Some("ctx")).unwrap();
        let plaintext = aes.decrypt_bytes(&envelope, Some("ctx")).unwrap();
        prop_assert_eq!(&data, &plaintext);

        let chacha = EnvelopeCrypto::<ChaCha>::builder()
            .master_key(MASTER_KEY)
            .build()
            .unwrap();
        let envelope = chacha.encrypt_bytes(&data, Some("ctx")).unwrap();
        let plaintext = chacha.decrypt_bytes(&envelope, Some("ctx")).unwrap();
        prop_assert_eq!(data, plaintext);
    }

    #[test]
    fn persisted_form_round_trips(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let crypto = EnvelopeCrypto::<Aes>::builder()
            .master_key(MASTER_KEY)
            .build()
            .unwrap();

        let envelope = crypto.encrypt_bytes(&data, None).unwrap();
        let parsed = EncEnvelope::from_json(&envelope.to_json().unwrap()).unwrap();
        prop_assert_eq!(&envelope, &parsed);

        let plaintext = crypto.decrypt_bytes(&parsed, None).unwrap();
        prop_assert_eq!(data, plaintext);
    }
}
