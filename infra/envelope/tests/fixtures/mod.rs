use fiscus_envelope::prelude::*;

/// 32 random-looking bytes, base64-encoded (strong key form).
pub const MASTER_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

/// Initializes an AES-256-GCM engine with predefined settings for testing.
///
/// # Panics
/// * If engine setup fails, the function will panic.
#[must_use]
pub fn setup_crypto() -> EnvelopeCrypto {
    EnvelopeCrypto::builder()
        .namespace("savings_vault")
        .master_key(MASTER_KEY)
        .build()
        .expect("Envelope engine setup failed")
}
