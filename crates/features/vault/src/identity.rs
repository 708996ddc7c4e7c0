use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

use crate::error::VaultStoreError;

/// Version segment of the associated-data string. Bump when the binding
/// format changes so old envelopes keep verifying under the old string.
pub(crate) const IDENTITY_BINDING_VERSION: u8 = 1;

/// Normalized merchant keys are capped so unbounded input can never become
/// an unbounded index key.
pub(crate) const MERCHANT_KEY_MAX_LEN: usize = 80;

/// What a vault record protects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    /// A generated savings-advice payload.
    Advice,
    /// One entry of the savings-event ledger.
    LedgerEvent,
    /// The outcome of a bill negotiation.
    Negotiation,
}

/// Spending category a record belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Insurance,
    Cellular,
    Utilities,
    Internet,
    Subscription,
    Other,
}

/// Folds a merchant/provider name into its canonical dedup key: lowercase,
/// non-alphanumerics become spaces, whitespace collapses, bounded length.
#[must_use]
pub fn normalize_merchant(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut key = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !key.is_empty() {
                key.push(' ');
            }
            key.push(c);
            pending_space = false;
        } else {
            pending_space = true;
        }
    }

    key.truncate(MERCHANT_KEY_MAX_LEN);
    // Truncation can leave a trailing space when it cuts between words.
    while key.ends_with(' ') {
        key.pop();
    }
    key
}

/// The tuple that uniquely names one vault record.
///
/// At most one non-tombstoned record exists per identity; the tuple is also
/// rendered into the associated-data string bound into that record's
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalIdentity {
    pub kind: RecordKind,
    pub category: Category,
    pub merchant_key: String,
}

impl LogicalIdentity {
    /// Builds an identity from a raw merchant name, normalizing it.
    ///
    /// # Errors
    /// * [`VaultStoreError::Validation`] If the merchant name is empty after
    ///   normalization.
    pub fn new(
        kind: RecordKind,
        category: Category,
        merchant: &str,
    ) -> Result<Self, VaultStoreError> {
        let merchant_key = normalize_merchant(merchant);
        if merchant_key.is_empty() {
            return Err(VaultStoreError::Validation {
                message: "Merchant name is empty after normalization".into(),
                context: Some(format!("input={merchant:?}").into()),
            });
        }
        Ok(Self { kind, category, merchant_key })
    }

    /// Rebuilds an identity from stored row columns, which are already
    /// normalized.
    pub(crate) const fn from_parts(
        kind: RecordKind,
        category: Category,
        merchant_key: String,
    ) -> Self {
        Self { kind, category, merchant_key }
    }

    /// Renders the associated-data string bound into this record's envelope.
    ///
    /// The string is recomputed from row columns at read time; it is never
    /// stored alongside the ciphertext.
    #[must_use]
    pub fn associated_data(&self, namespace: &str) -> String {
        format!(
            "{namespace}:{}:v{IDENTITY_BINDING_VERSION}:{}:{}",
            self.kind, self.category, self.merchant_key
        )
    }

    /// Deterministic record key: the same identity always maps to the same
    /// storage slot, which is what makes the id-keyed upsert atomic.
    #[must_use]
    pub fn record_key(&self) -> String {
        format!("{}:{}:{}", self.kind, self.category, self.merchant_key)
    }
}

impl fmt::Display for LogicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.category, self.merchant_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_case_and_punctuation() {
        assert_eq!(normalize_merchant("  Verizon  Wireless "), "verizon wireless");
        assert_eq!(normalize_merchant("T-Mobile*US"), "t mobile us");
        assert_eq!(normalize_merchant("AT&T"), "at t");
        assert_eq!(normalize_merchant("...!!!"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_merchant("Geico / Auto-Insurance");
        assert_eq!(normalize_merchant(&once), once);
    }

    #[test]
    fn normalization_is_bounded() {
        let long = "x".repeat(500);
        assert_eq!(normalize_merchant(&long).len(), MERCHANT_KEY_MAX_LEN);

        let words = "ab ".repeat(100);
        let key = normalize_merchant(&words);
        assert!(key.len() <= MERCHANT_KEY_MAX_LEN);
        assert!(!key.ends_with(' '));
    }

    #[test]
    fn associated_data_is_deterministic() {
        let identity =
            LogicalIdentity::new(RecordKind::Advice, Category::Cellular, "Verizon").unwrap();
        assert_eq!(
            identity.associated_data("savings_vault"),
            "savings_vault:advice:v1:cellular:verizon"
        );
        assert_eq!(identity.record_key(), "advice:cellular:verizon");
    }

    #[test]
    fn empty_merchant_is_rejected() {
        let err = LogicalIdentity::new(RecordKind::Advice, Category::Other, "###").unwrap_err();
        assert!(matches!(err, VaultStoreError::Validation { .. }));
    }

    #[test]
    fn kind_and_category_render_snake_case() {
        assert_eq!(RecordKind::LedgerEvent.to_string(), "ledger_event");
        assert_eq!(Category::Cellular.to_string(), "cellular");

        let parsed: RecordKind = "ledger_event".parse().unwrap();
        assert_eq!(parsed, RecordKind::LedgerEvent);
    }
}
