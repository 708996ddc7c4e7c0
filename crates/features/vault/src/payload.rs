use serde::{Deserialize, Serialize};

use crate::identity::RecordKind;

/// The plaintext side of a vault record, one variant per [`RecordKind`].
///
/// The tag travels inside the encrypted JSON, so a decrypted blob announces
/// its own kind; the store additionally checks that the announced kind
/// matches the row's `kind` column, making it impossible to read an advice
/// payload as a ledger event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultPayload {
    Advice(AdvicePayload),
    LedgerEvent(LedgerEventPayload),
    Negotiation(NegotiationPayload),
}

impl VaultPayload {
    /// The record kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Advice(_) => RecordKind::Advice,
            Self::LedgerEvent(_) => RecordKind::LedgerEvent,
            Self::Negotiation(_) => RecordKind::Negotiation,
        }
    }
}

/// A generated savings-advice payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvicePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub monthly_savings: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// One entry of the savings-event ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEventPayload {
    pub merchant: String,
    pub amount_saved: f64,
    /// RFC 3339 timestamp of when the saving took effect.
    pub occurred_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The outcome of a bill negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationPayload {
    pub provider: String,
    pub old_monthly: f64,
    pub new_monthly: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook: Option<String>,
}
