//! Encrypted vault record store.
//!
//! Maintains the one-record-per-identity invariant for sensitive derived
//! records (savings advice, ledger events, negotiation outcomes), encrypts
//! every payload bound to its [`LogicalIdentity`], and gives generators a
//! single-round-trip batch lookup so covered identities skip regeneration.
//!
//! ## Identity binding
//!
//! Each record's envelope is sealed with an associated-data string rendered
//! from the `(kind, category, merchant_key)` tuple. The string is never
//! stored; reads recompute it from the row's own columns. Swapping row A's
//! ciphertext into row B therefore fails verification, as does editing a
//! row's identity columns.
//!
//! ## Write semantics
//!
//! [`VaultStore::upsert`] is one atomic conditional statement keyed by the
//! deterministic record id: insert if absent, else replace the envelope,
//! bump `revision`, refresh `last_seen_at`. Two concurrent generators for
//! the same identity can never produce two rows; a UNIQUE index over the
//! identity columns backs the invariant at the storage layer.

mod error;
mod identity;
mod payload;
mod store;

pub use crate::error::{VaultStoreError, VaultStoreErrorExt};
pub use crate::identity::{Category, LogicalIdentity, RecordKind, normalize_merchant};
pub use crate::payload::{
    AdvicePayload, LedgerEventPayload, NegotiationPayload, VaultPayload,
};
pub use crate::store::{VaultRecord, VaultStore};

pub mod prelude {
    pub use crate::error::{VaultStoreError, VaultStoreErrorExt};
    pub use crate::identity::{Category, LogicalIdentity, RecordKind, normalize_merchant};
    pub use crate::payload::{
        AdvicePayload, LedgerEventPayload, NegotiationPayload, VaultPayload,
    };
    pub use crate::store::{VaultRecord, VaultStore};
}
