//! Transactions: identifiers, wire bodies, the freeze state machine and
//! signature collection.
//!
//! # Data Flow
//! ```text
//! OperationBody
//!     → TransactionEnvelope (Building)
//!     → freeze: one TransactionBody per node, encoded once
//!     → sign / add_signature: SignaturePair per body
//!     → to_bytes / from_bytes: TransactionList
//! ```

pub mod body;
pub mod envelope;
pub mod id;
mod signatures;
pub mod status;

pub use body::{OperationBody, SignaturePair, SignedTransaction, TransactionBody};
pub use envelope::{
    EnvelopeState, RetryOverrides, TransactionEnvelope, TransactionError, TransactionResult,
};
pub use id::{AccountId, ParseIdError, Timestamp, TransactionId};
pub use status::{Status, StatusClass};
