//! Ethereum raw-transaction decoding.
//!
//! # Data Flow
//! ```text
//! raw bytes / 0x-hex
//!     → transaction.rs (type dispatch, RLP field split)
//!     → signing_payload (unsigned fields, chain id / type byte)
//!     → recovery.rs (Keccak-256, secp256k1 recovery)
//!     → EthSender { compressed public key, address }
//! ```

mod recovery;
pub(crate) mod rlp;
pub mod transaction;
pub mod types;

pub use recovery::EthSender;
pub use transaction::{EthFees, EthRawTransaction};
pub use types::{ChainId, EthError, EthResult, EthTxType};
