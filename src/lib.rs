//! Ledger client library.
//!
//! Builds, signs and submits transactions to a set of consensus nodes, with
//! the key handling that signing needs.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                          LEDGER CLIENT                           │
//!   │                                                                  │
//!   │  ┌─────────────┐   freeze    ┌─────────────┐   sign              │
//!   │  │ transaction │────────────▶│  envelope   │◀──────── crypto     │
//!   │  │  builder    │             │ (per node)  │     (Ed25519/ECDSA, │
//!   │  └─────────────┘             └──────┬──────┘      DER, mnemonic) │
//!   │                                     │ execute                    │
//!   │                                     ▼                            │
//!   │  ┌─────────────┐  select     ┌─────────────┐  send   ┌─────────┐ │
//!   │  │   network   │◀────────────│  execution  │────────▶│Transport│─┼──▶ Node
//!   │  │ node health │             │ retry loop  │◀────────│  (dyn)  │◀┼─── Status
//!   │  └─────────────┘             └─────────────┘         └─────────┘ │
//!   │                                                                  │
//!   │  ┌────────────────────────────────────────────────────────────┐ │
//!   │  │ Cross-cutting: config · observability · resilience · error  │ │
//!   │  └────────────────────────────────────────────────────────────┘ │
//!   │                                                                  │
//!   │  ethereum: raw transaction decoding and signer recovery          │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod crypto;
pub mod ethereum;
pub mod execution;
pub mod network;
pub mod transaction;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;

pub use config::ClientConfig;
pub use crypto::{KeyAlgorithm, Mnemonic, MnemonicStatus, PrivateKey, PublicKey};
pub use error::{Error, Result};
pub use ethereum::EthRawTransaction;
pub use execution::{Cancellation, Client, Transport, TransportError, TransportResponse};
pub use transaction::{AccountId, Status, TransactionEnvelope, TransactionId};
