//! Cryptographic substrate.
//!
//! # Data Flow
//! ```text
//! mnemonic.rs (phrase → seed → SLIP-10) ─┐
//! der.rs (PKCS#8 / SEC1 / SPKI) ─────────┼→ keys.rs (PrivateKey / PublicKey)
//! raw bytes / OsRng ─────────────────────┘         → sign / verify
//! ```

pub mod der;
pub mod keys;
pub mod mnemonic;

pub use keys::{KeyAlgorithm, KeyError, PrivateKey, PublicKey};
pub use mnemonic::{Mnemonic, MnemonicStatus};
