//! Ethereum transaction types and error definitions.

use std::fmt;

use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope type, selected by the first byte of the raw transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthTxType {
    /// RLP list without a type prefix.
    Legacy,
    /// `0x01`: access-list transaction.
    Eip2930,
    /// `0x02`: dynamic-fee transaction.
    Eip1559,
}

impl EthTxType {
    /// Type prefix byte; `None` for legacy.
    pub fn type_byte(&self) -> Option<u8> {
        match self {
            EthTxType::Legacy => None,
            EthTxType::Eip2930 => Some(0x01),
            EthTxType::Eip1559 => Some(0x02),
        }
    }

    /// Number of RLP list items in the signed form.
    pub fn field_count(&self) -> usize {
        match self {
            EthTxType::Legacy => 9,
            EthTxType::Eip2930 => 11,
            EthTxType::Eip1559 => 12,
        }
    }
}

/// Errors that can occur while decoding a raw Ethereum transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EthError {
    /// The bytes are not a well-formed RLP transaction.
    #[error("Malformed RLP: {0}")]
    MalformedRlp(String),

    /// The type prefix names a transaction type that is not supported.
    #[error("Unsupported transaction type 0x{0:02x}")]
    UnsupportedType(u8),

    /// The signature does not recover to a public key.
    #[error("Signer recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Result type for Ethereum decoding.
pub type EthResult<T> = Result<T, EthError>;
