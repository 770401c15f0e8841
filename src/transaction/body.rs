//! Wire shapes for transaction bodies.
//!
//! Bodies are encoded with `bincode`; the encoding is deterministic, so a
//! body serialized twice produces identical bytes and signatures over it
//! stay valid across re-serialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{KeyAlgorithm, PublicKey};
use crate::transaction::id::{AccountId, TransactionId};

#[derive(Debug, Error)]
#[error("body encoding failed: {0}")]
pub struct BodyCodecError(#[from] bincode::Error);

/// Operation-specific payload produced by an operation builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationBody {
    /// Operation name, e.g. `"crypto_transfer"`.
    pub kind: String,
    pub payload: Vec<u8>,
}

impl OperationBody {
    pub fn new(kind: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

/// The body a node receives. Identical across nodes except `node_account_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,
    pub node_account_id: AccountId,
    pub transaction_fee: u64,
    pub valid_duration_secs: u64,
    pub memo: String,
    pub operation: OperationBody,
}

impl TransactionBody {
    pub fn to_bytes(&self) -> Result<Vec<u8>, BodyCodecError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BodyCodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Signature bytes tagged by algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureData {
    Ed25519(Vec<u8>),
    EcdsaSecp256k1(Vec<u8>),
}

impl SignatureData {
    pub fn new(algorithm: KeyAlgorithm, bytes: Vec<u8>) -> Self {
        match algorithm {
            KeyAlgorithm::Ed25519 => SignatureData::Ed25519(bytes),
            KeyAlgorithm::EcdsaSecp256k1 => SignatureData::EcdsaSecp256k1(bytes),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            SignatureData::Ed25519(_) => KeyAlgorithm::Ed25519,
            SignatureData::EcdsaSecp256k1(_) => KeyAlgorithm::EcdsaSecp256k1,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            SignatureData::Ed25519(bytes) | SignatureData::EcdsaSecp256k1(bytes) => bytes,
        }
    }
}

/// One signer's signature over a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    /// Full raw public key of the signer.
    pub pub_key_prefix: Vec<u8>,
    pub signature: SignatureData,
}

impl SignaturePair {
    pub fn new(public_key: &PublicKey, signature: Vec<u8>) -> Self {
        Self {
            pub_key_prefix: public_key.to_bytes_raw(),
            signature: SignatureData::new(public_key.algorithm(), signature),
        }
    }

    pub fn is_from(&self, public_key: &PublicKey) -> bool {
        self.signature.algorithm() == public_key.algorithm()
            && self.pub_key_prefix == public_key.as_bytes()
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        PublicKey::from_algorithm_bytes(self.signature.algorithm(), &self.pub_key_prefix).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMap {
    pub sig_pair: Vec<SignaturePair>,
}

/// A body together with the signatures over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub body_bytes: Vec<u8>,
    pub sig_map: SignatureMap,
}

impl SignedTransaction {
    pub fn to_bytes(&self) -> Result<Vec<u8>, BodyCodecError> {
        Ok(bincode::serialize(self)?)
    }
}

/// Serialized form of a whole envelope: one signed body per node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionList {
    pub transactions: Vec<SignedTransaction>,
}
