//! Private and public keys over Ed25519 and ECDSA secp256k1.
//!
//! # Responsibilities
//! - Generate, import and export key pairs for both algorithms
//! - Sign arbitrary byte strings and verify signatures
//! - Derive the EVM address of secp256k1 public keys
//!
//! # Design Decisions
//! - Algorithms are a closed enum; dispatch is a `match`, no trait objects
//! - ECDSA signs the Keccak-256 digest of the message
//! - Public keys are stored as validated raw bytes (32-byte Ed25519 point or
//!   33-byte compressed secp256k1 point) so they can key ordered maps
//! - Key material never appears in `Debug` output or logs

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, Address};
use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::der::{self, DerError, KeyKind};

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAlgorithm {
    Ed25519,
    EcdsaSecp256k1,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Ed25519 => f.write_str("ed25519"),
            KeyAlgorithm::EcdsaSecp256k1 => f.write_str("ecdsa_secp256k1"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            "ecdsa" | "secp256k1" | "ecdsa_secp256k1" => Ok(KeyAlgorithm::EcdsaSecp256k1),
            other => Err(KeyError::InvalidKeyEncoding(format!("unknown algorithm '{}'", other))),
        }
    }
}

/// Errors raised by key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("key container holds no private key")]
    NoPrivateKey,

    #[error("{algorithm} keys do not support {operation}")]
    Unsupported {
        algorithm: KeyAlgorithm,
        operation: &'static str,
    },

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error(transparent)]
    Der(#[from] DerError),
}

/// Result type for key operations.
pub type KeyResult<T> = Result<T, KeyError>;

#[derive(Clone)]
enum SigningKey {
    Ed25519(ed25519_dalek::SigningKey),
    Ecdsa(k256::ecdsa::SigningKey),
}

/// A private key and its derived public key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key from the OS random source.
    pub fn generate(algorithm: KeyAlgorithm) -> Self {
        let inner = match algorithm {
            KeyAlgorithm::Ed25519 => SigningKey::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng)),
            KeyAlgorithm::EcdsaSecp256k1 => SigningKey::Ecdsa(k256::ecdsa::SigningKey::random(&mut OsRng)),
        };
        Self { inner }
    }

    pub fn generate_ed25519() -> Self {
        Self::generate(KeyAlgorithm::Ed25519)
    }

    pub fn generate_ecdsa() -> Self {
        Self::generate(KeyAlgorithm::EcdsaSecp256k1)
    }

    /// Import a raw 32-byte private scalar.
    ///
    /// Ed25519 also accepts the 64-byte `seed || public` keypair form.
    pub fn from_bytes(algorithm: KeyAlgorithm, raw: &[u8]) -> KeyResult<Self> {
        let inner = match algorithm {
            KeyAlgorithm::Ed25519 => {
                let seed: [u8; 32] = match raw.len() {
                    32 | 64 => raw[..32].try_into().map_err(|_| {
                        KeyError::InvalidKeyEncoding("ed25519 seed".to_string())
                    })?,
                    n => {
                        return Err(KeyError::InvalidKeyEncoding(format!(
                            "ed25519 private key must be 32 bytes, got {}",
                            n
                        )))
                    }
                };
                SigningKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))
            }
            KeyAlgorithm::EcdsaSecp256k1 => {
                let key = k256::ecdsa::SigningKey::from_slice(raw).map_err(|e| {
                    KeyError::InvalidKeyEncoding(format!("secp256k1 private key: {}", e))
                })?;
                SigningKey::Ecdsa(key)
            }
        };
        Ok(Self { inner })
    }

    /// Import from a PKCS#8 or SEC1 DER container.
    pub fn from_bytes_der(bytes: &[u8]) -> KeyResult<Self> {
        let decoded = der::decode_key(bytes)?;
        if decoded.kind != KeyKind::Private {
            return Err(KeyError::NoPrivateKey);
        }
        Self::from_bytes(decoded.algorithm, &decoded.key)
    }

    /// Import from hex-encoded DER (optional `0x` prefix).
    pub fn from_str_der(s: &str) -> KeyResult<Self> {
        Self::from_bytes_der(&decode_hex(s)?)
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self.inner {
            SigningKey::Ed25519(_) => KeyAlgorithm::Ed25519,
            SigningKey::Ecdsa(_) => KeyAlgorithm::EcdsaSecp256k1,
        }
    }

    /// The raw 32-byte private scalar.
    pub fn to_bytes_raw(&self) -> Vec<u8> {
        match &self.inner {
            SigningKey::Ed25519(key) => key.to_bytes().to_vec(),
            SigningKey::Ecdsa(key) => key.to_bytes().to_vec(),
        }
    }

    /// PKCS#8 DER encoding.
    pub fn to_bytes_der(&self) -> Vec<u8> {
        der::encode_private_key(self.algorithm(), &self.to_bytes_raw())
    }

    pub fn public_key(&self) -> PublicKey {
        match &self.inner {
            SigningKey::Ed25519(key) => PublicKey {
                algorithm: KeyAlgorithm::Ed25519,
                bytes: key.verifying_key().to_bytes().to_vec(),
            },
            SigningKey::Ecdsa(key) => PublicKey {
                algorithm: KeyAlgorithm::EcdsaSecp256k1,
                bytes: key.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
            },
        }
    }

    /// Sign `message`.
    ///
    /// Ed25519 returns the 64-byte deterministic signature. ECDSA signs the
    /// Keccak-256 digest and returns the 64-byte `r || s` form.
    pub fn sign(&self, message: &[u8]) -> KeyResult<Vec<u8>> {
        match &self.inner {
            SigningKey::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            SigningKey::Ecdsa(_) => Ok(self.sign_recoverable(message)?[..64].to_vec()),
        }
    }

    /// ECDSA only: `r(32) || s(32) || recovery_id(1)` over the Keccak-256 digest.
    pub fn sign_recoverable(&self, message: &[u8]) -> KeyResult<[u8; 65]> {
        let SigningKey::Ecdsa(key) = &self.inner else {
            return Err(KeyError::Unsupported {
                algorithm: self.algorithm(),
                operation: "recoverable signatures",
            });
        };

        let digest = keccak256(message);
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| KeyError::Derivation(format!("ecdsa signing: {}", e)))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .field("public_key", &self.public_key().to_string())
            .finish()
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_der(s)
    }
}

/// A public key; verification only.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn from_bytes_ed25519(raw: &[u8]) -> KeyResult<Self> {
        let point: [u8; 32] = raw.try_into().map_err(|_| {
            KeyError::InvalidKeyEncoding(format!("ed25519 public key must be 32 bytes, got {}", raw.len()))
        })?;
        ed25519_dalek::VerifyingKey::from_bytes(&point)
            .map_err(|e| KeyError::InvalidKeyEncoding(format!("ed25519 public key: {}", e)))?;
        Ok(Self {
            algorithm: KeyAlgorithm::Ed25519,
            bytes: point.to_vec(),
        })
    }

    /// Accepts compressed (33) or uncompressed (65) SEC1 points; stores compressed.
    pub fn from_bytes_ecdsa(raw: &[u8]) -> KeyResult<Self> {
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(raw)
            .map_err(|e| KeyError::InvalidKeyEncoding(format!("secp256k1 public key: {}", e)))?;
        Ok(Self::from_verifying_key(&key))
    }

    pub(crate) fn from_verifying_key(key: &k256::ecdsa::VerifyingKey) -> Self {
        Self {
            algorithm: KeyAlgorithm::EcdsaSecp256k1,
            bytes: key.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    pub fn from_algorithm_bytes(algorithm: KeyAlgorithm, raw: &[u8]) -> KeyResult<Self> {
        match algorithm {
            KeyAlgorithm::Ed25519 => Self::from_bytes_ed25519(raw),
            KeyAlgorithm::EcdsaSecp256k1 => Self::from_bytes_ecdsa(raw),
        }
    }

    /// Raw bytes with the algorithm inferred from length.
    pub fn from_bytes(raw: &[u8]) -> KeyResult<Self> {
        match raw.len() {
            32 => Self::from_bytes_ed25519(raw),
            33 | 65 => Self::from_bytes_ecdsa(raw),
            _ => Self::from_bytes_der(raw),
        }
    }

    /// Import from an SPKI DER container.
    pub fn from_bytes_der(bytes: &[u8]) -> KeyResult<Self> {
        let decoded = der::decode_key(bytes)?;
        match decoded.kind {
            KeyKind::Public => Self::from_algorithm_bytes(decoded.algorithm, &decoded.key),
            KeyKind::Private => Ok(PrivateKey::from_bytes(decoded.algorithm, &decoded.key)?.public_key()),
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn to_bytes_raw(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// SPKI DER encoding.
    pub fn to_bytes_der(&self) -> Vec<u8> {
        der::encode_public_key(self.algorithm, &self.bytes)
    }

    /// Check `signature` over `message`. Malformed signatures verify as false.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self.algorithm {
            KeyAlgorithm::Ed25519 => {
                let Ok(point) = <[u8; 32]>::try_from(self.bytes.as_slice()) else {
                    return false;
                };
                let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&point) else {
                    return false;
                };
                let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(message, &signature).is_ok()
            }
            KeyAlgorithm::EcdsaSecp256k1 => {
                let Ok(key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.bytes) else {
                    return false;
                };
                // recoverable signatures carry a trailing recovery id
                let compact = if signature.len() == 65 { &signature[..64] } else { signature };
                let Ok(signature) = k256::ecdsa::Signature::from_slice(compact) else {
                    return false;
                };
                let digest = keccak256(message);
                key.verify_prehash(digest.as_slice(), &signature).is_ok()
            }
        }
    }

    /// Last 20 bytes of the Keccak-256 of the uncompressed point. ECDSA only.
    pub fn to_evm_address(&self) -> Option<Address> {
        if self.algorithm != KeyAlgorithm::EcdsaSecp256k1 {
            return None;
        }
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.bytes).ok()?;
        Some(evm_address(&key))
    }
}

/// Address of a secp256k1 verifying key.
pub(crate) fn evm_address(key: &k256::ecdsa::VerifyingKey) -> Address {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

impl fmt::Display for PublicKey {
    /// Hex of the DER encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes_der()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, {})", self.algorithm, hex::encode(&self.bytes))
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(&decode_hex(s)?)
    }
}

fn decode_hex(s: &str) -> KeyResult<Vec<u8>> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(trimmed).map_err(|e| KeyError::InvalidKeyEncoding(format!("hex: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_der_import_derives_public_key() {
        let key = PrivateKey::from_str_der(
            "302e020100300506032b6570042204203a056f85d71921be62466f5e93a4af0aa2e09a9eb4b2d839e06d805366659a74",
        )
        .unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Ed25519);
        assert_eq!(
            key.public_key().to_string(),
            "302a300506032b65700321004a6892f034d2d1c9b1a76acca8e34884055172f4210a0c02e3c7d55084f224d1"
        );
    }

    #[test]
    fn test_ed25519_raw_import() {
        let raw = hex::decode("a7bd8982bb05415bbc1e2dc2ae6aced66cba5eb871a4afd1579f8620b8c00d37").unwrap();
        let key = PrivateKey::from_bytes(KeyAlgorithm::Ed25519, &raw).unwrap();
        assert_eq!(
            hex::encode(key.public_key().to_bytes_raw()),
            "b0c169d4e4b6b70f5a6d7beecd892e009390e1a113821f5d761b21725c39ac91"
        );
        assert_eq!(key.to_bytes_raw(), raw);
    }

    #[test]
    fn test_ecdsa_der_import_derives_public_key() {
        let key = PrivateKey::from_str_der(
            "3030020100300706052b8104000a04220420e06ecd79f00124bfc030b0321006683a6a579be7602f2eb52ca73e2901880682",
        )
        .unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaSecp256k1);
        assert_eq!(
            key.public_key().to_string(),
            "302d300706052b8104000a032200033697a2b3f9f0b9f4831b39986f7f3885636a3e8622a0bc3814a4a56f7ecdc4f1"
        );
    }

    #[test]
    fn test_der_round_trip_both_algorithms() {
        for algorithm in [KeyAlgorithm::Ed25519, KeyAlgorithm::EcdsaSecp256k1] {
            let key = PrivateKey::generate(algorithm);
            let restored = PrivateKey::from_bytes_der(&key.to_bytes_der()).unwrap();
            assert_eq!(restored.to_bytes_raw(), key.to_bytes_raw());

            let public = PublicKey::from_bytes_der(&key.public_key().to_bytes_der()).unwrap();
            assert_eq!(public, key.public_key());
        }
    }

    #[test]
    fn test_sign_and_verify() {
        for algorithm in [KeyAlgorithm::Ed25519, KeyAlgorithm::EcdsaSecp256k1] {
            let key = PrivateKey::generate(algorithm);
            let signature = key.sign(b"hello ledger").unwrap();
            assert_eq!(signature.len(), 64);
            assert!(key.public_key().verify(b"hello ledger", &signature));
            assert!(!key.public_key().verify(b"hello ledger!", &signature));
        }
    }

    #[test]
    fn test_ed25519_signing_is_deterministic() {
        let key = PrivateKey::generate_ed25519();
        assert_eq!(key.sign(b"payload").unwrap(), key.sign(b"payload").unwrap());
    }

    #[test]
    fn test_recoverable_signature_layout() {
        let key = PrivateKey::generate_ecdsa();
        let signature = key.sign_recoverable(b"payload").unwrap();
        assert!(signature[64] <= 3);
        assert!(key.public_key().verify(b"payload", &signature));

        let ed = PrivateKey::generate_ed25519();
        assert!(matches!(
            ed.sign_recoverable(b"payload"),
            Err(KeyError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_public_der_is_not_a_private_key() {
        let public = PrivateKey::generate_ed25519().public_key().to_bytes_der();
        assert!(matches!(PrivateKey::from_bytes_der(&public), Err(KeyError::NoPrivateKey)));
    }

    #[test]
    fn test_evm_address_only_for_ecdsa() {
        assert!(PrivateKey::generate_ed25519().public_key().to_evm_address().is_none());
        assert!(PrivateKey::generate_ecdsa().public_key().to_evm_address().is_some());
    }

    #[test]
    fn test_uncompressed_public_key_is_compressed() {
        let key = PrivateKey::generate_ecdsa();
        let point = k256::ecdsa::SigningKey::from_slice(&key.to_bytes_raw())
            .unwrap()
            .verifying_key()
            .to_encoded_point(false);
        let public = PublicKey::from_bytes(point.as_bytes()).unwrap();
        assert_eq!(public.as_bytes().len(), 33);
        assert_eq!(public, key.public_key());
    }

    #[test]
    fn test_invalid_lengths_rejected() {
        assert!(matches!(
            PrivateKey::from_bytes(KeyAlgorithm::Ed25519, &[1, 2, 3]),
            Err(KeyError::InvalidKeyEncoding(_))
        ));
        assert!(PublicKey::from_bytes_ed25519(&[0u8; 31]).is_err());
    }
}
