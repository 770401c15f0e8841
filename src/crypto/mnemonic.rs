//! BIP-39 recovery phrases.
//!
//! # Responsibilities
//! - Generate 24-word (256-bit) and 12-word (128-bit) phrases
//! - Validate phrases, reporting the first class of problem found
//! - Derive an Ed25519 private key from a phrase and passphrase
//!
//! # Design Decisions
//! - The English dictionary comes from `tiny-bip39`; it is materialised once
//!   so unknown words can be reported by position
//! - Validation precedence is length, then unknown words, then checksum
//! - Key derivation runs the BIP-39 seed KDF and then SLIP-10 along
//!   `m/44'/3030'/0'/0'`

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use bip39::Language;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::crypto::keys::{KeyAlgorithm, KeyError, KeyResult, PrivateKey};

/// Hardened SLIP-10 path for account keys.
pub const ACCOUNT_PATH: [u32; 4] = [44, 3030, 0, 0];

const WORDLIST_LEN: usize = 2048;
const BITS_PER_WORD: usize = 11;

/// Outcome of validating a phrase. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MnemonicStatus {
    Ok,
    /// Neither 12 nor 24 words.
    BadLength,
    /// Zero-based positions of words missing from the dictionary.
    UnknownWords(Vec<usize>),
    ChecksumMismatch,
    /// Reserved for the legacy 22-word dictionary, which is not shipped.
    UnknownLegacyWords(Vec<usize>),
}

impl MnemonicStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, MnemonicStatus::Ok)
    }
}

impl fmt::Display for MnemonicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MnemonicStatus::Ok => f.write_str("ok"),
            MnemonicStatus::BadLength => f.write_str("mnemonic must have 12 or 24 words"),
            MnemonicStatus::UnknownWords(indices) => {
                write!(f, "unknown words at positions {:?}", indices)
            }
            MnemonicStatus::ChecksumMismatch => f.write_str("checksum mismatch"),
            MnemonicStatus::UnknownLegacyWords(indices) => {
                write!(f, "unknown legacy words at positions {:?}", indices)
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("invalid mnemonic: {0}")]
    Invalid(MnemonicStatus),
}

struct Wordlist {
    words: Vec<String>,
    index: HashMap<String, usize>,
}

/// The English dictionary, in index order.
///
/// Word `i` is the first word of the phrase for an entropy whose leading
/// 11 bits equal `i`.
fn wordlist() -> &'static Wordlist {
    static WORDLIST: OnceLock<Wordlist> = OnceLock::new();
    WORDLIST.get_or_init(|| {
        let words: Vec<String> = (0..WORDLIST_LEN)
            .filter_map(|i| {
                let mut entropy = [0u8; 16];
                entropy[0] = (i >> 3) as u8;
                entropy[1] = ((i & 0x7) << 5) as u8;
                let phrase = bip39::Mnemonic::from_entropy(&entropy, Language::English).ok()?;
                phrase.phrase().split(' ').next().map(str::to_string)
            })
            .collect();
        let index = words
            .iter()
            .enumerate()
            .map(|(i, word)| (word.clone(), i))
            .collect();
        Wordlist { words, index }
    })
}

fn checksum_bits(entropy: &[u8]) -> Vec<bool> {
    let hash = Sha256::digest(entropy);
    let count = entropy.len() * 8 / 32;
    (0..count).map(|i| hash[i / 8] & (0x80 >> (i % 8)) != 0).collect()
}

fn bytes_to_bits(bytes: &[u8]) -> impl Iterator<Item = bool> + '_ {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |i| byte & (0x80 >> i) != 0))
}

/// A validated recovery phrase.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    words: Vec<String>,
}

impl Mnemonic {
    /// 24 words from 256 bits of OS randomness.
    pub fn generate() -> Self {
        Self::random(32)
    }

    /// 12 words from 128 bits of OS randomness.
    pub fn generate_12() -> Self {
        Self::random(16)
    }

    fn random(len: usize) -> Self {
        let mut entropy = vec![0u8; len];
        OsRng.fill_bytes(&mut entropy);
        Self::from_entropy(&entropy)
    }

    fn from_entropy(entropy: &[u8]) -> Self {
        let list = wordlist();
        let mut bits: Vec<bool> = bytes_to_bits(entropy).collect();
        bits.extend(checksum_bits(entropy));

        let words = bits
            .chunks(BITS_PER_WORD)
            .map(|chunk| {
                let index = chunk.iter().fold(0usize, |acc, bit| (acc << 1) | usize::from(*bit));
                list.words.get(index).cloned().unwrap_or_default()
            })
            .collect();
        Self { words }
    }

    /// Parse and validate a word sequence.
    pub fn from_words<I, S>(words: I) -> Result<Self, MnemonicError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .collect();
        match validate_words(&words) {
            MnemonicStatus::Ok => Ok(Self { words }),
            status => Err(MnemonicError::Invalid(status)),
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn validate(&self) -> MnemonicStatus {
        validate_words(&self.words)
    }

    /// BIP-39 seed: PBKDF2-HMAC-SHA512 with salt `"mnemonic" + passphrase`.
    pub fn to_seed(&self, passphrase: &str) -> KeyResult<Vec<u8>> {
        let phrase = bip39::Mnemonic::from_phrase(&self.to_string(), Language::English)
            .map_err(|e| KeyError::Derivation(format!("mnemonic: {}", e)))?;
        Ok(bip39::Seed::new(&phrase, passphrase).as_bytes().to_vec())
    }

    /// Ed25519 key at `m/44'/3030'/0'/0'`.
    pub fn to_private_key(&self, passphrase: &str) -> KeyResult<PrivateKey> {
        let seed = self.to_seed(passphrase)?;
        let key = slip10_ed25519::derive_ed25519_private_key(&seed, &ACCOUNT_PATH);
        PrivateKey::from_bytes(KeyAlgorithm::Ed25519, &key)
    }
}

/// Validate without constructing.
pub fn validate_words<S: AsRef<str>>(words: &[S]) -> MnemonicStatus {
    if words.len() != 12 && words.len() != 24 {
        return MnemonicStatus::BadLength;
    }

    let list = wordlist();
    let mut indices = Vec::with_capacity(words.len());
    let mut unknown = Vec::new();
    for (position, word) in words.iter().enumerate() {
        match list.index.get(word.as_ref()) {
            Some(index) => indices.push(*index),
            None => unknown.push(position),
        }
    }
    if !unknown.is_empty() {
        return MnemonicStatus::UnknownWords(unknown);
    }

    let bits: Vec<bool> = indices
        .iter()
        .flat_map(|index| (0..BITS_PER_WORD).rev().map(move |shift| (index >> shift) & 1 == 1))
        .collect();

    // total = ENT + ENT/32
    let entropy_bits = bits.len() * 32 / 33;
    let entropy: Vec<u8> = bits[..entropy_bits]
        .chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, bit| (acc << 1) | u8::from(*bit)))
        .collect();

    if checksum_bits(&entropy) != bits[entropy_bits..] {
        return MnemonicStatus::ChecksumMismatch;
    }
    MnemonicStatus::Ok
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.words.join(" "))
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic({} words)", self.words.len())
    }
}

impl FromStr for Mnemonic {
    type Err = MnemonicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_words(s.split_whitespace())
    }
}
