//! Minimal ASN.1 DER codec for key containers.
//!
//! # Responsibilities
//! - Decode the ASN.1 subset used by PKCS#8, SPKI and SEC1 key containers
//! - Map well-known object identifiers to key algorithms
//! - Encode private keys as PKCS#8 and public keys as SPKI
//!
//! # Design Decisions
//! - Recursive descent over a byte cursor; every read is bounds checked
//! - Context tags `[0]` and `[1]` are read as sequences
//! - Export uses the container shapes the network's own tooling emits, so ECDSA
//!   public keys carry only the curve OID in their algorithm identifier

use std::fmt;

use thiserror::Error;

use crate::crypto::keys::KeyAlgorithm;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OBJECT_IDENTIFIER: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_CONTEXT_0: u8 = 0xa0;
const TAG_CONTEXT_1: u8 = 0xa1;

/// Deepest constructed nesting accepted; key containers use at most four.
const MAX_DEPTH: usize = 32;

/// `1.3.101.112`
pub const OID_ED25519: &[u64] = &[1, 3, 101, 112];
/// `1.3.132.0.10`
pub const OID_SECP256K1: &[u64] = &[1, 3, 132, 0, 10];
/// `1.2.840.10045.2.1`
pub const OID_EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];

/// Errors produced while decoding or interpreting DER.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerError {
    #[error("unsupported ASN.1 tag 0x{0:02x}")]
    UnsupportedAsn1Tag(u8),

    #[error("DER input truncated at offset {0}")]
    Truncated(usize),

    #[error("DER length at offset {0} is not supported")]
    InvalidLength(usize),

    #[error("DER nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("malformed object identifier")]
    InvalidObjectIdentifier,

    #[error("unexpected key container structure: {0}")]
    UnexpectedStructure(&'static str),

    #[error("unknown key algorithm (oids: {0})")]
    UnknownAlgorithm(String),
}

/// A decoded object identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier(Vec<u64>);

impl ObjectIdentifier {
    pub fn new(arcs: &[u64]) -> Self {
        Self(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// The algorithm tag for this OID, if it is one we know.
    pub fn known(&self) -> Option<KnownOid> {
        match self.0.as_slice() {
            OID_ED25519 => Some(KnownOid::Ed25519),
            OID_SECP256K1 => Some(KnownOid::EcdsaSecp256k1),
            OID_EC_PUBLIC_KEY => Some(KnownOid::EcPublicKey),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

/// Algorithm tags recognised in key containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownOid {
    Ed25519,
    EcdsaSecp256k1,
    /// Generic `id-ecPublicKey`; the curve comes from a second OID.
    EcPublicKey,
}

/// One decoded ASN.1 value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asn1Value {
    /// Big-endian two's complement content bytes.
    Integer(Vec<u8>),
    BitString { unused_bits: u8, bytes: Vec<u8> },
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Sequence(Vec<Asn1Value>),
    /// Constructed context-specific value (`[0]`, `[1]`).
    Context { tag: u8, items: Vec<Asn1Value> },
}

impl Asn1Value {
    /// Collect every OID nested in this value, depth first.
    pub fn object_identifiers(&self) -> Vec<&ObjectIdentifier> {
        let mut out = Vec::new();
        self.collect_oids(&mut out);
        out
    }

    fn collect_oids<'a>(&'a self, out: &mut Vec<&'a ObjectIdentifier>) {
        match self {
            Asn1Value::ObjectIdentifier(oid) => out.push(oid),
            Asn1Value::Sequence(items) | Asn1Value::Context { items, .. } => {
                for item in items {
                    item.collect_oids(out);
                }
            }
            _ => {}
        }
    }

    /// Small non-negative integers (versions); `None` if it does not fit.
    pub fn as_small_integer(&self) -> Option<u64> {
        match self {
            Asn1Value::Integer(bytes) if bytes.len() <= 8 => {
                Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
            }
            _ => None,
        }
    }
}

/// Cursor-based DER decoder.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, depth: 0 }
    }

    /// Current offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_byte(&mut self) -> Result<u8, DerError> {
        let byte = *self.data.get(self.pos).ok_or(DerError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DerError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(DerError::InvalidLength(self.pos))?;
        let slice = self.data.get(self.pos..end).ok_or(DerError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    /// Short form (< 0x80) or long form (0x80 | count, then big-endian bytes).
    fn read_length(&mut self) -> Result<usize, DerError> {
        let start = self.pos;
        let first = self.read_byte()?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }

        let count = usize::from(first & 0x7f);
        if count == 0 || count > std::mem::size_of::<usize>() {
            return Err(DerError::InvalidLength(start));
        }

        let mut length = 0usize;
        for _ in 0..count {
            length = (length << 8) | usize::from(self.read_byte()?);
        }
        Ok(length)
    }

    /// Read one complete value at the cursor.
    pub fn read(&mut self) -> Result<Asn1Value, DerError> {
        let tag = self.read_byte()?;
        let length = self.read_length()?;
        let content = self.read_slice(length)?;

        match tag {
            TAG_INTEGER => Ok(Asn1Value::Integer(content.to_vec())),
            TAG_BIT_STRING => {
                let (unused_bits, bytes) = content
                    .split_first()
                    .ok_or(DerError::Truncated(self.pos))?;
                Ok(Asn1Value::BitString {
                    unused_bits: *unused_bits,
                    bytes: bytes.to_vec(),
                })
            }
            TAG_OCTET_STRING => Ok(Asn1Value::OctetString(content.to_vec())),
            TAG_NULL => Ok(Asn1Value::Null),
            TAG_OBJECT_IDENTIFIER => decode_oid(content).map(Asn1Value::ObjectIdentifier),
            TAG_SEQUENCE => Ok(Asn1Value::Sequence(self.read_nested(content)?)),
            TAG_CONTEXT_0 | TAG_CONTEXT_1 => Ok(Asn1Value::Context {
                tag,
                items: self.read_nested(content)?,
            }),
            other => Err(DerError::UnsupportedAsn1Tag(other)),
        }
    }

    /// Decode every value inside a constructed value's content.
    fn read_nested(&self, content: &'a [u8]) -> Result<Vec<Asn1Value>, DerError> {
        if self.depth >= MAX_DEPTH {
            return Err(DerError::NestingTooDeep(MAX_DEPTH));
        }

        let mut inner = Decoder {
            data: content,
            pos: 0,
            depth: self.depth + 1,
        };
        let mut items = Vec::new();
        while !inner.is_empty() {
            items.push(inner.read()?);
        }
        Ok(items)
    }
}

fn decode_oid(content: &[u8]) -> Result<ObjectIdentifier, DerError> {
    let (first, rest) = content
        .split_first()
        .ok_or(DerError::InvalidObjectIdentifier)?;

    let mut arcs = vec![u64::from(*first / 40), u64::from(*first % 40)];
    let mut value = 0u64;
    let mut pending = false;

    for byte in rest {
        if value > (u64::MAX >> 7) {
            return Err(DerError::InvalidObjectIdentifier);
        }
        value = (value << 7) | u64::from(byte & 0x7f);
        pending = true;
        if byte & 0x80 == 0 {
            arcs.push(value);
            value = 0;
            pending = false;
        }
    }

    if pending {
        return Err(DerError::InvalidObjectIdentifier);
    }
    Ok(ObjectIdentifier(arcs))
}

/// Decode a single top-level value.
pub fn decode(bytes: &[u8]) -> Result<Asn1Value, DerError> {
    Decoder::new(bytes).read()
}

// --- Encoding ---

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

fn encode_tlv(tag: u8, content: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    encode_length(content.len(), out);
    out.extend_from_slice(content);
}

fn encode_oid(oid: &ObjectIdentifier, out: &mut Vec<u8>) {
    let arcs = oid.arcs();
    let mut content = Vec::new();
    if arcs.len() >= 2 {
        content.push((arcs[0] * 40 + arcs[1]) as u8);
    }
    for arc in arcs.iter().skip(2) {
        let mut groups = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            groups.push(((rest & 0x7f) as u8) | 0x80);
            rest >>= 7;
        }
        content.extend(groups.iter().rev());
    }
    encode_tlv(TAG_OBJECT_IDENTIFIER, &content, out);
}

/// Encode a value tree back to DER.
pub fn encode(value: &Asn1Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Asn1Value, out: &mut Vec<u8>) {
    match value {
        Asn1Value::Integer(bytes) => encode_tlv(TAG_INTEGER, bytes, out),
        Asn1Value::BitString { unused_bits, bytes } => {
            let mut content = Vec::with_capacity(bytes.len() + 1);
            content.push(*unused_bits);
            content.extend_from_slice(bytes);
            encode_tlv(TAG_BIT_STRING, &content, out);
        }
        Asn1Value::OctetString(bytes) => encode_tlv(TAG_OCTET_STRING, bytes, out),
        Asn1Value::Null => encode_tlv(TAG_NULL, &[], out),
        Asn1Value::ObjectIdentifier(oid) => encode_oid(oid, out),
        Asn1Value::Sequence(items) => {
            let mut content = Vec::new();
            for item in items {
                encode_into(item, &mut content);
            }
            encode_tlv(TAG_SEQUENCE, &content, out);
        }
        Asn1Value::Context { tag, items } => {
            let mut content = Vec::new();
            for item in items {
                encode_into(item, &mut content);
            }
            encode_tlv(*tag, &content, out);
        }
    }
}

// --- Key containers ---

fn algorithm_oid(algorithm: KeyAlgorithm) -> ObjectIdentifier {
    match algorithm {
        KeyAlgorithm::Ed25519 => ObjectIdentifier::new(OID_ED25519),
        KeyAlgorithm::EcdsaSecp256k1 => ObjectIdentifier::new(OID_SECP256K1),
    }
}

/// `SEQUENCE { INTEGER 0, SEQUENCE { OID }, OCTET STRING { OCTET STRING key } }`
pub fn encode_private_key(algorithm: KeyAlgorithm, raw: &[u8]) -> Vec<u8> {
    let inner = encode(&Asn1Value::OctetString(raw.to_vec()));
    encode(&Asn1Value::Sequence(vec![
        Asn1Value::Integer(vec![0]),
        Asn1Value::Sequence(vec![Asn1Value::ObjectIdentifier(algorithm_oid(algorithm))]),
        Asn1Value::OctetString(inner),
    ]))
}

/// `SEQUENCE { SEQUENCE { OID }, BIT STRING key }`
pub fn encode_public_key(algorithm: KeyAlgorithm, raw: &[u8]) -> Vec<u8> {
    encode(&Asn1Value::Sequence(vec![
        Asn1Value::Sequence(vec![Asn1Value::ObjectIdentifier(algorithm_oid(algorithm))]),
        Asn1Value::BitString {
            unused_bits: 0,
            bytes: raw.to_vec(),
        },
    ]))
}

/// Whether a decoded container held private or public material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

/// Raw key material pulled out of a DER container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    pub algorithm: KeyAlgorithm,
    pub kind: KeyKind,
    pub key: Vec<u8>,
}

fn algorithm_from_oids(oids: &[&ObjectIdentifier]) -> Result<KeyAlgorithm, DerError> {
    let known: Vec<KnownOid> = oids.iter().filter_map(|oid| oid.known()).collect();
    if known.contains(&KnownOid::Ed25519) {
        return Ok(KeyAlgorithm::Ed25519);
    }
    if known.contains(&KnownOid::EcdsaSecp256k1) {
        return Ok(KeyAlgorithm::EcdsaSecp256k1);
    }
    let listed = oids.iter().map(|oid| oid.to_string()).collect::<Vec<_>>().join(", ");
    Err(DerError::UnknownAlgorithm(listed))
}

/// Decode PKCS#8, SEC1 `ECPrivateKey` or SPKI key containers.
pub fn decode_key(bytes: &[u8]) -> Result<DecodedKey, DerError> {
    let Asn1Value::Sequence(items) = decode(bytes)? else {
        return Err(DerError::UnexpectedStructure("top level is not a SEQUENCE"));
    };

    match items.as_slice() {
        // SPKI
        [alg @ Asn1Value::Sequence(_), Asn1Value::BitString { bytes, .. }] => Ok(DecodedKey {
            algorithm: algorithm_from_oids(&alg.object_identifiers())?,
            kind: KeyKind::Public,
            key: bytes.clone(),
        }),

        // PKCS#8
        [Asn1Value::Integer(_), alg @ Asn1Value::Sequence(_), Asn1Value::OctetString(wrapped), ..] => {
            let algorithm = algorithm_from_oids(&alg.object_identifiers())?;
            let key = match decode(wrapped)? {
                Asn1Value::OctetString(raw) => raw,
                // secp256k1 PKCS#8 may wrap a full SEC1 structure
                Asn1Value::Sequence(inner) => match inner.get(1) {
                    Some(Asn1Value::OctetString(raw)) => raw.clone(),
                    _ => return Err(DerError::UnexpectedStructure("nested ECPrivateKey")),
                },
                _ => return Err(DerError::UnexpectedStructure("PKCS#8 private key payload")),
            };
            Ok(DecodedKey {
                algorithm,
                kind: KeyKind::Private,
                key,
            })
        }

        // SEC1 ECPrivateKey
        [version @ Asn1Value::Integer(_), Asn1Value::OctetString(raw), rest @ ..]
            if version.as_small_integer() == Some(1) =>
        {
            let oids: Vec<&ObjectIdentifier> =
                rest.iter().flat_map(|v| v.object_identifiers()).collect();
            let algorithm = if oids.is_empty() {
                KeyAlgorithm::EcdsaSecp256k1
            } else {
                algorithm_from_oids(&oids)?
            };
            Ok(DecodedKey {
                algorithm,
                kind: KeyKind::Private,
                key: raw.clone(),
            })
        }

        _ => Err(DerError::UnexpectedStructure("not a PKCS#8, SEC1 or SPKI key")),
    }
}
