//! Raw Ethereum transaction decoding.
//!
//! # Responsibilities
//! - Dispatch on the type byte: legacy, EIP-2930 (`0x01`), EIP-1559 (`0x02`)
//! - Split the RLP list into typed fields
//! - Rebuild the message the sender signed, for signer recovery
//!
//! # Design Decisions
//! - Fields keep their RLP byte-string payloads; typed accessors convert on
//!   demand, so re-encoding reproduces the input exactly
//! - The access list is kept as its raw RLP encoding

use alloy::primitives::{keccak256, Address, B256, U256};

use crate::ethereum::rlp::{decode_list, encode_list, trim_u64, Field, Item};
use crate::ethereum::types::{ChainId, EthError, EthResult, EthTxType};

/// Fee fields, which differ between envelope types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EthFees {
    GasPrice(Vec<u8>),
    Dynamic {
        max_priority_fee_per_gas: Vec<u8>,
        max_fee_per_gas: Vec<u8>,
    },
}

/// A decoded raw Ethereum transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthRawTransaction {
    tx_type: EthTxType,
    /// `None` for pre-EIP-155 legacy transactions.
    chain_id: Option<Vec<u8>>,
    nonce: Vec<u8>,
    fees: EthFees,
    gas_limit: Vec<u8>,
    /// Empty for contract creation.
    to: Vec<u8>,
    value: Vec<u8>,
    call_data: Vec<u8>,
    /// Raw RLP list; empty for legacy.
    access_list: Vec<u8>,
    /// Legacy `v`, or the typed forms' y-parity.
    v: Vec<u8>,
    r: Vec<u8>,
    s: Vec<u8>,
    recovery_id: u8,
}

impl EthRawTransaction {
    /// Decode raw transaction bytes.
    pub fn decode(bytes: &[u8]) -> EthResult<Self> {
        let first = *bytes
            .first()
            .ok_or_else(|| EthError::MalformedRlp("empty input".to_string()))?;

        // 1. Type dispatch
        let (tx_type, body) = match first {
            0x01 => (EthTxType::Eip2930, &bytes[1..]),
            0x02 => (EthTxType::Eip1559, &bytes[1..]),
            b if b >= 0xc0 => (EthTxType::Legacy, bytes),
            b => return Err(EthError::UnsupportedType(b)),
        };

        // 2. Field split
        let items = decode_list(body)?;
        if items.len() != tx_type.field_count() {
            return Err(EthError::MalformedRlp(format!(
                "{:?} transaction has {} fields, expected {}",
                tx_type,
                items.len(),
                tx_type.field_count()
            )));
        }

        match tx_type {
            EthTxType::Legacy => Self::from_legacy(&items),
            EthTxType::Eip2930 | EthTxType::Eip1559 => Self::from_typed(tx_type, &items),
        }
    }

    /// Decode hex text, with or without a `0x` prefix.
    pub fn decode_hex(text: &str) -> EthResult<Self> {
        let text = text.trim();
        let text = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        let bytes = hex::decode(text).map_err(|e| EthError::MalformedRlp(format!("invalid hex: {}", e)))?;
        Self::decode(&bytes)
    }

    fn from_legacy(items: &[Item<'_>]) -> EthResult<Self> {
        let field = |i: usize, name: &'static str, max: usize| bytes_field(&items[i], name, max);

        let v = field(6, "v", 8)?;
        let (recovery_id, chain_id) = legacy_v(be_u64(&v));

        Ok(Self {
            tx_type: EthTxType::Legacy,
            chain_id,
            nonce: field(0, "nonce", 8)?,
            fees: EthFees::GasPrice(field(1, "gas price", 32)?),
            gas_limit: field(2, "gas limit", 8)?,
            to: address_field(&items[3])?,
            value: field(4, "value", 32)?,
            call_data: field(5, "data", usize::MAX)?,
            access_list: Vec::new(),
            v,
            r: field(7, "r", 32)?,
            s: field(8, "s", 32)?,
            recovery_id,
        })
    }

    fn from_typed(tx_type: EthTxType, items: &[Item<'_>]) -> EthResult<Self> {
        let field = |i: usize, name: &'static str, max: usize| bytes_field(&items[i], name, max);

        // EIP-1559 inserts two fee fields where EIP-2930 has one
        let (fees, rest) = match tx_type {
            EthTxType::Eip1559 => (
                EthFees::Dynamic {
                    max_priority_fee_per_gas: field(2, "max priority fee", 32)?,
                    max_fee_per_gas: field(3, "max fee", 32)?,
                },
                4,
            ),
            _ => (EthFees::GasPrice(field(2, "gas price", 32)?), 3),
        };

        let access_list = &items[rest + 4];
        if !access_list.is_list {
            return Err(EthError::MalformedRlp("access list must be a list".to_string()));
        }

        let v = field(rest + 5, "y parity", 1)?;
        let recovery_id = match be_u64(&v) {
            p @ (0 | 1) => p as u8,
            p => return Err(EthError::MalformedRlp(format!("invalid y parity {}", p))),
        };

        Ok(Self {
            tx_type,
            chain_id: Some(field(0, "chain id", 8)?),
            nonce: field(1, "nonce", 8)?,
            fees,
            gas_limit: field(rest, "gas limit", 8)?,
            to: address_field(&items[rest + 1])?,
            value: field(rest + 2, "value", 32)?,
            call_data: field(rest + 3, "data", usize::MAX)?,
            access_list: access_list.raw.to_vec(),
            v,
            r: field(rest + 6, "r", 32)?,
            s: field(rest + 7, "s", 32)?,
            recovery_id,
        })
    }

    /// Re-encode; equal to the decoded input unless `call_data` was replaced.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut fields = self.unsigned_fields();
        if self.tx_type == EthTxType::Legacy {
            // signed legacy bodies carry the chain id inside v
            fields.truncate(6);
        }
        fields.extend([Field::Bytes(&self.v), Field::Bytes(&self.r), Field::Bytes(&self.s)]);
        self.with_type_prefix(encode_list(&fields))
    }

    /// Message the sender signed: the unsigned fields, with the chain id
    /// substituted for EIP-155 legacy transactions and the type byte
    /// prepended for typed forms.
    pub fn signing_payload(&self) -> Vec<u8> {
        let fields = self.unsigned_fields();
        self.with_type_prefix(encode_list(&fields))
    }

    /// Keccak-256 of [`signing_payload`](Self::signing_payload).
    pub fn signing_hash(&self) -> B256 {
        keccak256(self.signing_payload())
    }

    fn unsigned_fields(&self) -> Vec<Field<'_>> {
        match self.tx_type {
            EthTxType::Legacy => {
                let mut fields = vec![
                    Field::Bytes(&self.nonce),
                    Field::Bytes(self.gas_price_bytes()),
                    Field::Bytes(&self.gas_limit),
                    Field::Bytes(&self.to),
                    Field::Bytes(&self.value),
                    Field::Bytes(&self.call_data),
                ];
                if let Some(chain_id) = &self.chain_id {
                    fields.extend([Field::Bytes(chain_id), Field::Bytes(&[]), Field::Bytes(&[])]);
                }
                fields
            }
            EthTxType::Eip2930 | EthTxType::Eip1559 => {
                let chain_id = self.chain_id.as_deref().unwrap_or_default();
                let mut fields = vec![Field::Bytes(chain_id), Field::Bytes(&self.nonce)];
                match &self.fees {
                    EthFees::GasPrice(price) => fields.push(Field::Bytes(price)),
                    EthFees::Dynamic {
                        max_priority_fee_per_gas,
                        max_fee_per_gas,
                    } => {
                        fields.push(Field::Bytes(max_priority_fee_per_gas));
                        fields.push(Field::Bytes(max_fee_per_gas));
                    }
                }
                fields.extend([
                    Field::Bytes(&self.gas_limit),
                    Field::Bytes(&self.to),
                    Field::Bytes(&self.value),
                    Field::Bytes(&self.call_data),
                    Field::Raw(&self.access_list),
                ]);
                fields
            }
        }
    }

    fn with_type_prefix(&self, list: Vec<u8>) -> Vec<u8> {
        match self.tx_type.type_byte() {
            Some(byte) => {
                let mut out = Vec::with_capacity(list.len() + 1);
                out.push(byte);
                out.extend_from_slice(&list);
                out
            }
            None => list,
        }
    }

    fn gas_price_bytes(&self) -> &[u8] {
        match &self.fees {
            EthFees::GasPrice(price) => price,
            EthFees::Dynamic { max_fee_per_gas, .. } => max_fee_per_gas,
        }
    }

    // --- Accessors ---

    pub fn tx_type(&self) -> EthTxType {
        self.tx_type
    }

    /// `None` for pre-EIP-155 legacy transactions.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id.as_deref().map(|c| ChainId(be_u64(c)))
    }

    pub fn nonce(&self) -> u64 {
        be_u64(&self.nonce)
    }

    pub fn fees(&self) -> &EthFees {
        &self.fees
    }

    /// Gas price for legacy and EIP-2930 transactions.
    pub fn gas_price(&self) -> Option<U256> {
        match &self.fees {
            EthFees::GasPrice(price) => Some(be_u256(price)),
            EthFees::Dynamic { .. } => None,
        }
    }

    pub fn max_fee_per_gas(&self) -> Option<U256> {
        match &self.fees {
            EthFees::Dynamic { max_fee_per_gas, .. } => Some(be_u256(max_fee_per_gas)),
            EthFees::GasPrice(_) => None,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<U256> {
        match &self.fees {
            EthFees::Dynamic {
                max_priority_fee_per_gas,
                ..
            } => Some(be_u256(max_priority_fee_per_gas)),
            EthFees::GasPrice(_) => None,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        be_u64(&self.gas_limit)
    }

    /// Recipient; `None` for contract creation.
    pub fn to(&self) -> Option<Address> {
        <[u8; 20]>::try_from(self.to.as_slice()).ok().map(Address::from)
    }

    pub fn value(&self) -> U256 {
        be_u256(&self.value)
    }

    pub fn call_data(&self) -> &[u8] {
        &self.call_data
    }

    /// Replace the call data. The signature no longer covers the result.
    pub fn set_call_data(&mut self, call_data: Vec<u8>) -> &mut Self {
        self.call_data = call_data;
        self
    }

    /// Raw RLP of the access list; empty for legacy transactions.
    pub fn access_list_rlp(&self) -> &[u8] {
        &self.access_list
    }

    pub fn recovery_id(&self) -> u8 {
        self.recovery_id
    }

    pub fn v(&self) -> &[u8] {
        &self.v
    }

    pub fn r(&self) -> &[u8] {
        &self.r
    }

    pub fn s(&self) -> &[u8] {
        &self.s
    }
}

/// Recovery id and EIP-155 chain id carried by a legacy `v`.
///
/// The parity rule applies to every `v`; a chain id is present only above 34.
fn legacy_v(v: u64) -> (u8, Option<Vec<u8>>) {
    let recovery_id = (v & 1) ^ 1;
    let chain_id = v
        .checked_sub(35 + recovery_id)
        .filter(|_| v > 34)
        .map(|n| trim_u64(n / 2));
    (recovery_id as u8, chain_id)
}

fn bytes_field(item: &Item<'_>, name: &'static str, max_len: usize) -> EthResult<Vec<u8>> {
    if item.is_list {
        return Err(EthError::MalformedRlp(format!("{} must be a byte string", name)));
    }
    if item.payload.len() > max_len {
        return Err(EthError::MalformedRlp(format!(
            "{} is {} bytes, at most {} allowed",
            name,
            item.payload.len(),
            max_len
        )));
    }
    Ok(item.payload.to_vec())
}

fn address_field(item: &Item<'_>) -> EthResult<Vec<u8>> {
    let to = bytes_field(item, "to", 20)?;
    if !to.is_empty() && to.len() != 20 {
        return Err(EthError::MalformedRlp(format!("to is {} bytes, expected 20", to.len())));
    }
    Ok(to)
}

/// Big-endian integer of at most 8 bytes.
fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn be_u256(bytes: &[u8]) -> U256 {
    U256::try_from_be_slice(bytes).unwrap_or(U256::ZERO)
}
