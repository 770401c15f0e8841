//! Thin RLP helpers over `alloy::rlp` headers.

use alloy::rlp::{Encodable, Header};

use crate::ethereum::types::{EthError, EthResult};

/// One decoded RLP item.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Item<'a> {
    /// Full encoding, header included.
    pub raw: &'a [u8],
    pub payload: &'a [u8],
    pub is_list: bool,
}

/// Decode the item at the front of `buf` and advance past it.
pub(crate) fn decode_item<'a>(buf: &mut &'a [u8]) -> EthResult<Item<'a>> {
    let start: &'a [u8] = *buf;
    let header = Header::decode(buf).map_err(|e| EthError::MalformedRlp(e.to_string()))?;

    let rest: &'a [u8] = *buf;
    if rest.len() < header.payload_length {
        return Err(EthError::MalformedRlp(format!(
            "item declares {} bytes, {} available",
            header.payload_length,
            rest.len()
        )));
    }
    let (payload, remaining) = rest.split_at(header.payload_length);
    *buf = remaining;

    Ok(Item {
        raw: &start[..start.len() - remaining.len()],
        payload,
        is_list: header.list,
    })
}

/// Decode `bytes` as exactly one list and return its items.
pub(crate) fn decode_list(bytes: &[u8]) -> EthResult<Vec<Item<'_>>> {
    let mut buf = bytes;
    let list = decode_item(&mut buf)?;
    if !list.is_list {
        return Err(EthError::MalformedRlp("expected a list".to_string()));
    }
    if !buf.is_empty() {
        return Err(EthError::MalformedRlp(format!("{} trailing bytes", buf.len())));
    }

    let mut items = Vec::new();
    let mut payload = list.payload;
    while !payload.is_empty() {
        items.push(decode_item(&mut payload)?);
    }
    Ok(items)
}

/// A list element to encode.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Field<'a> {
    /// Byte string, encoded with a header.
    Bytes(&'a [u8]),
    /// Already-encoded item, copied verbatim.
    Raw(&'a [u8]),
}

pub(crate) fn encode_list(fields: &[Field<'_>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for field in fields {
        match field {
            Field::Bytes(bytes) => bytes.encode(&mut payload),
            Field::Raw(raw) => payload.extend_from_slice(raw),
        }
    }

    let header = Header {
        list: true,
        payload_length: payload.len(),
    };
    let mut out = Vec::with_capacity(header.length() + payload.len());
    header.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

/// Minimal big-endian bytes of `value`; empty for zero.
pub(crate) fn trim_u64(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}
