//! Canonical CBOR encoding for registry events.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are u64 seconds, amounts are 16-byte big-endian)
//!
//! The same event always encodes to identical bytes, so journal entries can
//! be compared and hashed across implementations.

use ciborium::value::{Integer, Value};

use crate::commitment::CommitmentHash;
use crate::crypto::Address;
use crate::error::CoreError;
use crate::event::{EventKind, RegistryEvent};
use crate::types::{Amount, Label, TokenId};
use crate::validation::validate_label_form;

/// Event field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const KIND: u64 = 0;
    pub const LABEL: u64 = 1;
    pub const ACCOUNT: u64 = 2;
    pub const COUNTERPARTY: u64 = 3;
    pub const TOKEN_ID: u64 = 4;
    pub const TIME: u64 = 5;
    pub const AMOUNT: u64 = 6;
    pub const HASH: u64 = 7;
}

/// Encode an event to canonical CBOR bytes.
pub fn encode_event(event: &RegistryEvent) -> Result<Vec<u8>, CoreError> {
    let value = event_to_cbor_value(event);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Decode an event from CBOR bytes.
pub fn decode_event(bytes: &[u8]) -> Result<RegistryEvent, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    cbor_value_to_event(&value)
}

fn entry(key: u64, value: Value) -> (Value, Value) {
    (Value::Integer(key.into()), value)
}

fn address_value(address: &Address) -> Value {
    Value::Bytes(address.0.to_vec())
}

fn amount_value(amount: Amount) -> Value {
    Value::Bytes(amount.to_be_bytes().to_vec())
}

/// Convert an event to a CBOR Value (map with integer keys).
fn event_to_cbor_value(event: &RegistryEvent) -> Value {
    let mut entries = vec![entry(keys::KIND, Value::Integer(event.kind().to_u16().into()))];

    match event {
        RegistryEvent::CommitmentSubmitted { hash, at } => {
            entries.push(entry(keys::TIME, Value::Integer((*at).into())));
            entries.push(entry(keys::HASH, Value::Bytes(hash.0.to_vec())));
        }
        RegistryEvent::Registered {
            label,
            holder,
            token_id,
            expires_at,
            cost,
        } => {
            entries.push(entry(keys::LABEL, Value::Text(label.to_string())));
            entries.push(entry(keys::ACCOUNT, address_value(holder)));
            entries.push(entry(keys::TOKEN_ID, Value::Integer(token_id.0.into())));
            entries.push(entry(keys::TIME, Value::Integer((*expires_at).into())));
            entries.push(entry(keys::AMOUNT, amount_value(*cost)));
        }
        RegistryEvent::Renewed {
            label,
            token_id,
            expires_at,
            cost,
        } => {
            entries.push(entry(keys::LABEL, Value::Text(label.to_string())));
            entries.push(entry(keys::TOKEN_ID, Value::Integer(token_id.0.into())));
            entries.push(entry(keys::TIME, Value::Integer((*expires_at).into())));
            entries.push(entry(keys::AMOUNT, amount_value(*cost)));
        }
        RegistryEvent::Transferred {
            label,
            token_id,
            from,
            to,
        } => {
            entries.push(entry(keys::LABEL, Value::Text(label.to_string())));
            entries.push(entry(keys::ACCOUNT, address_value(from)));
            entries.push(entry(keys::COUNTERPARTY, address_value(to)));
            entries.push(entry(keys::TOKEN_ID, Value::Integer(token_id.0.into())));
        }
        RegistryEvent::Burned {
            label,
            token_id,
            at,
        } => {
            entries.push(entry(keys::LABEL, Value::Text(label.to_string())));
            entries.push(entry(keys::TOKEN_ID, Value::Integer(token_id.0.into())));
            entries.push(entry(keys::TIME, Value::Integer((*at).into())));
        }
        RegistryEvent::PrimarySet { holder, label } => {
            entries.push(entry(keys::LABEL, Value::Text(label.to_string())));
            entries.push(entry(keys::ACCOUNT, address_value(holder)));
        }
        RegistryEvent::ResolverChanged {
            label,
            token_id,
            resolver,
        } => {
            entries.push(entry(keys::LABEL, Value::Text(label.to_string())));
            let resolver_value = match resolver {
                Some(address) => address_value(address),
                None => Value::Null,
            };
            entries.push(entry(keys::COUNTERPARTY, resolver_value));
            entries.push(entry(keys::TOKEN_ID, Value::Integer(token_id.0.into())));
        }
        RegistryEvent::FeesWithdrawn { recipient, amount } => {
            entries.push(entry(keys::ACCOUNT, address_value(recipient)));
            entries.push(entry(keys::AMOUNT, amount_value(*amount)));
        }
    }

    Value::Map(entries)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut key_value_pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

/// Field lookup over a decoded CBOR map.
struct Fields<'a>(&'a [(Value, Value)]);

impl<'a> Fields<'a> {
    fn get(&self, key: u64) -> Option<&'a Value> {
        self.0
            .iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    }

    fn u64(&self, key: u64, name: &str) -> Result<u64, CoreError> {
        match self.get(key) {
            Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
                .map_err(|_| CoreError::MalformedEvent(format!("{} out of range", name))),
            _ => Err(CoreError::MalformedEvent(format!("missing {}", name))),
        }
    }

    fn label(&self) -> Result<Label, CoreError> {
        match self.get(keys::LABEL) {
            Some(Value::Text(s)) => {
                validate_label_form(s).map_err(|e| CoreError::MalformedEvent(e.to_string()))
            }
            _ => Err(CoreError::MalformedEvent("missing label".into())),
        }
    }

    fn bytes32(&self, key: u64, name: &str) -> Result<[u8; 32], CoreError> {
        match self.get(key) {
            Some(Value::Bytes(b)) if b.len() == 32 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(b);
                Ok(arr)
            }
            _ => Err(CoreError::MalformedEvent(format!("invalid {}", name))),
        }
    }

    fn address(&self, key: u64, name: &str) -> Result<Address, CoreError> {
        self.bytes32(key, name).map(Address)
    }

    fn optional_address(&self, key: u64, name: &str) -> Result<Option<Address>, CoreError> {
        match self.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(_) => self.address(key, name).map(Some),
        }
    }

    fn token_id(&self) -> Result<TokenId, CoreError> {
        self.u64(keys::TOKEN_ID, "token_id").map(TokenId)
    }

    fn amount(&self) -> Result<Amount, CoreError> {
        match self.get(keys::AMOUNT) {
            Some(Value::Bytes(b)) if b.len() == 16 => {
                let mut arr = [0u8; 16];
                arr.copy_from_slice(b);
                Ok(Amount::from_be_bytes(arr))
            }
            _ => Err(CoreError::MalformedEvent("invalid amount".into())),
        }
    }
}

/// Convert a CBOR Value (map) back to an event.
fn cbor_value_to_event(value: &Value) -> Result<RegistryEvent, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedEvent("expected map".into())),
    };
    let fields = Fields(map);

    let raw_kind = fields.u64(keys::KIND, "kind")?;
    let kind = u16::try_from(raw_kind)
        .ok()
        .and_then(EventKind::from_u16)
        .ok_or(CoreError::UnknownEventKind(raw_kind as u16))?;

    let event = match kind {
        EventKind::CommitmentSubmitted => RegistryEvent::CommitmentSubmitted {
            hash: CommitmentHash(fields.bytes32(keys::HASH, "hash")?),
            at: fields.u64(keys::TIME, "at")?,
        },
        EventKind::Registered => RegistryEvent::Registered {
            label: fields.label()?,
            holder: fields.address(keys::ACCOUNT, "holder")?,
            token_id: fields.token_id()?,
            expires_at: fields.u64(keys::TIME, "expires_at")?,
            cost: fields.amount()?,
        },
        EventKind::Renewed => RegistryEvent::Renewed {
            label: fields.label()?,
            token_id: fields.token_id()?,
            expires_at: fields.u64(keys::TIME, "expires_at")?,
            cost: fields.amount()?,
        },
        EventKind::Transferred => RegistryEvent::Transferred {
            label: fields.label()?,
            token_id: fields.token_id()?,
            from: fields.address(keys::ACCOUNT, "from")?,
            to: fields.address(keys::COUNTERPARTY, "to")?,
        },
        EventKind::Burned => RegistryEvent::Burned {
            label: fields.label()?,
            token_id: fields.token_id()?,
            at: fields.u64(keys::TIME, "at")?,
        },
        EventKind::PrimarySet => RegistryEvent::PrimarySet {
            holder: fields.address(keys::ACCOUNT, "holder")?,
            label: fields.label()?,
        },
        EventKind::ResolverChanged => RegistryEvent::ResolverChanged {
            label: fields.label()?,
            token_id: fields.token_id()?,
            resolver: fields.optional_address(keys::COUNTERPARTY, "resolver")?,
        },
        EventKind::FeesWithdrawn => RegistryEvent::FeesWithdrawn {
            recipient: fields.address(keys::ACCOUNT, "recipient")?,
            amount: fields.amount()?,
        },
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::validation::LabelPolicy;

    fn registered() -> RegistryEvent {
        RegistryEvent::Registered {
            label: Label::parse("alice").unwrap(),
            holder: Keypair::from_seed(&[0x42; 32]).address(),
            token_id: TokenId(1),
            expires_at: 1_767_225_600,
            cost: 5_000,
        }
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let event = registered();
        assert_eq!(encode_event(&event).unwrap(), encode_event(&event).unwrap());
    }

    #[test]
    fn test_event_roundtrip() {
        let holder = Keypair::from_seed(&[0x01; 32]).address();
        let other = Keypair::from_seed(&[0x02; 32]).address();
        let label = Label::parse("roundtrip").unwrap();
        let events = vec![
            RegistryEvent::CommitmentSubmitted {
                hash: CommitmentHash([0xab; 32]),
                at: 42,
            },
            registered(),
            RegistryEvent::Renewed {
                label: label.clone(),
                token_id: TokenId(9),
                expires_at: u64::MAX,
                cost: Amount::MAX,
            },
            RegistryEvent::Transferred {
                label: label.clone(),
                token_id: TokenId(9),
                from: holder,
                to: other,
            },
            RegistryEvent::Burned {
                label: label.clone(),
                token_id: TokenId(9),
                at: 100,
            },
            RegistryEvent::PrimarySet {
                holder,
                label: label.clone(),
            },
            RegistryEvent::ResolverChanged {
                label: label.clone(),
                token_id: TokenId(9),
                resolver: None,
            },
            RegistryEvent::ResolverChanged {
                label,
                token_id: TokenId(9),
                resolver: Some(other),
            },
            RegistryEvent::FeesWithdrawn {
                recipient: other,
                amount: 1,
            },
        ];

        for event in events {
            let bytes = encode_event(&event).unwrap();
            assert_eq!(decode_event(&bytes).unwrap(), event);
        }
    }

    #[test]
    fn test_decode_keeps_labels_outside_default_length() {
        let policy = LabelPolicy {
            min_length: 1,
            max_length: 100,
        };
        for raw in ["a".to_owned(), "ab".to_owned(), "b".repeat(80)] {
            let event = RegistryEvent::Burned {
                label: Label::parse_with(&raw, &policy).unwrap(),
                token_id: TokenId(3),
                at: 7,
            };
            let bytes = encode_event(&event).unwrap();
            assert_eq!(decode_event(&bytes).unwrap(), event);
        }
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(7.into()), Value::Integer(70.into())),
            (Value::Integer(0.into()), Value::Integer(0.into())),
            (Value::Integer(5.into()), Value::Integer(50.into())),
        ];
        encode_map_canonical(&mut buf, &entries).unwrap();

        assert_eq!(buf[0], 0xa3);
        assert_eq!(buf[1], 0x00); // key 0
        assert_eq!(buf[2], 0x00);
        assert_eq!(buf[3], 0x05); // key 5
        assert_eq!(&buf[4..6], &[0x18, 50]);
        assert_eq!(buf[6], 0x07); // key 7
        assert_eq!(&buf[7..9], &[0x18, 70]);
    }

    #[test]
    fn test_kind_is_first_key() {
        let bytes = encode_event(&registered()).unwrap();
        // map header, key 0, then the 0x0100 kind as a two-byte uint
        assert_eq!(&bytes[1..5], &[0x00, 0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let mut buf = Vec::new();
        let entries = vec![(Value::Integer(0.into()), Value::Integer(0x0999.into()))];
        encode_map_canonical(&mut buf, &entries).unwrap();
        assert!(matches!(
            decode_event(&buf),
            Err(CoreError::UnknownEventKind(0x0999))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_event(&[0xff, 0x00]).is_err());
        assert!(matches!(
            decode_event(&[0x01]),
            Err(CoreError::MalformedEvent(_))
        ));
    }
}
