//! CBOR processing for `WebAuthn`
//!
//! This module handles the CBOR (Concise Binary Object Representation)
//! subset needed for attestation objects and COSE keys. Items are read with
//! `ciborium` in its permissive mode and converted into [`CborValue`], a
//! closed value type that keeps map entries in wire order.

use ciborium::de::from_reader;
use ciborium::ser::into_writer;
use ciborium::value::Value;

/// A decoded CBOR item
///
/// Tags are consumed during decoding and only their inner value is kept.
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Integer(i128),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(Vec<(CborValue, CborValue)>),
    Bool(bool),
    Null,
    Float(f64),
}

/// CBOR decoding failures
#[derive(Debug, thiserror::Error)]
pub enum CborError {
    #[error("malformed CBOR: {0}")]
    Malformed(String),
    #[error("unexpected bytes after CBOR item")]
    TrailingBytes,
    #[error("expected a CBOR map")]
    NotAMap,
    #[error("map keys are not in canonical order")]
    NonCanonical,
}

impl CborValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&[(CborValue, CborValue)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a map entry by text key. Returns `None` for non-maps.
    #[must_use]
    pub fn map_get_text(&self, key: &str) -> Option<&CborValue> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }
}

impl TryFrom<Value> for CborValue {
    type Error = CborError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Integer(integer) => Self::Integer(i128::from(integer)),
            Value::Bytes(bytes) => Self::Bytes(bytes),
            Value::Text(text) => Self::Text(text),
            Value::Bool(flag) => Self::Bool(flag),
            Value::Null => Self::Null,
            Value::Float(float) => Self::Float(float),
            Value::Tag(_, inner) => Self::try_from(*inner)?,
            Value::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((Self::try_from(k)?, Self::try_from(v)?)))
                    .collect::<Result<_, CborError>>()?,
            ),
            other => {
                return Err(CborError::Malformed(format!(
                    "unsupported CBOR item: {other:?}"
                )))
            }
        })
    }
}

/// Decoded attestation object (`WebAuthn` §6.5)
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    pub fmt: String,
    pub auth_data: Vec<u8>,
    pub att_stmt: Vec<(CborValue, CborValue)>,
}

/// Read one raw item from the front of `bytes`, returning it with the number
/// of bytes it occupied.
fn read_raw_prefix(bytes: &[u8]) -> Result<(Value, usize), CborError> {
    let mut remaining = bytes;
    let value: Value =
        from_reader(&mut remaining).map_err(|e| CborError::Malformed(format!("{e:?}")))?;
    Ok((value, bytes.len() - remaining.len()))
}

/// Decode the single CBOR item making up `bytes`
///
/// # Errors
///
/// Returns an error if the item is malformed or followed by extra bytes.
pub fn decode(bytes: &[u8]) -> Result<CborValue, CborError> {
    let (value, consumed) = decode_prefix(bytes)?;
    if consumed != bytes.len() {
        return Err(CborError::TrailingBytes);
    }
    Ok(value)
}

/// Decode the first CBOR item in `bytes` and report how many bytes it used
///
/// # Errors
///
/// Returns an error if the leading item is malformed or truncated.
pub fn decode_prefix(bytes: &[u8]) -> Result<(CborValue, usize), CborError> {
    let (value, consumed) = read_raw_prefix(bytes)?;
    Ok((CborValue::try_from(value)?, consumed))
}

/// Decode a map from the front of `bytes`, requiring canonical key order
///
/// Follows CTAP2 canonical CBOR: every head uses its shortest form, lengths
/// are definite, and keys are unique and sorted by encoded length, then
/// bytewise. Returns the entries and the bytes consumed.
///
/// # Errors
///
/// Returns an error if the leading item is not a well-formed map, is not
/// minimally encoded, or its keys are out of order.
pub fn decode_canonical_map_prefix(
    bytes: &[u8],
) -> Result<(Vec<(CborValue, CborValue)>, usize), CborError> {
    let (value, consumed) = read_raw_prefix(bytes)?;
    if !matches!(value, Value::Map(_)) {
        return Err(CborError::NotAMap);
    }

    // re-encoding is minimal and keeps entry order, so any difference on the
    // wire is a non-minimal head or an indefinite length
    let reencoded = encode_value(&value)?;
    if bytes.get(..consumed) != Some(reencoded.as_slice()) {
        return Err(CborError::NonCanonical);
    }
    let Value::Map(entries) = value else {
        return Err(CborError::NotAMap);
    };

    let mut previous: Option<Vec<u8>> = None;
    for (key, _) in &entries {
        let encoded = encode_value(key)?;
        if let Some(prev) = &previous {
            if canonical_cmp(prev, &encoded) != std::cmp::Ordering::Less {
                return Err(CborError::NonCanonical);
            }
        }
        previous = Some(encoded);
    }

    let entries = entries
        .into_iter()
        .map(|(k, v)| Ok((CborValue::try_from(k)?, CborValue::try_from(v)?)))
        .collect::<Result<_, CborError>>()?;
    Ok((entries, consumed))
}

fn encode_value(value: &Value) -> Result<Vec<u8>, CborError> {
    let mut out = Vec::new();
    into_writer(value, &mut out).map_err(|e| CborError::Malformed(format!("{e:?}")))?;
    Ok(out)
}

fn canonical_cmp(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Decode an attestation object into its `fmt`, `authData` and `attStmt`
///
/// Unknown keys are skipped. Any structural problem, including a missing or
/// mistyped field, yields `None`.
#[must_use]
pub fn decode_attestation_object(bytes: &[u8]) -> Option<AttestationObject> {
    let value = decode(bytes).ok()?;

    let fmt = value.map_get_text("fmt")?.as_text()?.to_string();
    let auth_data = value.map_get_text("authData")?.as_bytes()?.to_vec();
    let att_stmt = value.map_get_text("attStmt")?.as_map()?.to_vec();

    Some(AttestationObject {
        fmt,
        auth_data,
        att_stmt,
    })
}
