use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};

/// Discriminant for a [`Value`], also used to declare the type a property index
/// is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueType {
    String = 0,
    I64 = 1,
    F64 = 2,
    Bool = 3,
    Bytes = 4,
    Timestamp = 5,
    Vector = 6,
}

impl ValueType {
    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => ValueType::String,
            1 => ValueType::I64,
            2 => ValueType::F64,
            3 => ValueType::Bool,
            4 => ValueType::Bytes,
            5 => ValueType::Timestamp,
            6 => ValueType::Vector,
            other => {
                return Err(GraphError::Corruption(format!(
                    "unknown value tag {other}"
                )))
            }
        })
    }
}

/// A typed property value. Encoding is fixed: one tag byte followed by a
/// type-specific little-endian payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    /// Unix timestamp, seconds.
    Timestamp(i64),
    Vector(Vec<f32>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::I64(_) => ValueType::I64,
            Value::F64(_) => ValueType::F64,
            Value::Bool(_) => ValueType::Bool,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Vector(_) => ValueType::Vector,
        }
    }

    /// Encodes this value as `tag(1) | payload`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.value_type() as u8];
        match self {
            Value::String(s) => out.extend_from_slice(s.as_bytes()),
            Value::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Bool(v) => out.push(if *v { 1 } else { 0 }),
            Value::Bytes(b) => out.extend_from_slice(b),
            Value::Timestamp(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Vector(v) => {
                out.extend_from_slice(&(v.len() as u32).to_le_bytes());
                for f in v {
                    out.extend_from_slice(&f.to_le_bytes());
                }
            }
        }
        out
    }

    /// Decodes a value previously produced by [`Value::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or_else(|| GraphError::Corruption("empty value encoding".into()))?;
        let ty = ValueType::from_tag(tag)?;
        Ok(match ty {
            ValueType::String => Value::String(
                std::str::from_utf8(payload)
                    .map_err(|e| GraphError::Corruption(e.to_string()))?
                    .to_string(),
            ),
            ValueType::I64 => Value::I64(i64::from_le_bytes(read_n(payload)?)),
            ValueType::F64 => Value::F64(f64::from_le_bytes(read_n(payload)?)),
            ValueType::Bool => Value::Bool(*payload.first().ok_or_else(|| {
                GraphError::Corruption("truncated bool value".into())
            })? != 0),
            ValueType::Bytes => Value::Bytes(payload.to_vec()),
            ValueType::Timestamp => Value::Timestamp(i64::from_le_bytes(read_n(payload)?)),
            ValueType::Vector => {
                if payload.len() < 4 {
                    return Err(GraphError::Corruption("truncated vector length".into()));
                }
                let (len_bytes, rest) = payload.split_at(4);
                let len = u32::from_le_bytes(read_n(len_bytes)?) as usize;
                if rest.len() != len * 4 {
                    return Err(GraphError::Corruption("vector payload length mismatch".into()));
                }
                let mut v = Vec::with_capacity(len);
                for chunk in rest.chunks_exact(4) {
                    v.push(f32::from_le_bytes(read_n(chunk)?));
                }
                Value::Vector(v)
            }
        })
    }

    /// `false` for a `F64`/`Vector` carrying NaN or an infinity. The WAL and
    /// snapshot both carry values through `serde_json`, which has no wire
    /// representation for non-finite floats (it emits `null`, which then
    /// fails to decode back into a float); callers reject such values at the
    /// mutation boundary rather than accept ones that cannot round-trip.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::F64(v) => v.is_finite(),
            Value::Vector(v) => v.iter().all(|f| f.is_finite()),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s.as_str()),
            _ => Err(GraphError::TypeMismatch("expected string".into())),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::I64(v) => Ok(*v),
            _ => Err(GraphError::TypeMismatch("expected i64".into())),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::F64(v) => Ok(*v),
            _ => Err(GraphError::TypeMismatch("expected f64".into())),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            _ => Err(GraphError::TypeMismatch("expected bool".into())),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b.as_slice()),
            _ => Err(GraphError::TypeMismatch("expected bytes".into())),
        }
    }

    pub fn as_timestamp(&self) -> Result<i64> {
        match self {
            Value::Timestamp(v) => Ok(*v),
            _ => Err(GraphError::TypeMismatch("expected timestamp".into())),
        }
    }

    pub fn as_vector(&self) -> Result<&[f32]> {
        match self {
            Value::Vector(v) => Ok(v.as_slice()),
            _ => Err(GraphError::TypeMismatch("expected vector".into())),
        }
    }

    /// Renders the value as a string usable as an index bucket key. Only
    /// meaningful for scalar types; callers must not index vectors.
    pub fn index_key(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Bytes(b) => hex(b),
            Value::Timestamp(v) => v.to_string(),
            Value::Vector(_) => String::new(),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn read_n<const N: usize>(slice: &[u8]) -> Result<[u8; N]> {
    slice
        .try_into()
        .map_err(|_| GraphError::Corruption("truncated value payload".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let values = vec![
            Value::String("hello".to_string()),
            Value::I64(-42),
            Value::F64(3.25),
            Value::Bool(true),
            Value::Bytes(vec![1, 2, 3, 255]),
            Value::Timestamp(1_700_000_000),
            Value::Vector(vec![1.0, -2.5, 0.0]),
        ];
        for v in values {
            let encoded = v.encode();
            let decoded = Value::decode(&encoded).unwrap();
            assert_eq!(v, decoded);
        }
    }

    #[test]
    fn accessor_mismatch_is_type_mismatch() {
        let v = Value::I64(1);
        assert!(matches!(v.as_str(), Err(GraphError::TypeMismatch(_))));
    }

    #[test]
    fn empty_encoding_is_corruption() {
        assert!(matches!(Value::decode(&[]), Err(GraphError::Corruption(_))));
    }

    #[test]
    fn non_finite_floats_and_vectors_are_rejected() {
        assert!(!Value::F64(f64::NAN).is_finite());
        assert!(!Value::F64(f64::INFINITY).is_finite());
        assert!(!Value::F64(f64::NEG_INFINITY).is_finite());
        assert!(!Value::Vector(vec![1.0, f32::NAN]).is_finite());
        assert!(Value::F64(1.5).is_finite());
        assert!(Value::I64(i64::MAX).is_finite());
    }
}
