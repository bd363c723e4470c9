use crate::error::Result;
use crate::node::NodeId;
use crate::value::Value;

/// Capability interface over the external LSM key-value engine. The edge store
/// (and, if disk-backed adjacency is disabled, nothing else) is the sole
/// consumer. Keys and values are opaque byte strings; ordering is byte-wise.
pub trait KvEngine: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn delete(&self, key: &[u8]) -> Result<()>;
    /// Inclusive-start, exclusive-end range scan over byte-ordered keys.
    fn scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
    fn close(&self) -> Result<()>;
}

/// Symmetric encrypt/decrypt hook applied to snapshot bytes. No cipher is
/// mandated; this is the seam encryption-at-rest plugs into.
pub trait EncryptionHook: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Notification hook for an external vector (k-NN) index. The graph store
/// calls this when a node carrying a vector-typed property is created,
/// updated, or deleted; the index itself lives entirely outside this crate.
pub trait VectorIndexHook: Send + Sync {
    fn upsert(&self, node_id: NodeId, property: &str, vector: &[f32]);
    fn remove(&self, node_id: NodeId, property: &str);
}

/// Convenience no-op implementation used when no vector index is configured.
pub struct NullVectorIndex;

impl VectorIndexHook for NullVectorIndex {
    fn upsert(&self, _node_id: NodeId, _property: &str, _vector: &[f32]) {}
    fn remove(&self, _node_id: NodeId, _property: &str) {}
}

/// Marker helper for code that wants to assert a decoded [`Value`] matches a
/// declared index type without constructing the full error path inline.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::I64(_) => "i64",
        Value::F64(_) => "f64",
        Value::Bool(_) => "bool",
        Value::Bytes(_) => "bytes",
        Value::Timestamp(_) => "timestamp",
        Value::Vector(_) => "vector",
    }
}
