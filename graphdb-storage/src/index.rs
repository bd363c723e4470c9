//! Secondary indexes: label, edge-type, and declared property indexes (C7).
//!
//! The label/edge-type indexes are simple bucket maps. Property indexes are
//! keyed by a comparable, type-specific [`IndexKey`] so range queries work
//! directly over a `BTreeMap`, in the same spirit as the sentinel-qualified,
//! sorted-key design other embedded stores in this space use for their label
//! indexes, adapted here to also carry typed property buckets.

use graphdb_core::error::{GraphError, Result};
use graphdb_core::node::{EdgeId, NodeId};
use graphdb_core::value::{Value, ValueType};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
enum IndexKey {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Timestamp(i64),
}

impl IndexKey {
    fn discriminant(&self) -> u8 {
        match self {
            IndexKey::Str(_) => 0,
            IndexKey::Int(_) => 1,
            IndexKey::Float(_) => 2,
            IndexKey::Bool(_) => 3,
            IndexKey::Bytes(_) => 4,
            IndexKey::Timestamp(_) => 5,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::String(s) => IndexKey::Str(s.clone()),
            Value::I64(v) => IndexKey::Int(*v),
            Value::F64(v) => IndexKey::Float(*v),
            Value::Bool(v) => IndexKey::Bool(*v),
            Value::Bytes(b) => IndexKey::Bytes(b.clone()),
            Value::Timestamp(v) => IndexKey::Timestamp(*v),
            Value::Vector(_) => return None,
        })
    }
}

impl Eq for IndexKey {}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (IndexKey::Str(a), IndexKey::Str(b)) => a.cmp(b),
            (IndexKey::Int(a), IndexKey::Int(b)) => a.cmp(b),
            (IndexKey::Float(a), IndexKey::Float(b)) => a.total_cmp(b),
            (IndexKey::Bool(a), IndexKey::Bool(b)) => a.cmp(b),
            (IndexKey::Bytes(a), IndexKey::Bytes(b)) => a.cmp(b),
            (IndexKey::Timestamp(a), IndexKey::Timestamp(b)) => a.cmp(b),
            _ => self.discriminant().cmp(&other.discriminant()).then(Ordering::Equal),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A single declared property index over `(key, value_type)`.
pub struct PropertyIndex {
    pub value_type: ValueType,
    buckets: BTreeMap<IndexKey, BTreeSet<NodeId>>,
}

impl PropertyIndex {
    fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            buckets: BTreeMap::new(),
        }
    }

    fn insert(&mut self, node_id: NodeId, value: &Value) {
        if let Some(key) = IndexKey::from_value(value) {
            self.buckets.entry(key).or_default().insert(node_id);
        }
    }

    fn remove(&mut self, node_id: NodeId, value: &Value) {
        if let Some(key) = IndexKey::from_value(value) {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.remove(&node_id);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
        }
    }

    pub fn lookup_eq(&self, value: &Value) -> Vec<NodeId> {
        match IndexKey::from_value(value) {
            Some(key) => self
                .buckets
                .get(&key)
                .map(|b| b.iter().copied().collect())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub fn lookup_range(&self, lo: &Value, hi: &Value) -> Result<Vec<NodeId>> {
        let lo = IndexKey::from_value(lo)
            .ok_or_else(|| GraphError::TypeMismatch("range bound has no index key".into()))?;
        let hi = IndexKey::from_value(hi)
            .ok_or_else(|| GraphError::TypeMismatch("range bound has no index key".into()))?;
        Ok(self
            .buckets
            .range(lo..=hi)
            .flat_map(|(_, b)| b.iter().copied())
            .collect())
    }

    pub fn lookup_prefix(&self, prefix: &str) -> Result<Vec<NodeId>> {
        if self.value_type != ValueType::String {
            return Err(GraphError::TypeMismatch(
                "prefix lookup only defined for string-typed indexes".into(),
            ));
        }
        let mut upper = prefix.to_string();
        match upper.pop() {
            Some(last) => {
                let bumped = ((last as u32) + 1).try_into().unwrap_or(char::MAX);
                upper.push(bumped);
                Ok(self
                    .buckets
                    .range(IndexKey::Str(prefix.to_string())..IndexKey::Str(upper))
                    .flat_map(|(_, b)| b.iter().copied())
                    .collect())
            }
            None => Ok(self
                .buckets
                .iter()
                .flat_map(|(_, b)| b.iter().copied())
                .collect()),
        }
    }
}

/// Aggregates the label index, edge-type index, and every declared property
/// index for a graph store.
#[derive(Default)]
pub struct IndexSet {
    pub labels: HashMap<String, BTreeSet<NodeId>>,
    pub edge_types: HashMap<String, BTreeSet<EdgeId>>,
    properties: HashMap<(String, ValueType), PropertyIndex>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_label(&mut self, node_id: NodeId, label: &str) {
        self.labels.entry(label.to_string()).or_default().insert(node_id);
    }

    pub fn remove_label(&mut self, node_id: NodeId, label: &str) {
        if let Some(bucket) = self.labels.get_mut(label) {
            bucket.remove(&node_id);
            if bucket.is_empty() {
                self.labels.remove(label);
            }
        }
    }

    pub fn find_by_label(&self, label: &str) -> Vec<NodeId> {
        self.labels
            .get(label)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn add_edge_type(&mut self, edge_id: EdgeId, edge_type: &str) {
        self.edge_types
            .entry(edge_type.to_string())
            .or_default()
            .insert(edge_id);
    }

    pub fn remove_edge_type(&mut self, edge_id: EdgeId, edge_type: &str) {
        if let Some(bucket) = self.edge_types.get_mut(edge_type) {
            bucket.remove(&edge_id);
            if bucket.is_empty() {
                self.edge_types.remove(edge_type);
            }
        }
    }

    pub fn find_by_edge_type(&self, edge_type: &str) -> Vec<EdgeId> {
        self.edge_types
            .get(edge_type)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn create_property_index(
        &mut self,
        key: &str,
        value_type: ValueType,
        existing: impl Iterator<Item = (NodeId, Value)>,
    ) -> Result<()> {
        let index_key = (key.to_string(), value_type);
        if self.properties.contains_key(&index_key) {
            return Err(GraphError::IndexExists(format!("{key}:{value_type:?}")));
        }
        let mut index = PropertyIndex::new(value_type);
        for (node_id, value) in existing {
            if value.value_type() == value_type {
                index.insert(node_id, &value);
            }
        }
        self.properties.insert(index_key, index);
        Ok(())
    }

    pub fn drop_property_index(&mut self, key: &str, value_type: ValueType) -> Result<()> {
        self.properties
            .remove(&(key.to_string(), value_type))
            .map(|_| ())
            .ok_or_else(|| GraphError::IndexMissing(format!("{key}:{value_type:?}")))
    }

    pub fn has_property_index(&self, key: &str, value_type: ValueType) -> bool {
        self.properties.contains_key(&(key.to_string(), value_type))
    }

    /// Inserts `node_id` into every declared index whose key is present in
    /// `properties` and whose type matches.
    pub fn index_properties<'a>(
        &mut self,
        node_id: NodeId,
        properties: impl Iterator<Item = (&'a String, &'a Value)>,
    ) {
        for (key, value) in properties {
            if let Some(index) = self.properties.get_mut(&(key.clone(), value.value_type())) {
                index.insert(node_id, value);
            }
        }
    }

    pub fn unindex_properties<'a>(
        &mut self,
        node_id: NodeId,
        properties: impl Iterator<Item = (&'a String, &'a Value)>,
    ) {
        for (key, value) in properties {
            if let Some(index) = self.properties.get_mut(&(key.clone(), value.value_type())) {
                index.remove(node_id, value);
            }
        }
    }

    pub fn property_index(&self, key: &str, value_type: ValueType) -> Option<&PropertyIndex> {
        self.properties.get(&(key.to_string(), value_type))
    }

    /// Every declared `(key, value_type)` pair, for persisting index
    /// declarations in a snapshot.
    pub fn declared(&self) -> Vec<(String, ValueType)> {
        self.properties.keys().cloned().collect()
    }
}
