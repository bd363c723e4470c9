use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NodeId = u64;
pub type EdgeId = u64;

/// A graph vertex: an id, a set of labels, and a property bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Node {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub edge_type: String,
    pub properties: BTreeMap<String, Value>,
    pub weight: f64,
    pub created_at: i64,
}
