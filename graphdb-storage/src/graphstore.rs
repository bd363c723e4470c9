//! Graph store orchestrator (C8): ids, the mutation pipeline, recovery, and
//! statistics, built atop C1-C7.

use crate::edgestore::EdgeStore;
use crate::index::IndexSet;
use crate::kvengine::RocksKvEngine;
use crate::snapshot::{
    compress_adjacency, decompress_adjacency, GraphSnapshot, PropertyIndexDecl,
    SNAPSHOT_FORMAT_VERSION,
};
use crate::wal::{Wal, WalConfig, WalOp};
use graphdb_core::config::StoreConfig;
use graphdb_core::error::{GraphError, Result};
use graphdb_core::node::{Edge, EdgeId, Node, NodeId};
use graphdb_core::stats::{Statistics, StoreStatistics};
use graphdb_core::traits::{EncryptionHook, NullVectorIndex, VectorIndexHook};
use graphdb_core::value::{Value, ValueType};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

struct Inner {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    indexes: IndexSet,
    next_node_id: u64,
    next_edge_id: u64,
    closed: bool,
}

impl Inner {
    fn fresh() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            indexes: IndexSet::new(),
            next_node_id: 1,
            next_edge_id: 1,
            closed: false,
        }
    }

    fn alloc_node_id(&mut self) -> Result<NodeId> {
        if self.next_node_id == u64::MAX {
            return Err(GraphError::IdExhausted);
        }
        let id = self.next_node_id;
        self.next_node_id += 1;
        Ok(id)
    }

    fn alloc_edge_id(&mut self) -> Result<EdgeId> {
        if self.next_edge_id == u64::MAX {
            return Err(GraphError::IdExhausted);
        }
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        Ok(id)
    }

    fn observe_node_id(&mut self, id: NodeId) {
        self.next_node_id = self.next_node_id.max(id.saturating_add(1));
    }

    fn observe_edge_id(&mut self, id: EdgeId) {
        self.next_edge_id = self.next_edge_id.max(id.saturating_add(1));
    }
}

/// Rejects property maps and edge weights carrying NaN or infinite floats;
/// see the Open Question resolution in `DESIGN.md` for why this component
/// takes the reject branch rather than the accept-and-preserve one.
fn validate_finite(properties: &BTreeMap<String, Value>, weight: Option<f64>) -> Result<()> {
    if let Some(w) = weight {
        if !w.is_finite() {
            return Err(GraphError::TypeMismatch(
                "edge weight must be finite (got NaN or infinity)".into(),
            ));
        }
    }
    for (key, value) in properties {
        if !value.is_finite() {
            return Err(GraphError::TypeMismatch(format!(
                "property {key:?} must be finite (got NaN or infinity)"
            )));
        }
    }
    Ok(())
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The embedded property-graph store. Construct via [`GraphStore::open`].
pub struct GraphStore {
    config: StoreConfig,
    inner: RwLock<Inner>,
    wal: Wal,
    edge_store: Option<EdgeStore>,
    statistics: Statistics,
    encryption_hook: Option<Box<dyn EncryptionHook>>,
    vector_hook: Box<dyn VectorIndexHook>,
}

/// Optional collaborators supplied at open time. Both default to no-ops when
/// omitted, matching the spec's framing of encryption and the vector index
/// as external, optional plugins.
#[derive(Default)]
pub struct StoreHooks {
    pub encryption: Option<Box<dyn EncryptionHook>>,
    pub vector_index: Option<Box<dyn VectorIndexHook>>,
}

impl GraphStore {
    /// Opens (creating if absent) a graph store at `config.data_dir`,
    /// replaying any snapshot and WAL tail found there.
    pub fn open(mut config: StoreConfig, hooks: StoreHooks) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let encryption_hook = hooks.encryption;
        let vector_hook = hooks
            .vector_index
            .unwrap_or_else(|| Box::new(NullVectorIndex));

        let statistics = Statistics::new();
        let mut inner = match GraphSnapshot::load(&config.snapshot_path(), encryption_hook.as_deref())? {
            Some(snapshot) => {
                tracing::info!(nodes = snapshot.nodes.len(), edges = snapshot.edges.len(), "restoring graph store from snapshot");
                Self::inner_from_snapshot(snapshot, &statistics)?
            }
            None => Inner::fresh(),
        };

        let wal = Wal::open(
            config.wal_path(),
            WalConfig {
                batched: config.enable_batching,
                batch_threshold: config.wal_batch_threshold,
                flush_interval: std::time::Duration::from_millis(config.wal_flush_interval_ms),
            },
        )?;

        let mut replayed = 0usize;
        wal.replay(|op| {
            apply_op(&mut inner, op)?;
            replayed += 1;
            Ok(())
        })?;
        if replayed > 0 {
            tracing::info!(records = replayed, "replayed wal tail on open");
        }

        let edge_store = if config.use_disk_backed_edges {
            std::fs::create_dir_all(config.edgestore_dir())?;
            let engine = RocksKvEngine::open(config.edgestore_dir())?;
            let store = EdgeStore::new(std::sync::Arc::new(engine), config.edge_cache_capacity());
            for (&node_id, edge_ids) in &inner.outgoing {
                store.store_outgoing(node_id, edge_ids.iter().copied().collect())?;
            }
            for (&node_id, edge_ids) in &inner.incoming {
                store.store_incoming(node_id, edge_ids.iter().copied().collect())?;
            }
            Some(store)
        } else {
            None
        };

        Ok(Self {
            config,
            inner: RwLock::new(inner),
            wal,
            edge_store,
            statistics,
            encryption_hook,
            vector_hook,
        })
    }

    fn inner_from_snapshot(snapshot: GraphSnapshot, statistics: &Statistics) -> Result<Inner> {
        let mut inner = Inner::fresh();
        inner.next_node_id = snapshot.next_node_id;
        inner.next_edge_id = snapshot.next_edge_id;
        statistics.restore(
            snapshot.statistics.query_count,
            snapshot.statistics.avg_query_latency_ms,
        );

        for decl in &snapshot.property_indexes {
            inner
                .indexes
                .create_property_index(&decl.key, decl.value_type, std::iter::empty())?;
        }
        for node in snapshot.nodes {
            for label in &node.labels {
                inner.indexes.add_label(node.id, label);
            }
            inner.indexes.index_properties(node.id, node.properties.iter());
            inner.nodes.insert(node.id, node);
        }
        for edge in &snapshot.edges {
            inner.indexes.add_edge_type(edge.id, &edge.edge_type);
        }
        match &snapshot.compressed_adjacency {
            Some(entries) => {
                tracing::debug!(entries = entries.len(), "restoring adjacency from compressed snapshot section");
                let decompressed = decompress_adjacency(entries)?;
                for (node_id, (outgoing, incoming)) in decompressed {
                    if !outgoing.is_empty() {
                        inner.outgoing.insert(node_id, outgoing);
                    }
                    if !incoming.is_empty() {
                        inner.incoming.insert(node_id, incoming);
                    }
                }
            }
            None => {
                for edge in &snapshot.edges {
                    inner.outgoing.entry(edge.from_id).or_default().push(edge.id);
                    inner.incoming.entry(edge.to_id).or_default().push(edge.id);
                }
            }
        }
        for edge in snapshot.edges {
            inner.edges.insert(edge.id, edge);
        }
        Ok(inner)
    }

    fn ensure_open(&self, inner: &Inner) -> Result<()> {
        if inner.closed {
            return Err(GraphError::Closed);
        }
        Ok(())
    }

    fn log(&self, op: &WalOp) -> Result<()> {
        if self.config.bulk_import_mode {
            return Ok(());
        }
        self.wal.append(op)
    }

    fn notify_vector_properties(&self, node_id: NodeId, properties: &BTreeMap<String, Value>, upsert: bool) {
        for (key, value) in properties {
            if let Value::Vector(v) = value {
                if upsert {
                    self.vector_hook.upsert(node_id, key, v);
                } else {
                    self.vector_hook.remove(node_id, key);
                }
            }
        }
    }

    fn record(&self, started: Instant) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.statistics.record_query(elapsed_ms);
    }

    // ---- mutations ----

    pub fn create_node(&self, labels: Vec<String>, properties: BTreeMap<String, Value>) -> Result<Node> {
        validate_finite(&properties, None)?;
        let started = Instant::now();
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        let id = inner.alloc_node_id()?;
        let created_at = now_unix();
        let op = WalOp::CreateNode {
            id,
            labels: labels.clone(),
            properties: properties.clone(),
            created_at,
        };
        self.log(&op)?;
        apply_op(&mut inner, op)?;
        let node = inner.nodes.get(&id).cloned().expect("just inserted");
        drop(inner);
        self.notify_vector_properties(id, &node.properties, true);
        self.record(started);
        Ok(node)
    }

    pub fn get_node(&self, id: NodeId) -> Result<Node> {
        let started = Instant::now();
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let node = inner
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(format!("node {id}")))?;
        drop(inner);
        self.record(started);
        Ok(node)
    }

    pub fn update_node(&self, id: NodeId, new_properties: BTreeMap<String, Value>) -> Result<()> {
        validate_finite(&new_properties, None)?;
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.nodes.contains_key(&id) {
            return Err(GraphError::NotFound(format!("node {id}")));
        }
        let updated_at = now_unix();
        let op = WalOp::UpdateNode {
            id,
            properties: new_properties.clone(),
            updated_at,
        };
        self.log(&op)?;
        let old_properties = inner.nodes.get(&id).unwrap().properties.clone();
        apply_op(&mut inner, op)?;
        drop(inner);
        self.notify_vector_properties(id, &old_properties, false);
        self.notify_vector_properties(id, &new_properties, true);
        Ok(())
    }

    pub fn add_label(&self, id: NodeId, label: String) -> Result<()> {
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.nodes.contains_key(&id) {
            return Err(GraphError::NotFound(format!("node {id}")));
        }
        let op = WalOp::AddLabel { id, label };
        self.log(&op)?;
        apply_op(&mut inner, op)
    }

    pub fn remove_label(&self, id: NodeId, label: String) -> Result<()> {
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.nodes.contains_key(&id) {
            return Err(GraphError::NotFound(format!("node {id}")));
        }
        let op = WalOp::RemoveLabel { id, label };
        self.log(&op)?;
        apply_op(&mut inner, op)
    }

    pub fn delete_node(&self, id: NodeId) -> Result<()> {
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.nodes.contains_key(&id) {
            return Err(GraphError::NotFound(format!("node {id}")));
        }
        let cascaded: Vec<EdgeId> = inner
            .outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .chain(inner.incoming.get(&id).into_iter().flatten())
            .copied()
            .collect();
        // The surviving endpoint of each cascaded edge still has a stale C4
        // adjacency entry pointing at the deleted edge id once it's gone,
        // same as a standalone `delete_edge` would fix up. `id` itself is
        // excluded since `edge_store.delete_node` below wipes both of its
        // directional entries outright.
        let mut incoming_lists_to_rewrite = std::collections::HashSet::new();
        let mut outgoing_lists_to_rewrite = std::collections::HashSet::new();
        for edge_id in cascaded {
            if let Some(edge) = inner.edges.get(&edge_id).cloned() {
                if edge.to_id != id {
                    incoming_lists_to_rewrite.insert(edge.to_id);
                }
                if edge.from_id != id {
                    outgoing_lists_to_rewrite.insert(edge.from_id);
                }
                let op = WalOp::DeleteEdge { id: edge_id };
                self.log(&op)?;
                apply_op(&mut inner, op)?;
            }
        }
        let properties = inner.nodes.get(&id).unwrap().properties.clone();
        let op = WalOp::DeleteNode { id };
        self.log(&op)?;
        apply_op(&mut inner, op)?;
        if let Some(edge_store) = &self.edge_store {
            edge_store.delete_node(id)?;
            for node_id in incoming_lists_to_rewrite {
                let ids: Vec<u64> = inner.incoming.get(&node_id).cloned().unwrap_or_default();
                edge_store.store_incoming(node_id, ids)?;
            }
            for node_id in outgoing_lists_to_rewrite {
                let ids: Vec<u64> = inner.outgoing.get(&node_id).cloned().unwrap_or_default();
                edge_store.store_outgoing(node_id, ids)?;
            }
        }
        drop(inner);
        self.notify_vector_properties(id, &properties, false);
        Ok(())
    }

    pub fn create_edge(
        &self,
        from_id: NodeId,
        to_id: NodeId,
        edge_type: String,
        properties: BTreeMap<String, Value>,
        weight: f64,
    ) -> Result<Edge> {
        validate_finite(&properties, Some(weight))?;
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.nodes.contains_key(&from_id) {
            return Err(GraphError::NotFound(format!("node {from_id}")));
        }
        if !inner.nodes.contains_key(&to_id) {
            return Err(GraphError::NotFound(format!("node {to_id}")));
        }
        let id = inner.alloc_edge_id()?;
        let created_at = now_unix();
        let op = WalOp::CreateEdge {
            id,
            from_id,
            to_id,
            edge_type,
            properties,
            weight,
            created_at,
        };
        self.log(&op)?;
        apply_op(&mut inner, op)?;
        let edge = inner.edges.get(&id).cloned().expect("just inserted");
        if let Some(edge_store) = &self.edge_store {
            let out_ids: Vec<u64> = inner.outgoing.get(&from_id).cloned().unwrap_or_default();
            let in_ids: Vec<u64> = inner.incoming.get(&to_id).cloned().unwrap_or_default();
            edge_store.store_outgoing(from_id, out_ids)?;
            edge_store.store_incoming(to_id, in_ids)?;
        }
        Ok(edge)
    }

    pub fn get_edge(&self, id: EdgeId) -> Result<Edge> {
        let started = Instant::now();
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let edge = inner
            .edges
            .get(&id)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(format!("edge {id}")))?;
        drop(inner);
        self.record(started);
        Ok(edge)
    }

    pub fn update_edge(&self, id: EdgeId, properties: BTreeMap<String, Value>, weight: Option<f64>) -> Result<()> {
        validate_finite(&properties, weight)?;
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.edges.contains_key(&id) {
            return Err(GraphError::NotFound(format!("edge {id}")));
        }
        let op = WalOp::UpdateEdge { id, properties, weight };
        self.log(&op)?;
        apply_op(&mut inner, op)
    }

    pub fn delete_edge(&self, id: EdgeId) -> Result<()> {
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        let edge = inner
            .edges
            .get(&id)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(format!("edge {id}")))?;
        let op = WalOp::DeleteEdge { id };
        self.log(&op)?;
        apply_op(&mut inner, op)?;
        if let Some(edge_store) = &self.edge_store {
            let out_ids: Vec<u64> = inner.outgoing.get(&edge.from_id).cloned().unwrap_or_default();
            let in_ids: Vec<u64> = inner.incoming.get(&edge.to_id).cloned().unwrap_or_default();
            edge_store.store_outgoing(edge.from_id, out_ids)?;
            edge_store.store_incoming(edge.to_id, in_ids)?;
        }
        Ok(())
    }

    // ---- queries ----

    pub fn find_nodes_by_label(&self, label: &str) -> Result<Vec<Node>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        Ok(inner
            .indexes
            .find_by_label(label)
            .into_iter()
            .filter_map(|id| inner.nodes.get(&id).cloned())
            .collect())
    }

    pub fn find_edges_by_type(&self, edge_type: &str) -> Result<Vec<Edge>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        Ok(inner
            .indexes
            .find_by_edge_type(edge_type)
            .into_iter()
            .filter_map(|id| inner.edges.get(&id).cloned())
            .collect())
    }

    pub fn find_nodes_by_property_indexed(&self, key: &str, value: &Value) -> Result<Vec<Node>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let index = inner
            .indexes
            .property_index(key, value.value_type())
            .ok_or_else(|| GraphError::IndexMissing(key.to_string()))?;
        Ok(index
            .lookup_eq(value)
            .into_iter()
            .filter_map(|id| inner.nodes.get(&id).cloned())
            .collect())
    }

    pub fn find_nodes_by_property_range(&self, key: &str, lo: &Value, hi: &Value) -> Result<Vec<Node>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let index = inner
            .indexes
            .property_index(key, lo.value_type())
            .ok_or_else(|| GraphError::IndexMissing(key.to_string()))?;
        Ok(index
            .lookup_range(lo, hi)?
            .into_iter()
            .filter_map(|id| inner.nodes.get(&id).cloned())
            .collect())
    }

    pub fn find_nodes_by_property_prefix(&self, key: &str, prefix: &str) -> Result<Vec<Node>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let index = inner
            .indexes
            .property_index(key, ValueType::String)
            .ok_or_else(|| GraphError::IndexMissing(key.to_string()))?;
        Ok(index
            .lookup_prefix(prefix)?
            .into_iter()
            .filter_map(|id| inner.nodes.get(&id).cloned())
            .collect())
    }

    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Result<Vec<Edge>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let ids: Vec<EdgeId> = if let Some(edge_store) = &self.edge_store {
            edge_store.get_outgoing(node_id)?
        } else {
            inner.outgoing.get(&node_id).cloned().unwrap_or_default()
        };
        Ok(ids.into_iter().filter_map(|id| inner.edges.get(&id).cloned()).collect())
    }

    pub fn get_incoming_edges(&self, node_id: NodeId) -> Result<Vec<Edge>> {
        let inner = self.inner.read();
        self.ensure_open(&inner)?;
        let ids: Vec<EdgeId> = if let Some(edge_store) = &self.edge_store {
            edge_store.get_incoming(node_id)?
        } else {
            inner.incoming.get(&node_id).cloned().unwrap_or_default()
        };
        Ok(ids.into_iter().filter_map(|id| inner.edges.get(&id).cloned()).collect())
    }

    // ---- index lifecycle ----

    pub fn create_property_index(&self, key: &str, value_type: ValueType) -> Result<()> {
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if inner.indexes.has_property_index(key, value_type) {
            return Err(GraphError::IndexExists(format!("{key}:{value_type:?}")));
        }
        let op = WalOp::CreatePropertyIndex {
            key: key.to_string(),
            value_type,
        };
        self.log(&op)?;
        apply_op(&mut inner, op)
    }

    pub fn drop_property_index(&self, key: &str, value_type: ValueType) -> Result<()> {
        let mut inner = self.inner.write();
        self.ensure_open(&inner)?;
        if !inner.indexes.has_property_index(key, value_type) {
            return Err(GraphError::IndexMissing(format!("{key}:{value_type:?}")));
        }
        let op = WalOp::DropPropertyIndex {
            key: key.to_string(),
            value_type,
        };
        self.log(&op)?;
        apply_op(&mut inner, op)
    }

    // ---- lifecycle ----

    pub fn statistics(&self) -> StoreStatistics {
        let inner = self.inner.read();
        self.statistics.snapshot(inner.nodes.len(), inner.edges.len())
    }

    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(GraphError::AlreadyClosed);
        }
        let compressed_adjacency = if self.config.enable_compression {
            Some(compress_adjacency(&inner.outgoing, &inner.incoming))
        } else {
            None
        };
        let snapshot = GraphSnapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            next_node_id: inner.next_node_id,
            next_edge_id: inner.next_edge_id,
            nodes: inner.nodes.values().cloned().collect(),
            edges: inner.edges.values().cloned().collect(),
            property_indexes: declared_indexes(&inner.indexes),
            statistics: self.statistics.snapshot(inner.nodes.len(), inner.edges.len()),
            compressed_adjacency,
        };
        snapshot.write_atomic(
            &self.config.snapshot_tmp_path(),
            &self.config.snapshot_path(),
            self.encryption_hook.as_deref(),
        )?;
        if let Some(edge_store) = &self.edge_store {
            edge_store.close()?;
        }
        self.wal.truncate()?;
        self.wal.close()?;
        inner.closed = true;
        tracing::info!("graph store closed cleanly");
        Ok(())
    }
}

/// Recovers the set of `(key, value_type)` declarations needed to rebuild the
/// property-index population on load. `IndexSet` does not track this list
/// directly (only the populated buckets), so the graph store tracks it
/// alongside the index set itself.
fn declared_indexes(indexes: &IndexSet) -> Vec<PropertyIndexDecl> {
    indexes
        .declared()
        .into_iter()
        .map(|(key, value_type)| PropertyIndexDecl { key, value_type })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_allocation_fails_at_exhaustion() {
        let mut inner = Inner::fresh();
        inner.next_node_id = u64::MAX - 1;
        assert_eq!(inner.alloc_node_id().unwrap(), u64::MAX - 1);
        assert_eq!(inner.alloc_node_id().unwrap(), u64::MAX);
        assert!(matches!(inner.alloc_node_id(), Err(GraphError::IdExhausted)));
    }

    #[test]
    fn observed_ids_advance_the_counter_past_replayed_values() {
        let mut inner = Inner::fresh();
        inner.observe_node_id(41);
        assert_eq!(inner.alloc_node_id().unwrap(), 42);
    }

    #[test]
    fn validate_finite_rejects_nan_weight_and_properties() {
        let mut props = BTreeMap::new();
        props.insert("score".to_string(), Value::F64(f64::NAN));
        assert!(validate_finite(&props, None).is_err());
        assert!(validate_finite(&BTreeMap::new(), Some(f64::INFINITY)).is_err());
        assert!(validate_finite(&BTreeMap::new(), Some(1.0)).is_ok());
    }
}

fn apply_op(inner: &mut Inner, op: WalOp) -> Result<()> {
    match op {
        WalOp::CreateNode {
            id,
            labels,
            properties,
            created_at,
        } => {
            inner.observe_node_id(id);
            for label in &labels {
                inner.indexes.add_label(id, label);
            }
            inner.indexes.index_properties(id, properties.iter());
            inner.nodes.insert(
                id,
                Node {
                    id,
                    labels,
                    properties,
                    created_at,
                    updated_at: created_at,
                },
            );
        }
        WalOp::UpdateNode {
            id,
            properties,
            updated_at,
        } => {
            if let Some(node) = inner.nodes.get(&id).cloned() {
                inner.indexes.unindex_properties(id, node.properties.iter());
                inner.indexes.index_properties(id, properties.iter());
                if let Some(node) = inner.nodes.get_mut(&id) {
                    node.properties = properties;
                    node.updated_at = updated_at;
                }
            }
        }
        WalOp::DeleteNode { id } => {
            if let Some(node) = inner.nodes.remove(&id) {
                for label in &node.labels {
                    inner.indexes.remove_label(id, label);
                }
                inner.indexes.unindex_properties(id, node.properties.iter());
            }
            inner.outgoing.remove(&id);
            inner.incoming.remove(&id);
        }
        WalOp::AddLabel { id, label } => {
            inner.indexes.add_label(id, &label);
            if let Some(node) = inner.nodes.get_mut(&id) {
                if !node.labels.iter().any(|l| l == &label) {
                    node.labels.push(label);
                }
            }
        }
        WalOp::RemoveLabel { id, label } => {
            inner.indexes.remove_label(id, &label);
            if let Some(node) = inner.nodes.get_mut(&id) {
                node.labels.retain(|l| l != &label);
            }
        }
        WalOp::CreateEdge {
            id,
            from_id,
            to_id,
            edge_type,
            properties,
            weight,
            created_at,
        } => {
            inner.observe_edge_id(id);
            inner.indexes.add_edge_type(id, &edge_type);
            inner.outgoing.entry(from_id).or_default().push(id);
            inner.incoming.entry(to_id).or_default().push(id);
            inner.edges.insert(
                id,
                Edge {
                    id,
                    from_id,
                    to_id,
                    edge_type,
                    properties,
                    weight,
                    created_at,
                },
            );
        }
        WalOp::UpdateEdge { id, properties, weight } => {
            if let Some(edge) = inner.edges.get_mut(&id) {
                edge.properties = properties;
                if let Some(w) = weight {
                    edge.weight = w;
                }
            }
        }
        WalOp::DeleteEdge { id } => {
            if let Some(edge) = inner.edges.remove(&id) {
                inner.indexes.remove_edge_type(id, &edge.edge_type);
                if let Some(list) = inner.outgoing.get_mut(&edge.from_id) {
                    list.retain(|e| *e != id);
                }
                if let Some(list) = inner.incoming.get_mut(&edge.to_id) {
                    list.retain(|e| *e != id);
                }
            }
        }
        WalOp::CreatePropertyIndex { key, value_type } => {
            let existing: Vec<(NodeId, Value)> = inner
                .nodes
                .values()
                .filter_map(|n| n.properties.get(&key).map(|v| (n.id, v.clone())))
                .collect();
            // Idempotent under replay: ignore Index-exists, the index may
            // already have been rebuilt from a loaded snapshot's declarations.
            match inner
                .indexes
                .create_property_index(&key, value_type, existing.into_iter())
            {
                Ok(()) | Err(GraphError::IndexExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        WalOp::DropPropertyIndex { key, value_type } => {
            match inner.indexes.drop_property_index(&key, value_type) {
                Ok(()) | Err(GraphError::IndexMissing(_)) => {}
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}
