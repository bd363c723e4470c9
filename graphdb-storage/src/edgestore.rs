//! Disk-backed adjacency, fronted by the edge cache (C4).

use crate::cache::{CacheKey, Direction, EdgeCache};
use crate::edgelist::CompressedEdgeList;
use graphdb_core::error::Result;
use graphdb_core::node::NodeId;
use graphdb_core::traits::KvEngine;
use parking_lot::Mutex;
use std::sync::Arc;

/// Key layout: `direction_byte('o' | 'i') | node_id(8 big-endian)`.
fn encode_key(direction: Direction, node_id: NodeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(match direction {
        Direction::Outgoing => b'o',
        Direction::Incoming => b'i',
    });
    key.extend_from_slice(&node_id.to_be_bytes());
    key
}

/// Disk-backed adjacency store. Each `(direction, node)` pair is written as a
/// single key holding the full compressed edge list for that node in that
/// direction; reads and writes to distinct keys proceed independently, while
/// access to the same key is serialized through a per-key lock stripe.
pub struct EdgeStore {
    engine: Arc<dyn KvEngine>,
    cache: EdgeCache,
    write_locks: [Mutex<()>; 64],
}

impl EdgeStore {
    pub fn new(engine: Arc<dyn KvEngine>, cache_capacity: usize) -> Self {
        Self {
            engine,
            cache: EdgeCache::new(cache_capacity),
            write_locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    fn stripe(&self, node_id: NodeId) -> &Mutex<()> {
        &self.write_locks[(node_id as usize) % self.write_locks.len()]
    }

    pub fn get_outgoing(&self, node_id: NodeId) -> Result<Vec<u64>> {
        self.get(Direction::Outgoing, node_id)
    }

    pub fn get_incoming(&self, node_id: NodeId) -> Result<Vec<u64>> {
        self.get(Direction::Incoming, node_id)
    }

    fn get(&self, direction: Direction, node_id: NodeId) -> Result<Vec<u64>> {
        let key: CacheKey = (direction, node_id);
        if let Some(list) = self.cache.get(key) {
            return Ok(list.decompress().map_err(|(_, e)| e)?);
        }
        let _guard = self.stripe(node_id).lock();
        // Re-check after acquiring the stripe lock: another writer may have
        // populated the cache while we waited.
        if let Some(list) = self.cache.get(key) {
            return Ok(list.decompress().map_err(|(_, e)| e)?);
        }
        let raw = self.engine.get(&encode_key(direction, node_id))?;
        let list = match raw {
            Some(bytes) => CompressedEdgeList::from_bytes(bytes)?,
            None => CompressedEdgeList::empty(),
        };
        let ids = list.decompress().map_err(|(_, e)| e)?;
        self.cache.put(key, list);
        Ok(ids)
    }

    pub fn store_outgoing(&self, node_id: NodeId, ids: Vec<u64>) -> Result<()> {
        self.store(Direction::Outgoing, node_id, ids)
    }

    pub fn store_incoming(&self, node_id: NodeId, ids: Vec<u64>) -> Result<()> {
        self.store(Direction::Incoming, node_id, ids)
    }

    fn store(&self, direction: Direction, node_id: NodeId, ids: Vec<u64>) -> Result<()> {
        let _guard = self.stripe(node_id).lock();
        let list = CompressedEdgeList::from_ids(ids);
        self.engine
            .put(&encode_key(direction, node_id), list.as_bytes())?;
        self.cache.put((direction, node_id), list);
        Ok(())
    }

    pub fn delete_node(&self, node_id: NodeId) -> Result<()> {
        let _guard = self.stripe(node_id).lock();
        self.engine.delete(&encode_key(Direction::Outgoing, node_id))?;
        self.engine.delete(&encode_key(Direction::Incoming, node_id))?;
        self.cache.invalidate((Direction::Outgoing, node_id));
        self.cache.invalidate((Direction::Incoming, node_id));
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.engine.close()
    }

    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }
}
