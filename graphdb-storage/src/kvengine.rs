//! Concrete [`KvEngine`] implementations.
//!
//! The spec treats the LSM key-value engine as an external collaborator
//! specified only by its operation set. `RocksKvEngine` is the bundled
//! default so the store is runnable standalone, mirroring the teacher
//! crate's choice of `rocksdb` as its persistence backend, trimmed to a
//! single column family since the edge store needs no more than one
//! byte-ordered keyspace.

use graphdb_core::error::{GraphError, Result};
use graphdb_core::traits::KvEngine;
use rocksdb::{Options, DB};
use std::path::Path;
use std::sync::Mutex;

pub struct RocksKvEngine {
    db: DB,
}

impl RocksKvEngine {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.increase_parallelism(num_cpus_hint());
        let db = DB::open(&opts, path).map_err(|e| GraphError::Engine(e.to_string()))?;
        Ok(Self { db })
    }
}

fn num_cpus_hint() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4)
}

impl KvEngine for RocksKvEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| GraphError::Engine(e.to_string()))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| GraphError::Engine(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| GraphError::Engine(e.to_string()))
    }

    fn scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator(rocksdb::IteratorMode::From(start, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(|e| GraphError::Engine(e.to_string()))?;
            if key.as_ref() >= end {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn close(&self) -> Result<()> {
        self.db.flush().map_err(|e| GraphError::Engine(e.to_string()))
    }
}

/// In-memory [`KvEngine`] used by tests that exercise the edge store without
/// paying for RocksDB setup.
#[derive(Default)]
pub struct MemoryKvEngine {
    inner: Mutex<std::collections::BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKvEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvEngine for MemoryKvEngine {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.lock().unwrap().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.lock().unwrap().remove(key);
        Ok(())
    }

    fn scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .range(start.to_vec()..end.to_vec())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_engine_round_trips() {
        let engine = MemoryKvEngine::new();
        engine.put(b"a", b"1").unwrap();
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        engine.delete(b"a").unwrap();
        assert_eq!(engine.get(b"a").unwrap(), None);
    }

    #[test]
    fn memory_engine_scan_is_ordered_and_bounded() {
        let engine = MemoryKvEngine::new();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();
        engine.put(b"c", b"3").unwrap();
        let scanned = engine.scan(b"a", b"c").unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0, b"a");
    }
}
