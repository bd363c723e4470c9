//! Full-state serialization and atomic install (C6).

use crate::edgelist::CompressedEdgeList;
use graphdb_core::error::{GraphError, Result};
use graphdb_core::node::{Edge, Node, NodeId};
use graphdb_core::stats::StoreStatistics;
use graphdb_core::traits::EncryptionHook;
use graphdb_core::value::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Plaintext snapshots are JSON objects and therefore always begin with `{`
/// (0x7b). Anything else on disk is assumed to be ciphertext produced by an
/// [`EncryptionHook`].
const JSON_SENTINEL: u8 = b'{';

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyIndexDecl {
    pub key: String,
    pub value_type: ValueType,
}

/// One node's adjacency in both directions, each delta+varint compressed via
/// C2. Only present in the snapshot when `enable_compression` is set; adjacency
/// is otherwise re-derived from `edges` on load (every id in it resolves to a
/// live edge per invariant 2, so recomputing it is exact, just uncompressed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedAdjacencyEntry {
    pub node_id: NodeId,
    pub outgoing: Vec<u8>,
    pub incoming: Vec<u8>,
}

/// The full logical state of a graph store, as captured by `Snapshot()` and
/// restored by `LoadFromDisk()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    pub next_node_id: u64,
    pub next_edge_id: u64,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub property_indexes: Vec<PropertyIndexDecl>,
    pub statistics: StoreStatistics,
    /// Present only when the store was opened with `enable_compression`.
    #[serde(default)]
    pub compressed_adjacency: Option<Vec<CompressedAdjacencyEntry>>,
}

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Builds the compressed-adjacency section of a snapshot from the in-memory
/// outgoing/incoming maps.
pub fn compress_adjacency(
    outgoing: &HashMap<NodeId, Vec<u64>>,
    incoming: &HashMap<NodeId, Vec<u64>>,
) -> Vec<CompressedAdjacencyEntry> {
    let mut node_ids: std::collections::BTreeSet<NodeId> = outgoing.keys().copied().collect();
    node_ids.extend(incoming.keys().copied());
    node_ids
        .into_iter()
        .map(|node_id| CompressedAdjacencyEntry {
            node_id,
            outgoing: CompressedEdgeList::from_ids(outgoing.get(&node_id).cloned().unwrap_or_default())
                .as_bytes()
                .to_vec(),
            incoming: CompressedEdgeList::from_ids(incoming.get(&node_id).cloned().unwrap_or_default())
                .as_bytes()
                .to_vec(),
        })
        .collect()
}

/// Inverse of [`compress_adjacency`]: decompresses each entry back into
/// `(node_id, outgoing_ids, incoming_ids)` triples. A corrupt entry is
/// reported as [`GraphError::Corruption`] rather than silently dropped, since
/// this runs at open time, not during best-effort WAL replay.
pub fn decompress_adjacency(
    entries: &[CompressedAdjacencyEntry],
) -> Result<HashMap<NodeId, (Vec<u64>, Vec<u64>)>> {
    let mut out = HashMap::with_capacity(entries.len());
    for entry in entries {
        let outgoing = CompressedEdgeList::from_bytes(entry.outgoing.clone())?
            .decompress()
            .map_err(|(_, e)| e)?;
        let incoming = CompressedEdgeList::from_bytes(entry.incoming.clone())?
            .decompress()
            .map_err(|(_, e)| e)?;
        out.insert(entry.node_id, (outgoing, incoming));
    }
    Ok(out)
}

impl GraphSnapshot {
    /// Serializes and, if `hook` is set, encrypts this snapshot, then writes
    /// it to `final_path` via a `.tmp` file, `fsync`, and atomic rename —
    /// the same write-tmp-then-rename protocol the teacher crate uses for
    /// its own backup/restore paths.
    pub fn write_atomic(
        &self,
        tmp_path: &Path,
        final_path: &Path,
        hook: Option<&dyn EncryptionHook>,
    ) -> Result<()> {
        let plaintext = serde_json::to_vec(self)?;
        let bytes = match hook {
            Some(hook) => hook.encrypt(&plaintext)?,
            None => plaintext,
        };
        {
            let mut file = fs::File::create(tmp_path)?;
            use std::io::Write;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, final_path)?;
        if let Some(dir) = final_path.parent() {
            if let Ok(dir_file) = fs::File::open(dir) {
                let _ = dir_file.sync_all();
            }
        }
        Ok(())
    }

    /// Loads a snapshot previously written by [`Self::write_atomic`]. Bytes
    /// not beginning with the JSON sentinel are treated as ciphertext; if no
    /// `hook` is supplied in that case, fails with
    /// [`GraphError::EncryptionRequired`].
    pub fn load(path: &Path, hook: Option<&dyn EncryptionHook>) -> Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        let plaintext = if bytes[0] == JSON_SENTINEL {
            bytes
        } else {
            match hook {
                Some(hook) => hook.decrypt(&bytes)?,
                None => return Err(GraphError::EncryptionRequired),
            }
        };
        let snapshot: GraphSnapshot = serde_json::from_slice(&plaintext)
            .map_err(|e| GraphError::Corruption(format!("snapshot decode failed: {e}")))?;
        Ok(Some(snapshot))
    }
}
