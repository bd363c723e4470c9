pub mod cache;
pub mod edgelist;
pub mod edgestore;
pub mod graphstore;
pub mod index;
pub mod kvengine;
pub mod snapshot;
pub mod wal;

pub use cache::{CacheKey, CacheStats, Direction, EdgeCache};
pub use edgelist::CompressedEdgeList;
pub use edgestore::EdgeStore;
pub use graphstore::{GraphStore, StoreHooks};
pub use index::{IndexSet, PropertyIndex};
pub use kvengine::{MemoryKvEngine, RocksKvEngine};
pub use snapshot::{
    compress_adjacency, decompress_adjacency, CompressedAdjacencyEntry, GraphSnapshot,
    PropertyIndexDecl, SNAPSHOT_FORMAT_VERSION,
};
pub use wal::{Wal, WalConfig, WalOp};
