pub mod config;
pub mod crypto;
pub mod error;
pub mod node;
pub mod stats;
pub mod traits;
pub mod value;

pub use config::StoreConfig;
pub use error::{GraphError, Result};
pub use node::{Edge, EdgeId, Node, NodeId};
pub use stats::{Statistics, StoreStatistics};
pub use traits::{EncryptionHook, KvEngine, NullVectorIndex, VectorIndexHook};
pub use value::{Value, ValueType};
