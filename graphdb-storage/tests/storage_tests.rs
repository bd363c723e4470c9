use graphdb_core::config::StoreConfig;
use graphdb_core::error::GraphError;
use graphdb_core::value::{Value, ValueType};
use graphdb_storage::{GraphStore, StoreHooks};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn open(dir: &TempDir) -> GraphStore {
    GraphStore::open(StoreConfig::new(dir.path()), StoreHooks::default()).unwrap()
}

fn open_with(config: StoreConfig) -> GraphStore {
    GraphStore::open(config, StoreHooks::default()).unwrap()
}

fn props(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn s1_labels_and_adjacency() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let alice = store
        .create_node(vec!["Person".into()], props(&[("name", Value::String("Alice".into()))]))
        .unwrap();
    let bob = store
        .create_node(vec!["Person".into()], props(&[("name", Value::String("Bob".into()))]))
        .unwrap();
    store
        .create_edge(alice.id, bob.id, "KNOWS".into(), BTreeMap::new(), 1.0)
        .unwrap();

    assert_eq!(store.find_nodes_by_label("Person").unwrap().len(), 2);
    assert_eq!(store.get_outgoing_edges(alice.id).unwrap().len(), 1);
    assert_eq!(store.get_incoming_edges(bob.id).unwrap().len(), 1);
}

#[test]
fn s2_property_index_eq_and_range() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.create_property_index("score", ValueType::I64).unwrap();
    for i in 0..100i64 {
        store
            .create_node(vec![], props(&[("score", Value::I64(i))]))
            .unwrap();
    }
    let hits = store
        .find_nodes_by_property_indexed("score", &Value::I64(50))
        .unwrap();
    assert_eq!(hits.len(), 1);
    let range = store
        .find_nodes_by_property_range("score", &Value::I64(30), &Value::I64(40))
        .unwrap();
    assert_eq!(range.len(), 11);
}

#[test]
fn s3_crash_recovery_without_close() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir);
        for _ in 0..100 {
            store.create_node(vec![], BTreeMap::new()).unwrap();
        }
        // Deliberately dropped without calling close(): simulates a crash in
        // sync WAL mode, where every completed append is already durable.
    }
    let store = open(&dir);
    let stats = store.statistics();
    assert_eq!(stats.node_count, 100);
    for id in 1..=100u64 {
        assert!(store.get_node(id).is_ok());
    }
}

#[test]
fn first_node_gets_id_one_with_disk_backed_edges_off() {
    let dir = TempDir::new().unwrap();
    let mut cfg = StoreConfig::new(dir.path());
    cfg.use_disk_backed_edges = false;
    let store = open_with(cfg);
    let node = store.create_node(vec![], BTreeMap::new()).unwrap();
    assert_eq!(node.id, 1);
}

#[test]
fn delete_node_cascades_edges_and_indexes() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let a = store
        .create_node(vec!["Person".into()], BTreeMap::new())
        .unwrap();
    let b = store
        .create_node(vec!["Person".into()], BTreeMap::new())
        .unwrap();
    let edge = store
        .create_edge(a.id, b.id, "KNOWS".into(), BTreeMap::new(), 1.0)
        .unwrap();

    store.delete_node(a.id).unwrap();

    assert!(matches!(store.get_node(a.id), Err(GraphError::NotFound(_))));
    assert!(matches!(store.get_edge(edge.id), Err(GraphError::NotFound(_))));
    assert_eq!(store.find_nodes_by_label("Person").unwrap().len(), 1);
    assert!(store.get_incoming_edges(b.id).unwrap().is_empty());
}

#[test]
fn round_trip_after_close_and_reopen() {
    let dir = TempDir::new().unwrap();
    let a_id;
    let edge_id;
    {
        let store = open(&dir);
        store.create_property_index("score", ValueType::I64).unwrap();
        let a = store
            .create_node(vec!["Person".into()], props(&[("score", Value::I64(7))]))
            .unwrap();
        let b = store.create_node(vec!["Person".into()], BTreeMap::new()).unwrap();
        let edge = store
            .create_edge(a.id, b.id, "KNOWS".into(), BTreeMap::new(), 0.5)
            .unwrap();
        a_id = a.id;
        edge_id = edge.id;
        store.close().unwrap();
        assert!(matches!(store.close(), Err(GraphError::AlreadyClosed)));
    }

    let store = open(&dir);
    assert!(store.get_node(a_id).is_ok());
    assert!(store.get_edge(edge_id).is_ok());
    assert_eq!(
        store
            .find_nodes_by_property_indexed("score", &Value::I64(7))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(store.find_nodes_by_label("Person").unwrap().len(), 2);
}

#[test]
fn operations_after_close_fail_closed() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.create_node(vec![], BTreeMap::new()).unwrap();
    store.close().unwrap();
    assert!(matches!(
        store.create_node(vec![], BTreeMap::new()),
        Err(GraphError::Closed)
    ));
}

#[test]
fn disk_backed_adjacency_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let mut cfg = StoreConfig::new(dir.path());
    cfg.use_disk_backed_edges = true;
    let a_id;
    let b_id;
    {
        let store = open_with(cfg.clone());
        let a = store.create_node(vec![], BTreeMap::new()).unwrap();
        let b = store.create_node(vec![], BTreeMap::new()).unwrap();
        store
            .create_edge(a.id, b.id, "LINKS".into(), BTreeMap::new(), 1.0)
            .unwrap();
        a_id = a.id;
        b_id = b.id;
        store.close().unwrap();
    }
    let store = open_with(cfg);
    assert_eq!(store.get_outgoing_edges(a_id).unwrap().len(), 1);
    assert_eq!(store.get_incoming_edges(b_id).unwrap().len(), 1);
}

#[test]
fn cascaded_edge_deletion_clears_surviving_endpoints_disk_backed() {
    let dir = TempDir::new().unwrap();
    let mut cfg = StoreConfig::new(dir.path());
    cfg.use_disk_backed_edges = true;
    let store = open_with(cfg);

    let a = store.create_node(vec![], BTreeMap::new()).unwrap();
    let b = store.create_node(vec![], BTreeMap::new()).unwrap();
    let c = store.create_node(vec![], BTreeMap::new()).unwrap();
    store
        .create_edge(a.id, b.id, "KNOWS".into(), BTreeMap::new(), 1.0)
        .unwrap();
    store
        .create_edge(c.id, a.id, "KNOWS".into(), BTreeMap::new(), 1.0)
        .unwrap();
    store
        .create_edge(c.id, b.id, "KNOWS".into(), BTreeMap::new(), 1.0)
        .unwrap();

    // Deleting `a` cascades both of its edges; `b` and `c` each keep one
    // surviving edge (`c -> b`) after the cascade.
    store.delete_node(a.id).unwrap();

    assert!(store.get_incoming_edges(b.id).unwrap().len() == 1);
    assert!(store.get_outgoing_edges(c.id).unwrap().len() == 1);
}

#[test]
fn concurrent_node_creation_yields_distinct_ids() {
    use std::sync::Arc;
    use std::thread;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir));
    let threads = 8;
    let per_thread = 50;
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(per_thread);
                for _ in 0..per_thread {
                    ids.push(store.create_node(vec![], BTreeMap::new()).unwrap().id);
                }
                ids
            })
        })
        .collect();

    let mut all_ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    assert_eq!(all_ids.len(), threads * per_thread);
    all_ids.sort_unstable();
    all_ids.dedup();
    assert_eq!(all_ids.len(), threads * per_thread);
    assert_eq!(store.statistics().node_count, threads * per_thread);
}

#[test]
fn property_prefix_lookup_requires_string_type() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.create_property_index("name", ValueType::String).unwrap();
    store
        .create_node(vec![], props(&[("name", Value::String("alice".into()))]))
        .unwrap();
    store
        .create_node(vec![], props(&[("name", Value::String("albert".into()))]))
        .unwrap();
    store
        .create_node(vec![], props(&[("name", Value::String("bob".into()))]))
        .unwrap();

    let hits = store.find_nodes_by_property_prefix("name", "al").unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn update_node_reindexes_properties() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.create_property_index("score", ValueType::I64).unwrap();
    let node = store
        .create_node(vec![], props(&[("score", Value::I64(1))]))
        .unwrap();

    store
        .update_node(node.id, props(&[("score", Value::I64(2))]))
        .unwrap();

    assert!(store
        .find_nodes_by_property_indexed("score", &Value::I64(1))
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .find_nodes_by_property_indexed("score", &Value::I64(2))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn bulk_import_mode_skips_wal_but_keeps_in_memory_state() {
    let dir = TempDir::new().unwrap();
    let mut cfg = StoreConfig::new(dir.path());
    cfg.bulk_import_mode = true;
    let store = open_with(cfg);
    for _ in 0..10 {
        store.create_node(vec![], BTreeMap::new()).unwrap();
    }
    assert_eq!(store.statistics().node_count, 10);
    // Not closed: bulk-import sessions accept non-durability, so a reopen
    // without a clean close is expected to lose everything logged only to
    // the (unwritten) WAL.
}

#[test]
fn drop_property_index_then_missing() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.create_property_index("score", ValueType::I64).unwrap();
    store.drop_property_index("score", ValueType::I64).unwrap();
    assert!(matches!(
        store.drop_property_index("score", ValueType::I64),
        Err(GraphError::IndexMissing(_))
    ));
}

#[test]
fn nan_weight_and_properties_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let a = store.create_node(vec![], BTreeMap::new()).unwrap();
    let b = store.create_node(vec![], BTreeMap::new()).unwrap();
    assert!(matches!(
        store.create_edge(a.id, b.id, "KNOWS".into(), BTreeMap::new(), f64::NAN),
        Err(GraphError::TypeMismatch(_))
    ));
    assert!(matches!(
        store.create_node(vec![], props(&[("score", Value::F64(f64::INFINITY))])),
        Err(GraphError::TypeMismatch(_))
    ));
}

#[test]
fn duplicate_property_index_fails() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.create_property_index("score", ValueType::I64).unwrap();
    assert!(matches!(
        store.create_property_index("score", ValueType::I64),
        Err(GraphError::IndexExists(_))
    ));
}

#[test]
fn enable_compression_round_trips_adjacency_through_close_and_reopen() {
    let dir = TempDir::new().unwrap();
    let mut cfg = StoreConfig::new(dir.path());
    cfg.enable_compression = true;
    cfg.use_disk_backed_edges = false;

    let a_id;
    let b_id;
    let c_id;
    {
        let store = open_with(cfg.clone());
        let a = store.create_node(vec![], BTreeMap::new()).unwrap();
        let b = store.create_node(vec![], BTreeMap::new()).unwrap();
        let c = store.create_node(vec![], BTreeMap::new()).unwrap();
        store.create_edge(a.id, b.id, "KNOWS".into(), BTreeMap::new(), 1.0).unwrap();
        store.create_edge(a.id, c.id, "KNOWS".into(), BTreeMap::new(), 1.0).unwrap();
        store.create_edge(c.id, b.id, "KNOWS".into(), BTreeMap::new(), 1.0).unwrap();
        a_id = a.id;
        b_id = b.id;
        c_id = c.id;
        store.close().unwrap();
    }

    let raw = std::fs::read(dir.path().join("snapshot.json")).unwrap();
    assert!(
        String::from_utf8_lossy(&raw).contains("compressed_adjacency"),
        "snapshot should carry a compressed adjacency section when enable_compression is set"
    );

    let store = open_with(cfg);
    assert_eq!(store.get_outgoing_edges(a_id).unwrap().len(), 2);
    assert_eq!(store.get_incoming_edges(b_id).unwrap().len(), 2);
    assert_eq!(store.get_outgoing_edges(c_id).unwrap().len(), 1);
}
