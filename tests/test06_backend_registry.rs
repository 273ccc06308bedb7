#![cfg(feature = "sqlite")]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use sql_cache_dal::prelude::*;

/// Minimal document store standing in for a Mongo-style pluggable client.
struct MockDocStore {
    connected: bool,
    docs: HashMap<String, Value>,
    reads: Arc<AtomicUsize>,
}

impl MockDocStore {
    fn new(reads: Arc<AtomicUsize>) -> Self {
        let mut docs = HashMap::new();
        docs.insert("users".to_string(), json!([{ "name": "alice" }]));
        Self {
            connected: false,
            docs,
            reads,
        }
    }
}

impl Backend for MockDocStore {
    fn connect(&mut self, _params: &BackendParams) -> Result<(), DalError> {
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn save(&mut self, spec: &SaveSpec) -> Result<SaveOutcome, DalError> {
        self.docs.insert(spec.target.clone(), spec.document.clone());
        Ok(SaveOutcome {
            id: Some(spec.target.clone()),
            acknowledged: true,
        })
    }

    fn delete(&mut self, spec: &DeleteSpec) -> Result<DeleteOutcome, DalError> {
        let removed = u64::from(self.docs.remove(&spec.target).is_some());
        Ok(DeleteOutcome { removed })
    }

    fn get(&mut self, spec: &QuerySpec) -> Result<Value, DalError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.get(&spec.target).cloned().unwrap_or(Value::Null))
    }
}

fn dal_with_backend(cache: CacheSettings) -> (Dal, Arc<AtomicUsize>) {
    let config = DalConfig::builder()
        .alias("primary", ConnectionParams::sqlite(":memory:"))
        .cache(cache)
        .build();
    let mut dal = Dal::new(config);
    let reads = Arc::new(AtomicUsize::new(0));
    dal.register_backend("documents", Box::new(MockDocStore::new(Arc::clone(&reads))));
    (dal, reads)
}

#[test]
fn backend_reads_flow_through_the_cache() -> Result<(), Box<dyn std::error::Error>> {
    let (mut dal, reads) = dal_with_backend(CacheSettings::in_process());
    let spec = QuerySpec {
        target: "users".to_string(),
        query: json!({}),
    };

    let first = dal.backend_get_with_cache("documents", &spec, 60)?;
    assert_eq!(first.cache_state, CacheState::Miss);
    assert_eq!(first.payload[0]["name"], "alice");
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    let second = dal.backend_get_with_cache("documents", &spec, 60)?;
    assert_eq!(second.cache_state, CacheState::Hit);
    assert_eq!(second.payload, first.payload);
    // The hit never reached the backend.
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn disabled_cache_always_reaches_the_backend() -> Result<(), Box<dyn std::error::Error>> {
    let (mut dal, reads) = dal_with_backend(CacheSettings::disabled());
    let spec = QuerySpec {
        target: "users".to_string(),
        query: json!({}),
    };

    for _ in 0..2 {
        let read = dal.backend_get_with_cache("documents", &spec, 60)?;
        assert_eq!(read.cache_state, CacheState::Disabled);
    }
    assert_eq!(reads.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn saves_and_deletes_pass_through() -> Result<(), Box<dyn std::error::Error>> {
    let (mut dal, _reads) = dal_with_backend(CacheSettings::in_process());

    let backend = dal.backend("documents")?;
    backend.connect(&BackendParams::new("mock://localhost"))?;
    assert!(backend.is_connected());

    let outcome = backend.save(&SaveSpec {
        target: "sessions".to_string(),
        document: json!({ "token": "abc" }),
        operation: SaveOperation::Insert,
    })?;
    assert!(outcome.acknowledged);
    assert_eq!(outcome.id.as_deref(), Some("sessions"));

    let removed = backend.delete(&DeleteSpec {
        target: "sessions".to_string(),
        criteria: json!({}),
    })?;
    assert_eq!(removed.removed, 1);
    Ok(())
}

#[test]
fn unknown_backends_fail_typed() {
    let (mut dal, _reads) = dal_with_backend(CacheSettings::in_process());
    let spec = QuerySpec {
        target: "users".to_string(),
        query: json!({}),
    };
    assert!(matches!(
        dal.backend_get_with_cache("graph", &spec, 60),
        Err(DalError::UnknownDatabase(name)) if name == "graph"
    ));
    assert!(matches!(dal.backend("graph"), Err(DalError::UnknownDatabase(_))));
}

#[test]
fn backend_writes_can_invalidate_cached_reads() -> Result<(), Box<dyn std::error::Error>> {
    let (mut dal, reads) = dal_with_backend(CacheSettings::in_process());
    let spec = QuerySpec {
        target: "users".to_string(),
        query: json!({}),
    };

    dal.backend_get_with_cache("documents", &spec, 60)?;

    // A write the caller knows about: replace the collection, then direct
    // the cache to drop the stale read.
    dal.backend("documents")?.save(&SaveSpec {
        target: "users".to_string(),
        document: json!([{ "name": "bob" }]),
        operation: SaveOperation::Update,
    })?;
    let key = sql_cache_dal::keys::backend_key("documents", &serde_json::to_value(&spec)?);
    assert!(dal.uncache_object(&key));

    let fresh = dal.backend_get_with_cache("documents", &spec, 60)?;
    assert_eq!(fresh.cache_state, CacheState::Miss);
    assert_eq!(fresh.payload[0]["name"], "bob");
    assert_eq!(reads.load(Ordering::SeqCst), 2);
    Ok(())
}
