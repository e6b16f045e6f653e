//! In-memory corpus cache.
//!
//! The cache holds one immutable [`CorpusRecord`] per version inside a
//! [`CacheSnapshot`]. A snapshot is built completely before it is published
//! and is never edited afterwards; [`CorpusCache::reload`] builds a fresh
//! snapshot and swaps the shared pointer in one step. Readers clone the
//! `Arc` and keep a consistent view for as long as they hold it.
//!
//! Per-version load failures are logged and the version is left out of the
//! snapshot. An unreachable store during enumeration yields an empty
//! snapshot rather than an error, so the server can still start.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use corpus_lens_core::models::CorpusRecord;
use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::{CorpusError, CorpusResult};

use crate::registry::VersionRegistry;

/// Frozen `version -> record` mapping.
#[derive(Debug)]
pub struct CacheSnapshot {
    records: HashMap<String, Arc<CorpusRecord>>,
    failed: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn empty() -> Self {
        Self {
            records: HashMap::new(),
            failed: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn get(&self, version: &str) -> Option<Arc<CorpusRecord>> {
        self.records.get(version).cloned()
    }

    /// Loaded version names, ascending.
    pub fn versions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.keys().cloned().collect();
        names.sort();
        names
    }

    /// Versions the store listed but that failed to load, ascending.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load one version's record from the store.
pub async fn load_record(store: &dyn CorpusStore, version: &str) -> CorpusResult<CorpusRecord> {
    let row = store
        .fetch_version(version)
        .await?
        .ok_or_else(|| CorpusError::VersionNotFound(version.to_string()))?;
    Ok(CorpusRecord::from(row))
}

/// Build a complete snapshot, loading up to `concurrency` versions at once.
pub async fn build(
    registry: &VersionRegistry,
    store: &Arc<dyn CorpusStore>,
    concurrency: usize,
) -> CacheSnapshot {
    let names = match registry.list_versions().await {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "could not enumerate corpus versions; cache starts empty");
            return CacheSnapshot::empty();
        }
    };
    info!(count = names.len(), "warming corpus cache");

    let results: Vec<(String, CorpusResult<CorpusRecord>)> = stream::iter(names)
        .map(|name| {
            let store = Arc::clone(store);
            async move {
                let result = load_record(store.as_ref(), &name).await;
                (name, result)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut records = HashMap::with_capacity(results.len());
    let mut failed = Vec::new();
    for (name, result) in results {
        match result {
            Ok(record) => {
                info!(version = %name, n_paragraphs = record.n_paragraphs, "loaded version");
                records.insert(name, Arc::new(record));
            }
            Err(e) => {
                warn!(version = %name, error = %e, "failed to load version; skipping");
                failed.push(name);
            }
        }
    }
    failed.sort();

    info!(loaded = records.len(), failed = failed.len(), "corpus cache ready");
    CacheSnapshot {
        records,
        failed,
        loaded_at: Utc::now(),
    }
}

/// Process-scoped handle to the current snapshot.
#[derive(Clone)]
pub struct CorpusCache {
    registry: VersionRegistry,
    store: Arc<dyn CorpusStore>,
    concurrency: usize,
    current: Arc<RwLock<Arc<CacheSnapshot>>>,
    /// Held across build and publish so reloads publish in call order.
    reloading: Arc<Mutex<()>>,
}

impl CorpusCache {
    /// A cache with nothing loaded yet.
    pub fn new(store: Arc<dyn CorpusStore>, concurrency: usize) -> Self {
        Self {
            registry: VersionRegistry::new(Arc::clone(&store)),
            store,
            concurrency,
            current: Arc::new(RwLock::new(Arc::new(CacheSnapshot::empty()))),
            reloading: Arc::new(Mutex::new(())),
        }
    }

    /// Build the first snapshot and return a cache serving it.
    pub async fn warm(store: Arc<dyn CorpusStore>, concurrency: usize) -> Self {
        let cache = Self::new(store, concurrency);
        let snapshot = build(&cache.registry, &cache.store, cache.concurrency).await;
        cache.publish(snapshot);
        cache
    }

    /// Rebuild from the store and publish the result atomically.
    ///
    /// Concurrent reloads run one at a time, so a slower, older build can
    /// never replace a newer snapshot.
    pub async fn reload(&self) -> Arc<CacheSnapshot> {
        let _reloading = self.reloading.lock().await;
        let snapshot = Arc::new(build(&self.registry, &self.store, self.concurrency).await);
        self.publish_arc(Arc::clone(&snapshot));
        snapshot
    }

    pub fn publish(&self, snapshot: CacheSnapshot) {
        self.publish_arc(Arc::new(snapshot));
    }

    fn publish_arc(&self, snapshot: Arc<CacheSnapshot>) {
        // A poisoned lock still holds a complete snapshot pointer.
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = snapshot;
    }

    /// The snapshot currently being served.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }

    pub fn get(&self, version: &str) -> Option<Arc<CorpusRecord>> {
        self.snapshot().get(version)
    }

    pub fn versions(&self) -> Vec<String> {
        self.snapshot().versions()
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }
}
