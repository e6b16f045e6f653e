//! Version registry.
//!
//! Lists the corpus versions known to the store. The result is never
//! cached here: every call goes back to the store, so the registry always
//! reflects what has been ingested, even versions the corpus cache has not
//! picked up yet.

use std::sync::Arc;

use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::CorpusResult;

use crate::cache::load_record;
use crate::config::Config;
use crate::db;

#[derive(Clone)]
pub struct VersionRegistry {
    store: Arc<dyn CorpusStore>,
}

impl VersionRegistry {
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self { store }
    }

    /// Version identifiers currently in the store.
    ///
    /// Fails with [`CorpusError::Store`](corpus_lens_core::CorpusError::Store)
    /// when the store is unreachable.
    pub async fn list_versions(&self) -> CorpusResult<Vec<String>> {
        Ok(self.store.list_version_names().await?)
    }
}

/// `corpus versions`: list stored versions and whether each one loads.
pub async fn run_versions(config: &Config) -> anyhow::Result<()> {
    let sqlite = db::open_store(config).await?;
    let pool = sqlite.pool().clone();
    let store: Arc<dyn CorpusStore> = Arc::new(sqlite);
    let registry = VersionRegistry::new(Arc::clone(&store));

    let names = registry.list_versions().await?;
    println!("{:<20} {:<24} {:<6} {:>10}", "VERSION", "AUTHOR", "YEAR", "PARAGRAPHS");
    for name in &names {
        match load_record(store.as_ref(), name).await {
            Ok(record) => println!(
                "{:<20} {:<24} {:<6} {:>10}",
                name, record.author, record.year, record.n_paragraphs
            ),
            Err(e) => println!("{:<20} FAILED: {}", name, e),
        }
    }
    if names.is_empty() {
        println!("(no versions ingested)");
    }

    pool.close().await;
    Ok(())
}
