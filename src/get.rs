//! One-shot operation lookup for the `corpus get` command.
//!
//! Warms a cache the same way the server does, resolves a single
//! `(version, operation)` pair and prints the JSON envelope.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use corpus_lens_core::store::CorpusStore;

use crate::cache::CorpusCache;
use crate::config::Config;
use crate::db;
use crate::dispatch::{Dispatcher, Envelope};

/// Resolve one operation, using the paragraph entry point when `paragraph` is set.
pub async fn get_operation(
    config: &Config,
    version: &str,
    operation: &str,
    paragraph: Option<i64>,
) -> Result<Envelope> {
    let sqlite = db::open_store(config).await?;
    let pool = sqlite.pool().clone();
    let store: Arc<dyn CorpusStore> = Arc::new(sqlite);

    let cache = CorpusCache::warm(Arc::clone(&store), config.cache.warmup_concurrency).await;
    let dispatcher = Dispatcher::new(cache, store, config.vectors);
    let cancel = CancellationToken::new();

    let result = match paragraph {
        Some(ordinal) => {
            dispatcher
                .resolve_paragraph(version, operation, ordinal, &cancel)
                .await
        }
        None => dispatcher.resolve(version, operation, &cancel).await,
    };
    pool.close().await;
    Ok(result?)
}

pub async fn run_get(
    config: &Config,
    version: &str,
    operation: &str,
    paragraph: Option<i64>,
) -> Result<()> {
    let envelope = get_operation(config, version, operation, paragraph).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
