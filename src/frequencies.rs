//! Per-request frequency tables.
//!
//! Nothing here is cached: each call reads the raw text back from the store
//! and recomputes the table from scratch.

use corpus_lens_core::lexical::{frequency_table, tokenize, word_codec, FrequencyTable, WordCodec};
use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::{CorpusError, CorpusResult};

pub async fn word_frequencies(store: &dyn CorpusStore, version: &str) -> CorpusResult<FrequencyTable> {
    let raw_text = store
        .fetch_raw_text(version)
        .await?
        .ok_or_else(|| CorpusError::VersionNotFound(version.to_string()))?;
    let tokens = tokenize(&raw_text)?;
    Ok(frequency_table(&tokens))
}

pub async fn version_codec(store: &dyn CorpusStore, version: &str) -> CorpusResult<WordCodec> {
    let table = word_frequencies(store, version).await?;
    Ok(word_codec(&table))
}
