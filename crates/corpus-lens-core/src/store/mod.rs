//! Storage contract for Corpus Lens.
//!
//! The [`CorpusStore`] trait is the narrow query surface the corpus cache,
//! the frequency engine and the embedding accessor need from a persistent
//! store: a `versions` relation keyed by unique version name and a
//! `paragraphs` relation keyed by `(version name, ordinal)`.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Rows are returned as plain records; ordering guarantees are explicitly
//! *not* part of the contract for paragraph reads, so callers sort.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ParagraphRow, StoredVector, VectorField, VersionRow};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_version_names`](CorpusStore::list_version_names) | Enumerate known versions |
/// | [`fetch_version`](CorpusStore::fetch_version) | Full version row |
/// | [`fetch_raw_text`](CorpusStore::fetch_raw_text) | Raw text only |
/// | [`fetch_paragraph_texts`](CorpusStore::fetch_paragraph_texts) | `(ordinal, text)` for a version |
/// | [`fetch_paragraph_word_counts`](CorpusStore::fetch_paragraph_word_counts) | `(ordinal, n_words)` for a version |
/// | [`fetch_paragraph_text`](CorpusStore::fetch_paragraph_text) | One paragraph's text |
/// | [`fetch_paragraph_vector`](CorpusStore::fetch_paragraph_vector) | One stored vector |
/// | [`fetch_paragraph_vectors`](CorpusStore::fetch_paragraph_vectors) | All stored vectors of a field |
/// | [`upsert_version`](CorpusStore::upsert_version) | Insert or update a version row |
/// | [`replace_paragraphs`](CorpusStore::replace_paragraphs) | Atomically replace a version's paragraphs |
/// | [`write_version`](CorpusStore::write_version) | Upsert a version and replace its paragraphs in one unit |
#[async_trait]
pub trait CorpusStore: Send + Sync {
    async fn list_version_names(&self) -> Result<Vec<String>>;

    async fn fetch_version(&self, version: &str) -> Result<Option<VersionRow>>;

    async fn fetch_raw_text(&self, version: &str) -> Result<Option<String>>;

    /// All `(ordinal, text)` pairs of a version, in no particular order.
    async fn fetch_paragraph_texts(&self, version: &str) -> Result<Vec<(i64, String)>>;

    /// All `(ordinal, n_words)` pairs of a version, in no particular order.
    async fn fetch_paragraph_word_counts(&self, version: &str) -> Result<Vec<(i64, i64)>>;

    async fn fetch_paragraph_text(&self, version: &str, ordinal: i64) -> Result<Option<String>>;

    async fn fetch_paragraph_vector(
        &self,
        version: &str,
        ordinal: i64,
        field: VectorField,
    ) -> Result<Option<StoredVector>>;

    /// All `(ordinal, vector)` pairs of a version for `field`, in no particular order.
    async fn fetch_paragraph_vectors(
        &self,
        version: &str,
        field: VectorField,
    ) -> Result<Vec<(i64, StoredVector)>>;

    async fn upsert_version(&self, row: &VersionRow) -> Result<()>;

    /// Replace every paragraph of `version` with `paragraphs` in one unit.
    async fn replace_paragraphs(&self, version: &str, paragraphs: &[ParagraphRow]) -> Result<()>;

    /// Upsert `row` and replace all of its paragraphs in one unit.
    ///
    /// Either both writes land or neither does; readers never observe the
    /// new version row next to the old (or missing) paragraphs.
    async fn write_version(&self, row: &VersionRow, paragraphs: &[ParagraphRow]) -> Result<()>;
}
