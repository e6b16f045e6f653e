//! Core data models shared by the store adapters, the corpus cache and the
//! request dispatcher.
//!
//! Rows ([`VersionRow`], [`ParagraphRow`]) mirror the persistent schema.
//! [`CorpusRecord`] is the immutable per-version snapshot held by the cache.

use std::fmt;

use serde::Serialize;

/// Separator used to persist the ordered word set as a single column.
pub const WORD_SET_SEPARATOR: char = '#';

/// Which per-paragraph vector column an operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorField {
    /// Fixed-width semantic embedding.
    Embedding,
    /// Fixed-width low-dimensional projection (e.g. UMAP coordinates).
    Projection,
}

impl VectorField {
    /// Column name in the `paragraphs` relation.
    pub fn column(self) -> &'static str {
        match self {
            VectorField::Embedding => "embedding",
            VectorField::Projection => "projection",
        }
    }
}

impl fmt::Display for VectorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A vector as it sits in the store, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredVector {
    /// Canonical encoding: little-endian `f32` bytes.
    Binary(Vec<u8>),
    /// Legacy textual literal such as `[0.1, -2, 3e-4]`.
    Text(String),
}

/// One row of the `versions` relation.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRow {
    pub version_name: String,
    pub author: String,
    pub year: i64,
    pub editorial: String,
    pub isbn: Option<i64>,
    /// Free-form metadata blob recorded at ingestion.
    pub version_data: String,
    pub raw_text: String,
    /// Word count recorded at ingestion time.
    pub n_words: i64,
    pub n_paragraphs: i64,
    /// Ordered word set, joined with [`WORD_SET_SEPARATOR`].
    pub word_set: String,
}

/// One row of the `paragraphs` relation for a given version.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphRow {
    pub n_paragraph: i64,
    pub text: String,
    pub n_words: i64,
    pub embedding: StoredVector,
    pub projection: StoredVector,
}

/// Immutable snapshot of one corpus version.
///
/// Built once from a [`VersionRow`] during cache warm-up and shared behind
/// an `Arc` for the lifetime of the cache snapshot. `n_words` is the value
/// recorded at ingestion and is never recomputed from `text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusRecord {
    pub version: String,
    pub author: String,
    pub year: i64,
    pub editorial: String,
    pub isbn: Option<i64>,
    pub metadata: String,
    pub text: String,
    pub n_words: i64,
    pub n_paragraphs: i64,
    pub word_set: Vec<String>,
}

impl From<VersionRow> for CorpusRecord {
    fn from(row: VersionRow) -> Self {
        let word_set = split_word_set(&row.word_set);
        Self {
            version: row.version_name,
            author: row.author,
            year: row.year,
            editorial: row.editorial,
            isbn: row.isbn,
            metadata: row.version_data,
            text: row.raw_text,
            n_words: row.n_words,
            n_paragraphs: row.n_paragraphs,
            word_set,
        }
    }
}

/// Split a persisted word set into its ordered entries, dropping empties.
pub fn split_word_set(joined: &str) -> Vec<String> {
    joined
        .split(WORD_SET_SEPARATOR)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join word-set entries for persistence, keeping their order.
pub fn join_word_set<S: AsRef<str>>(words: &[S]) -> String {
    let mut joined = String::new();
    for (i, w) in words.iter().enumerate() {
        if i > 0 {
            joined.push(WORD_SET_SEPARATOR);
        }
        joined.push_str(w.as_ref());
    }
    joined
}
