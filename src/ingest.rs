//! Corpus ingestion from JSON documents.
//!
//! One document describes one version and all of its paragraphs:
//!
//! ```json
//! {
//!   "version_name": "1955",
//!   "author": "Juan Rulfo",
//!   "year": 1955,
//!   "editorial": "FCE",
//!   "isbn": 9786071600295,
//!   "metadata": {"source": "first edition"},
//!   "raw_text": "Vine a Comala # porque me dijeron",
//!   "word_set": ["vine", "a", "comala"],
//!   "paragraphs": [
//!     {"n_paragraph": 0, "text": "Vine a Comala", "embedding": [0.1, 0.2], "projection": [1.0, 2.0, 3.0]}
//!   ]
//! }
//! ```
//!
//! `isbn` and `word_set` are optional. Word counts are computed here from
//! the tokenizer and stored, so reads never recount. Vectors are written
//! in the binary encoding.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use corpus_lens_core::lexical::tokenize;
use corpus_lens_core::models::{join_word_set, split_word_set, ParagraphRow, VersionRow};
use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::vector::encode_vector;
use corpus_lens_core::{CorpusError, CorpusResult};

use crate::config::{Config, VectorConfig};
use crate::db;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestDocument {
    pub version_name: String,
    pub author: String,
    pub year: i64,
    pub editorial: String,
    #[serde(default)]
    pub isbn: Option<i64>,
    /// Any JSON value; strings are stored verbatim, everything else as JSON text.
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub raw_text: String,
    #[serde(default)]
    pub word_set: Option<Vec<String>>,
    #[serde(default)]
    pub paragraphs: Vec<IngestParagraph>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestParagraph {
    pub n_paragraph: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub projection: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub version: String,
    pub n_words: i64,
    pub n_paragraphs: i64,
    pub vocabulary: usize,
}

fn metadata_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "{}".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Distinct entries of `words`, first occurrence first.
fn ordered_unique<S: AsRef<str>>(words: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    words
        .iter()
        .map(|w| w.as_ref())
        .filter(|w| !w.is_empty() && seen.insert(*w))
        .collect()
}

/// Normalize explicit word-set entries with the same tokenizer as the raw
/// text, so no stored word contains the separator or whitespace.
fn explicit_words(entries: &[String]) -> CorpusResult<Vec<String>> {
    let mut words = Vec::with_capacity(entries.len());
    for entry in entries {
        match tokenize(entry) {
            Ok(tokens) => words.extend(tokens),
            Err(CorpusError::EmptyCorpus) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(words)
}

fn word_count(text: &str) -> CorpusResult<i64> {
    match tokenize(text) {
        Ok(tokens) => Ok(tokens.len() as i64),
        Err(CorpusError::EmptyCorpus) => Ok(0),
        Err(e) => Err(e),
    }
}

fn check_width(
    version: &str,
    ordinal: i64,
    field: &str,
    values: &[f32],
    expected: usize,
) -> CorpusResult<()> {
    if values.len() != expected {
        return Err(CorpusError::Validation(format!(
            "version '{version}' paragraph {ordinal}: {field} has {} values, expected {expected}",
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CorpusError::Validation(format!(
            "version '{version}' paragraph {ordinal}: {field} contains a non-finite value"
        )));
    }
    Ok(())
}

/// Validate a document and turn it into store rows.
pub fn build_rows(
    doc: &IngestDocument,
    widths: VectorConfig,
) -> CorpusResult<(VersionRow, Vec<ParagraphRow>)> {
    let version = doc.version_name.trim();
    if version.is_empty() {
        return Err(CorpusError::Validation("version_name must not be empty".into()));
    }
    if version.contains('/') {
        return Err(CorpusError::Validation(format!(
            "version_name '{version}' must not contain '/'"
        )));
    }

    let tokens = tokenize(&doc.raw_text)?;
    let word_set = match &doc.word_set {
        Some(explicit) => join_word_set(&ordered_unique(&explicit_words(explicit)?)),
        None => join_word_set(&ordered_unique(&tokens)),
    };

    let mut seen = HashSet::new();
    let mut paragraphs = Vec::with_capacity(doc.paragraphs.len());
    for p in &doc.paragraphs {
        if p.n_paragraph < 0 {
            return Err(CorpusError::Validation(format!(
                "version '{version}': paragraph ordinal {} is negative",
                p.n_paragraph
            )));
        }
        if !seen.insert(p.n_paragraph) {
            return Err(CorpusError::Validation(format!(
                "version '{version}': duplicate paragraph ordinal {}",
                p.n_paragraph
            )));
        }
        check_width(version, p.n_paragraph, "embedding", &p.embedding, widths.embedding_dims)?;
        check_width(version, p.n_paragraph, "projection", &p.projection, widths.projection_dims)?;

        paragraphs.push(ParagraphRow {
            n_paragraph: p.n_paragraph,
            text: p.text.clone(),
            n_words: word_count(&p.text)?,
            embedding: encode_vector(&p.embedding),
            projection: encode_vector(&p.projection),
        });
    }

    let row = VersionRow {
        version_name: version.to_string(),
        author: doc.author.clone(),
        year: doc.year,
        editorial: doc.editorial.clone(),
        isbn: doc.isbn,
        version_data: metadata_text(&doc.metadata),
        raw_text: doc.raw_text.clone(),
        n_words: tokens.len() as i64,
        n_paragraphs: paragraphs.len() as i64,
        word_set,
    };
    Ok((row, paragraphs))
}

/// Write one document: the version row and its paragraphs land together or
/// not at all.
pub async fn ingest_document(
    store: &dyn CorpusStore,
    widths: VectorConfig,
    doc: &IngestDocument,
) -> CorpusResult<IngestSummary> {
    let (row, paragraphs) = build_rows(doc, widths)?;
    let vocabulary = split_word_set(&row.word_set).len();

    store.write_version(&row, &paragraphs).await?;

    info!(
        version = %row.version_name,
        n_words = row.n_words,
        n_paragraphs = row.n_paragraphs,
        "ingested version"
    );
    Ok(IngestSummary {
        version: row.version_name,
        n_words: row.n_words,
        n_paragraphs: row.n_paragraphs,
        vocabulary,
    })
}

pub fn read_document(path: &Path) -> Result<IngestDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ingest file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse ingest file: {}", path.display()))
}

/// `corpus ingest <file>`.
pub async fn ingest_file(config: &Config, path: &Path) -> Result<IngestSummary> {
    let doc = read_document(path)?;
    let store = db::open_store(config).await?;
    let summary = ingest_document(&store, config.vectors, &doc).await?;
    store.pool().close().await;

    println!("ingest {}", path.display());
    println!("  version: {}", summary.version);
    println!("  words: {}", summary.n_words);
    println!("  vocabulary: {}", summary.vocabulary);
    println!("  paragraphs: {}", summary.n_paragraphs);
    Ok(summary)
}
