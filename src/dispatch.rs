//! Allow-listed request dispatch.
//!
//! Every operation a client may name is listed in one of three disjoint
//! tables:
//!
//! | Table | Input | Source |
//! |-------|-------|--------|
//! | [`Attribute`] | version | fields of the cached [`CorpusRecord`] |
//! | [`Derived`] | version | recomputed from the store on every call |
//! | [`Parameterized`] | version + paragraph ordinal | one paragraph from the store |
//!
//! A name in none of the tables is `OperationNotFound` (404). A
//! parameterized name reached without an ordinal is a `Validation` error
//! (400) pointing the caller at the paragraph route.
//!
//! Results are wrapped in an [`Envelope`] that serializes as
//! `{"version": ..., "<operation>": <result>}`. Ordered maps keep their
//! iteration order in the JSON output.

use std::sync::Arc;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use corpus_lens_core::lexical::{word_codec, FrequencyTable, WordCodec};
use corpus_lens_core::models::{CorpusRecord, VectorField};
use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::vector::EmbeddingMatrix;
use corpus_lens_core::{CorpusError, CorpusResult};

use crate::cache::CorpusCache;
use crate::config::VectorConfig;
use crate::embedding::EmbeddingAccessor;
use crate::frequencies::word_frequencies;
use crate::paragraphs::{all_paragraphs, paragraph_text, paragraph_word_counts, OrdinalMap};

/// Fields copied straight from the cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Author,
    Year,
    Editorial,
    Isbn,
    Metadata,
    Text,
    NWords,
    NParagraphs,
    WordSet,
}

impl Attribute {
    pub const ALL: [Attribute; 9] = [
        Attribute::Author,
        Attribute::Year,
        Attribute::Editorial,
        Attribute::Isbn,
        Attribute::Metadata,
        Attribute::Text,
        Attribute::NWords,
        Attribute::NParagraphs,
        Attribute::WordSet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Author => "author",
            Attribute::Year => "year",
            Attribute::Editorial => "editorial",
            Attribute::Isbn => "ISBN",
            Attribute::Metadata => "metadata",
            Attribute::Text => "text",
            Attribute::NWords => "n_words",
            Attribute::NParagraphs => "n_paragraphs",
            Attribute::WordSet => "word_set",
        }
    }

    fn read(self, record: &CorpusRecord) -> OperationOutput {
        match self {
            Attribute::Author => OperationOutput::Text(record.author.clone()),
            Attribute::Year => OperationOutput::Integer(record.year),
            Attribute::Editorial => OperationOutput::Text(record.editorial.clone()),
            Attribute::Isbn => OperationOutput::MaybeInteger(record.isbn),
            Attribute::Metadata => OperationOutput::Text(record.metadata.clone()),
            Attribute::Text => OperationOutput::Text(record.text.clone()),
            Attribute::NWords => OperationOutput::Integer(record.n_words),
            Attribute::NParagraphs => OperationOutput::Integer(record.n_paragraphs),
            Attribute::WordSet => OperationOutput::Words(record.word_set.clone()),
        }
    }
}

/// Zero-argument operations recomputed from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derived {
    WordFreq,
    IntToWord,
    WordToInt,
    AllParagraphs,
    AllEmbeddings,
    AllUmap,
    ParagraphWordCounts,
}

impl Derived {
    pub const ALL: [Derived; 7] = [
        Derived::WordFreq,
        Derived::IntToWord,
        Derived::WordToInt,
        Derived::AllParagraphs,
        Derived::AllEmbeddings,
        Derived::AllUmap,
        Derived::ParagraphWordCounts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Derived::WordFreq => "word_freq",
            Derived::IntToWord => "int_to_word",
            Derived::WordToInt => "word_to_int",
            Derived::AllParagraphs => "all_paragraphs",
            Derived::AllEmbeddings => "all_embeddings",
            Derived::AllUmap => "all_umap",
            Derived::ParagraphWordCounts => "paragraph_word_counts",
        }
    }
}

/// Operations that need a paragraph ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameterized {
    NParagraph,
    NParagraphEmbedding,
    NParagraphUmap,
}

impl Parameterized {
    pub const ALL: [Parameterized; 3] = [
        Parameterized::NParagraph,
        Parameterized::NParagraphEmbedding,
        Parameterized::NParagraphUmap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameterized::NParagraph => "n_paragraph",
            Parameterized::NParagraphEmbedding => "n_paragraph_embedding",
            Parameterized::NParagraphUmap => "n_paragraph_umap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Attribute(Attribute),
    Derived(Derived),
    Parameterized(Parameterized),
}

impl Operation {
    /// Find `name` in the allow-lists. Names are case-sensitive.
    pub fn lookup(name: &str) -> Option<Operation> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .map(Operation::Attribute)
            .or_else(|| {
                Derived::ALL
                    .into_iter()
                    .find(|d| d.name() == name)
                    .map(Operation::Derived)
            })
            .or_else(|| {
                Parameterized::ALL
                    .into_iter()
                    .find(|p| p.name() == name)
                    .map(Operation::Parameterized)
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Attribute(a) => a.name(),
            Operation::Derived(d) => d.name(),
            Operation::Parameterized(p) => p.name(),
        }
    }
}

/// The three allow-lists, for discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationCatalog {
    pub attributes: Vec<&'static str>,
    pub derived: Vec<&'static str>,
    pub parameterized: Vec<&'static str>,
}

pub fn list_operations() -> OperationCatalog {
    OperationCatalog {
        attributes: Attribute::ALL.iter().map(|a| a.name()).collect(),
        derived: Derived::ALL.iter().map(|d| d.name()).collect(),
        parameterized: Parameterized::ALL.iter().map(|p| p.name()).collect(),
    }
}

/// Typed result of one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    Text(String),
    Integer(i64),
    MaybeInteger(Option<i64>),
    Words(Vec<String>),
    Frequencies(FrequencyTable),
    /// `word -> rank`, in rank order.
    WordToRank(WordCodec),
    /// `rank -> word`, in rank order.
    RankToWord(WordCodec),
    Paragraphs(OrdinalMap<String>),
    WordCounts(OrdinalMap<i64>),
    Matrix(EmbeddingMatrix),
    Vector(Vec<f32>),
}

impl Serialize for OperationOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OperationOutput::Text(s) => serializer.serialize_str(s),
            OperationOutput::Integer(n) => serializer.serialize_i64(*n),
            OperationOutput::MaybeInteger(n) => n.serialize(serializer),
            OperationOutput::Words(words) => words.serialize(serializer),
            OperationOutput::Frequencies(table) => table.serialize(serializer),
            OperationOutput::WordToRank(codec) => {
                let mut map = serializer.serialize_map(Some(codec.len()))?;
                for (rank, word) in codec.words().iter().enumerate() {
                    map.serialize_entry(word, &rank)?;
                }
                map.end()
            }
            OperationOutput::RankToWord(codec) => {
                let mut map = serializer.serialize_map(Some(codec.len()))?;
                for (rank, word) in codec.words().iter().enumerate() {
                    map.serialize_entry(&rank, word)?;
                }
                map.end()
            }
            OperationOutput::Paragraphs(map) => map.serialize(serializer),
            OperationOutput::WordCounts(map) => map.serialize(serializer),
            OperationOutput::Matrix(matrix) => matrix.serialize(serializer),
            OperationOutput::Vector(values) => values.serialize(serializer),
        }
    }
}

/// Response wrapper: `{"version": ..., ["paragraph": n,] "<operation>": result}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub version: String,
    pub operation: &'static str,
    pub paragraph: Option<i64>,
    pub output: OperationOutput,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.paragraph.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("version", &self.version)?;
        if let Some(ordinal) = self.paragraph {
            map.serialize_entry("paragraph", &ordinal)?;
        }
        map.serialize_entry(self.operation, &self.output)?;
        map.end()
    }
}

/// Resolves `(version, operation)` requests against the cache and store.
///
/// Holds no per-request state; clones share the same cache.
#[derive(Clone)]
pub struct Dispatcher {
    cache: CorpusCache,
    store: Arc<dyn CorpusStore>,
    embeddings: EmbeddingAccessor,
}

impl Dispatcher {
    pub fn new(cache: CorpusCache, store: Arc<dyn CorpusStore>, widths: VectorConfig) -> Self {
        let embeddings = EmbeddingAccessor::new(Arc::clone(&store), widths);
        Self {
            cache,
            store,
            embeddings,
        }
    }

    pub fn cache(&self) -> &CorpusCache {
        &self.cache
    }

    fn record(&self, version: &str) -> CorpusResult<Arc<CorpusRecord>> {
        self.cache
            .get(version)
            .ok_or_else(|| CorpusError::VersionNotFound(version.to_string()))
    }

    /// Generic entry point: attributes and derived operations.
    pub async fn resolve(
        &self,
        version: &str,
        operation: &str,
        cancel: &CancellationToken,
    ) -> CorpusResult<Envelope> {
        let record = self.record(version)?;
        let op = Operation::lookup(operation)
            .ok_or_else(|| CorpusError::OperationNotFound(operation.to_string()))?;
        debug!(version, operation, "dispatching");

        let output = match op {
            Operation::Attribute(attribute) => attribute.read(&record),
            Operation::Derived(derived) => self.derive(derived, version, cancel).await?,
            Operation::Parameterized(p) => {
                return Err(CorpusError::Validation(format!(
                    "operation '{}' requires a paragraph ordinal; use /{}/{}/{{ordinal}}",
                    p.name(),
                    version,
                    p.name()
                )))
            }
        };

        Ok(Envelope {
            version: version.to_string(),
            operation: op.name(),
            paragraph: None,
            output,
        })
    }

    /// Paragraph entry point: parameterized operations only.
    pub async fn resolve_paragraph(
        &self,
        version: &str,
        operation: &str,
        ordinal: i64,
        cancel: &CancellationToken,
    ) -> CorpusResult<Envelope> {
        self.record(version)?;
        let op = match Operation::lookup(operation) {
            Some(Operation::Parameterized(p)) => p,
            Some(other) => {
                return Err(CorpusError::Validation(format!(
                    "operation '{}' does not take a paragraph ordinal; use /{}/{}",
                    other.name(),
                    version,
                    other.name()
                )))
            }
            None => return Err(CorpusError::OperationNotFound(operation.to_string())),
        };
        if ordinal < 0 {
            return Err(CorpusError::Validation(format!(
                "paragraph ordinal must be >= 0, got {ordinal}"
            )));
        }
        if cancel.is_cancelled() {
            return Err(CorpusError::Cancelled);
        }
        debug!(version, operation, ordinal, "dispatching paragraph operation");

        let output = match op {
            Parameterized::NParagraph => {
                OperationOutput::Text(paragraph_text(self.store.as_ref(), version, ordinal).await?)
            }
            Parameterized::NParagraphEmbedding => OperationOutput::Vector(
                self.embeddings
                    .fetch_vector(version, ordinal, VectorField::Embedding)
                    .await?,
            ),
            Parameterized::NParagraphUmap => OperationOutput::Vector(
                self.embeddings
                    .fetch_vector(version, ordinal, VectorField::Projection)
                    .await?,
            ),
        };

        Ok(Envelope {
            version: version.to_string(),
            operation: op.name(),
            paragraph: Some(ordinal),
            output,
        })
    }

    async fn derive(
        &self,
        derived: Derived,
        version: &str,
        cancel: &CancellationToken,
    ) -> CorpusResult<OperationOutput> {
        if cancel.is_cancelled() {
            return Err(CorpusError::Cancelled);
        }
        let store = self.store.as_ref();
        Ok(match derived {
            Derived::WordFreq => OperationOutput::Frequencies(word_frequencies(store, version).await?),
            Derived::WordToInt => {
                let table = word_frequencies(store, version).await?;
                OperationOutput::WordToRank(word_codec(&table))
            }
            Derived::IntToWord => {
                let table = word_frequencies(store, version).await?;
                OperationOutput::RankToWord(word_codec(&table))
            }
            Derived::AllParagraphs => OperationOutput::Paragraphs(all_paragraphs(store, version).await?),
            Derived::ParagraphWordCounts => {
                OperationOutput::WordCounts(paragraph_word_counts(store, version).await?)
            }
            Derived::AllEmbeddings => OperationOutput::Matrix(
                self.embeddings
                    .fetch_all_vectors(version, VectorField::Embedding, cancel)
                    .await?
                    .matrix,
            ),
            Derived::AllUmap => OperationOutput::Matrix(
                self.embeddings
                    .fetch_all_vectors(version, VectorField::Projection, cancel)
                    .await?
                    .matrix,
            ),
        })
    }
}
