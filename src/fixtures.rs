//! Shared test data for the unit tests of the application crate.

use std::sync::Arc;

use corpus_lens_core::models::{ParagraphRow, StoredVector, VersionRow};
use corpus_lens_core::store::memory::InMemoryStore;
use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::vector::encode_vector;

use crate::config::VectorConfig;

pub const EMBEDDING_DIMS: usize = 4;
pub const PROJECTION_DIMS: usize = 2;

pub fn widths() -> VectorConfig {
    VectorConfig {
        embedding_dims: EMBEDDING_DIMS,
        projection_dims: PROJECTION_DIMS,
    }
}

pub fn version_row(name: &str, raw_text: &str, word_set: &str) -> VersionRow {
    VersionRow {
        version_name: name.to_string(),
        author: "Juan Rulfo".to_string(),
        year: 1955,
        editorial: "Fondo de Cultura Económica".to_string(),
        isbn: Some(9786071600295),
        version_data: r#"{"source":"fixture"}"#.to_string(),
        raw_text: raw_text.to_string(),
        n_words: raw_text.split_whitespace().filter(|w| *w != "#").count() as i64,
        n_paragraphs: raw_text.split('#').count() as i64,
        word_set: word_set.to_string(),
    }
}

/// A paragraph whose vectors are derived from its ordinal, so tests can
/// tell rows apart after sorting.
pub fn paragraph(ordinal: i64, text: &str) -> ParagraphRow {
    let base = ordinal as f32;
    ParagraphRow {
        n_paragraph: ordinal,
        text: text.to_string(),
        n_words: text.split_whitespace().count() as i64,
        embedding: encode_vector(&[base, base + 0.5, -base, 1.0]),
        projection: encode_vector(&[base, -0.25]),
    }
}

pub fn with_embedding(mut p: ParagraphRow, embedding: StoredVector) -> ParagraphRow {
    p.embedding = embedding;
    p
}

/// Two versions; the paragraphs of `1955` are written out of ordinal order.
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());

    store
        .upsert_version(&version_row("1955", "El Llano # en llamas", "el#llano#en#llamas"))
        .await
        .unwrap();
    store
        .replace_paragraphs(
            "1955",
            &[
                paragraph(2, "llamas"),
                paragraph(0, "El Llano"),
                paragraph(1, "en"),
            ],
        )
        .await
        .unwrap();

    store
        .upsert_version(&version_row("1969", "Comala # Comala Pedro", "comala#pedro"))
        .await
        .unwrap();
    store
        .replace_paragraphs("1969", &[paragraph(0, "Comala"), paragraph(1, "Comala Pedro")])
        .await
        .unwrap();

    store
}
