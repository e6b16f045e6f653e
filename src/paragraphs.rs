//! Paragraph-level lookups: texts, word counts and single paragraphs.

use serde::ser::{Serialize, SerializeMap, Serializer};

use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::{CorpusError, CorpusResult};

/// `ordinal -> value` pairs in ascending ordinal order.
///
/// Serializes as a JSON object keyed by the ordinal, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinalMap<T> {
    entries: Vec<(i64, T)>,
}

impl<T> OrdinalMap<T> {
    pub fn from_unordered(mut entries: Vec<(i64, T)>) -> Self {
        entries.sort_by_key(|(ordinal, _)| *ordinal);
        Self { entries }
    }

    pub fn entries(&self) -> &[(i64, T)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Serialize> Serialize for OrdinalMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ordinal, value) in &self.entries {
            map.serialize_entry(ordinal, value)?;
        }
        map.end()
    }
}

pub async fn all_paragraphs(store: &dyn CorpusStore, version: &str) -> CorpusResult<OrdinalMap<String>> {
    let rows = store.fetch_paragraph_texts(version).await?;
    Ok(OrdinalMap::from_unordered(rows))
}

pub async fn paragraph_word_counts(
    store: &dyn CorpusStore,
    version: &str,
) -> CorpusResult<OrdinalMap<i64>> {
    let rows = store.fetch_paragraph_word_counts(version).await?;
    Ok(OrdinalMap::from_unordered(rows))
}

pub async fn paragraph_text(store: &dyn CorpusStore, version: &str, ordinal: i64) -> CorpusResult<String> {
    store
        .fetch_paragraph_text(version, ordinal)
        .await?
        .ok_or_else(|| CorpusError::ParagraphNotFound {
            version: version.to_string(),
            ordinal,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seeded_store;

    #[tokio::test]
    async fn test_all_paragraphs_sorted() {
        let store = seeded_store().await;
        let map = all_paragraphs(&*store, "1955").await.unwrap();

        let ordinals: Vec<i64> = map.entries().iter().map(|(o, _)| *o).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"0":"El Llano","1":"en","2":"llamas"}"#
        );
    }

    #[tokio::test]
    async fn test_word_counts() {
        let store = seeded_store().await;
        let map = paragraph_word_counts(&*store, "1969").await.unwrap();
        assert_eq!(map.entries(), [(0, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn test_single_paragraph() {
        let store = seeded_store().await;
        assert_eq!(paragraph_text(&*store, "1955", 2).await.unwrap(), "llamas");

        let err = paragraph_text(&*store, "1955", 40).await.unwrap_err();
        assert_eq!(err.status_class().http_status(), 404);
    }
}
