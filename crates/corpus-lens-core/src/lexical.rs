//! Lexical frequency engine.
//!
//! Turns raw corpus text into tokens, a deterministic [`FrequencyTable`], and
//! a [`WordCodec`] mapping vocabulary words to dense integer ranks.
//!
//! # Algorithm
//!
//! 1. Split on the literal `#` paragraph marker and on whitespace.
//! 2. Lowercase each token (full Unicode mapping).
//! 3. Keep only characters whose general category is a Letter (`L*`) or one
//!    of the apostrophes `'`, `’`, `` ` ``.
//! 4. Drop tokens that end up empty.
//! 5. Count, then stable-sort by count descending so ties keep first-seen order.
//!
//! # Example
//!
//! ```rust
//! use corpus_lens_core::lexical::{frequency_table, tokenize, word_codec};
//!
//! let tokens = tokenize("El Llano # en llamas").unwrap();
//! assert_eq!(tokens, vec!["el", "llano", "en", "llamas"]);
//!
//! let table = frequency_table(&tokens);
//! let codec = word_codec(&table);
//! assert_eq!(codec.encode("llano"), Some(1));
//! assert_eq!(codec.decode(3), Some("llamas"));
//! ```

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use unicode_general_category::{get_general_category, GeneralCategory};

use crate::error::{CorpusError, CorpusResult};

/// Apostrophe variants kept inside words (`don't`, `d’Artagnan`).
const APOSTROPHES: [char; 3] = ['\'', '\u{2019}', '`'];

/// Paragraph delimiter used in stored raw text.
const PARAGRAPH_MARKER: char = '#';

fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

/// Lowercase a token and strip everything except letters and apostrophes.
///
/// Lowercasing happens first so that case mappings which expand into
/// combining marks (e.g. `İ` → `i̇`) lose the mark in the filter step.
pub fn clean_token(token: &str) -> String {
    token
        .to_lowercase()
        .chars()
        .filter(|&c| is_letter(c) || APOSTROPHES.contains(&c))
        .collect()
}

/// Tokenize raw corpus text.
///
/// Returns [`CorpusError::EmptyCorpus`] when no token survives cleaning.
pub fn tokenize(raw_text: &str) -> CorpusResult<Vec<String>> {
    let tokens: Vec<String> = raw_text
        .split(|c: char| c == PARAGRAPH_MARKER || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(clean_token)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err(CorpusError::EmptyCorpus);
    }
    Ok(tokens)
}

/// Word → count mapping ordered by descending count.
///
/// Ties are broken by first-encountered order, so two tables built from the
/// same token sequence always iterate identically.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    /// Count tokens and order them by (count desc, first-seen asc).
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<(String, u64)> = Vec::new();

        for token in tokens {
            let word = token.as_ref();
            match position.get(word) {
                Some(&i) => entries[i].1 += 1,
                None => {
                    position.insert(word, entries.len());
                    entries.push((word.to_string(), 1));
                }
            }
        }

        // `sort_by` is stable: equal counts keep first-seen order.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(w, c)| (w.as_str(), *c))
    }

    pub fn words(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(w, _)| w.as_str())
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(w, _)| w == word)
            .map(|(_, c)| *c)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts; equals the token count the table was built from.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (word, count) in &self.entries {
            map.serialize_entry(word, count)?;
        }
        map.end()
    }
}

/// Build a frequency table from a token sequence.
pub fn frequency_table<S: AsRef<str>>(tokens: &[S]) -> FrequencyTable {
    FrequencyTable::from_tokens(tokens)
}

/// Bijection between vocabulary words and ranks `0..N`.
///
/// Ranks follow the iteration order of the [`FrequencyTable`] it was built
/// from: rank 0 is the most frequent word.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordCodec {
    words: Vec<String>,
    ranks: HashMap<String, usize>,
}

impl WordCodec {
    pub fn from_table(table: &FrequencyTable) -> Self {
        let words: Vec<String> = table.words().map(str::to_string).collect();
        let ranks = words
            .iter()
            .enumerate()
            .map(|(rank, w)| (w.clone(), rank))
            .collect();
        Self { words, ranks }
    }

    /// Rank of `word`, or `None` if it is not in the vocabulary.
    pub fn encode(&self, word: &str) -> Option<usize> {
        self.ranks.get(word).copied()
    }

    /// Word at `rank`, or `None` if the rank is out of range.
    pub fn decode(&self, rank: usize) -> Option<&str> {
        self.words.get(rank).map(String::as_str)
    }

    /// Vocabulary in rank order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Derive the word codec for a frequency table.
pub fn word_codec(table: &FrequencyTable) -> WordCodec {
    WordCodec::from_table(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llano_scenario() {
        let tokens = tokenize("El Llano # en llamas").unwrap();
        assert_eq!(tokens, vec!["el", "llano", "en", "llamas"]);

        let table = frequency_table(&tokens);
        assert!(table.iter().all(|(_, c)| c == 1));

        let codec = word_codec(&table);
        assert_eq!(codec.len(), 4);
        for (rank, word) in ["el", "llano", "en", "llamas"].iter().enumerate() {
            assert_eq!(codec.encode(word), Some(rank));
        }
    }

    #[test]
    fn test_strips_punctuation_and_digits() {
        let tokens = tokenize("¡Vine a Comala, 1955!").unwrap();
        assert_eq!(tokens, vec!["vine", "a", "comala"]);
    }

    #[test]
    fn test_keeps_apostrophe_variants() {
        let tokens = tokenize("Don't d’Artagnan `quoted").unwrap();
        assert_eq!(tokens, vec!["don't", "d’artagnan", "`quoted"]);
    }

    #[test]
    fn test_unicode_letters_survive() {
        let tokens = tokenize("ÑANDÚ Straße Ωμέγα 漢字").unwrap();
        assert_eq!(tokens, vec!["ñandú", "straße", "ωμέγα", "漢字"]);
    }

    #[test]
    fn test_combining_mark_from_lowercase_is_dropped() {
        assert_eq!(clean_token("İzmir"), "izmir");
    }

    #[test]
    fn test_tokens_emptied_by_cleaning_are_dropped() {
        let tokens = tokenize("uno -- 42 ... dos").unwrap();
        assert_eq!(tokens, vec!["uno", "dos"]);
    }

    #[test]
    fn test_splits_on_any_whitespace_and_marker() {
        let tokens = tokenize("uno\tdos\nTRES#cuatro##  cinco").unwrap();
        assert_eq!(tokens, vec!["uno", "dos", "tres", "cuatro", "cinco"]);
    }

    #[test]
    fn test_empty_corpus() {
        assert!(matches!(tokenize(""), Err(CorpusError::EmptyCorpus)));
        assert!(matches!(
            tokenize("# 123 ... ##"),
            Err(CorpusError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_frequency_sorted_desc_with_first_seen_ties() {
        let tokens = tokenize("b a c a b d a").unwrap();
        let table = frequency_table(&tokens);
        let order: Vec<(&str, u64)> = table.iter().collect();
        assert_eq!(order, vec![("a", 3), ("b", 2), ("c", 1), ("d", 1)]);
    }

    #[test]
    fn test_tie_break_follows_encounter_not_alphabet() {
        let tokens = tokenize("zeta alfa zeta alfa mu").unwrap();
        let table = frequency_table(&tokens);
        let words: Vec<&str> = table.words().collect();
        assert_eq!(words, vec!["zeta", "alfa", "mu"]);
    }

    #[test]
    fn test_sum_of_counts_equals_token_count() {
        let text = "Yo creo que ya me voy # yo creo que no # que que que";
        let tokens = tokenize(text).unwrap();
        let table = frequency_table(&tokens);
        assert_eq!(table.total(), tokens.len() as u64);
        assert_eq!(table.get("que"), Some(5));
        assert_eq!(table.get("ausente"), None);
    }

    #[test]
    fn test_codec_is_bijection() {
        let tokens = tokenize("la luna la noche el río la luna").unwrap();
        let table = frequency_table(&tokens);
        let codec = word_codec(&table);

        for word in table.words() {
            let rank = codec.encode(word).unwrap();
            assert_eq!(codec.decode(rank), Some(word));
        }
        for rank in 0..codec.len() {
            let word = codec.decode(rank).unwrap();
            assert_eq!(codec.encode(word), Some(rank));
        }
        assert_eq!(codec.decode(codec.len()), None);
        assert_eq!(codec.encode("sol"), None);
    }

    #[test]
    fn test_table_serializes_in_iteration_order() {
        let tokens = tokenize("zeta alfa zeta").unwrap();
        let table = frequency_table(&tokens);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"zeta":2,"alfa":1}"#);
    }

    #[test]
    fn test_deterministic_rebuild() {
        let tokens = tokenize("c b a c b a x").unwrap();
        assert_eq!(frequency_table(&tokens), frequency_table(&tokens));
        assert_eq!(
            word_codec(&frequency_table(&tokens)).words(),
            &["c", "b", "a", "x"]
        );
    }
}
