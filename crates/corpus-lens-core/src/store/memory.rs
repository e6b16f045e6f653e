//! In-memory [`CorpusStore`] implementation for tests and embedded use.
//!
//! Versions are kept in insertion order behind `std::sync::RwLock`.
//! Paragraphs are returned in the order they were written, which lets tests
//! exercise callers that must sort by ordinal themselves.
//!
//! Individual versions (or the whole store) can be marked as failing to
//! simulate partial outages.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{ParagraphRow, StoredVector, VectorField, VersionRow};

use super::CorpusStore;

#[derive(Default)]
struct Tables {
    versions: Vec<VersionRow>,
    paragraphs: HashMap<String, Vec<ParagraphRow>>,
    failing: HashSet<String>,
    unreachable: bool,
}

/// In-memory store for testing.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read of `version` fail with a store error.
    pub fn fail_version(&self, version: &str) -> Result<()> {
        self.write()?.failing.insert(version.to_string());
        Ok(())
    }

    /// Make every call fail, as if the backing database were down.
    pub fn set_unreachable(&self, unreachable: bool) -> Result<()> {
        self.write()?.unreachable = unreachable;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        if tables.unreachable {
            bail!("store unreachable");
        }
        Ok(tables)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn read_version(&self, version: &str) -> Result<RwLockReadGuard<'_, Tables>> {
        let tables = self.read()?;
        if tables.failing.contains(version) {
            bail!("simulated failure reading version '{}'", version);
        }
        Ok(tables)
    }
}

fn check_unique_ordinals(version: &str, paragraphs: &[ParagraphRow]) -> Result<()> {
    let mut seen = HashSet::new();
    for p in paragraphs {
        if !seen.insert(p.n_paragraph) {
            bail!(
                "duplicate paragraph ordinal {} for version '{}'",
                p.n_paragraph,
                version
            );
        }
    }
    Ok(())
}

fn vector_of(p: &ParagraphRow, field: VectorField) -> &StoredVector {
    match field {
        VectorField::Embedding => &p.embedding,
        VectorField::Projection => &p.projection,
    }
}

#[async_trait]
impl CorpusStore for InMemoryStore {
    async fn list_version_names(&self) -> Result<Vec<String>> {
        let tables = self.read()?;
        Ok(tables
            .versions
            .iter()
            .map(|v| v.version_name.clone())
            .collect())
    }

    async fn fetch_version(&self, version: &str) -> Result<Option<VersionRow>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .versions
            .iter()
            .find(|v| v.version_name == version)
            .cloned())
    }

    async fn fetch_raw_text(&self, version: &str) -> Result<Option<String>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .versions
            .iter()
            .find(|v| v.version_name == version)
            .map(|v| v.raw_text.clone()))
    }

    async fn fetch_paragraph_texts(&self, version: &str) -> Result<Vec<(i64, String)>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .paragraphs
            .get(version)
            .map(|ps| ps.iter().map(|p| (p.n_paragraph, p.text.clone())).collect())
            .unwrap_or_default())
    }

    async fn fetch_paragraph_word_counts(&self, version: &str) -> Result<Vec<(i64, i64)>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .paragraphs
            .get(version)
            .map(|ps| ps.iter().map(|p| (p.n_paragraph, p.n_words)).collect())
            .unwrap_or_default())
    }

    async fn fetch_paragraph_text(&self, version: &str, ordinal: i64) -> Result<Option<String>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .paragraphs
            .get(version)
            .and_then(|ps| ps.iter().find(|p| p.n_paragraph == ordinal))
            .map(|p| p.text.clone()))
    }

    async fn fetch_paragraph_vector(
        &self,
        version: &str,
        ordinal: i64,
        field: VectorField,
    ) -> Result<Option<StoredVector>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .paragraphs
            .get(version)
            .and_then(|ps| ps.iter().find(|p| p.n_paragraph == ordinal))
            .map(|p| vector_of(p, field).clone()))
    }

    async fn fetch_paragraph_vectors(
        &self,
        version: &str,
        field: VectorField,
    ) -> Result<Vec<(i64, StoredVector)>> {
        let tables = self.read_version(version)?;
        Ok(tables
            .paragraphs
            .get(version)
            .map(|ps| {
                ps.iter()
                    .map(|p| (p.n_paragraph, vector_of(p, field).clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_version(&self, row: &VersionRow) -> Result<()> {
        let mut tables = self.write()?;
        match tables
            .versions
            .iter()
            .position(|v| v.version_name == row.version_name)
        {
            Some(i) => tables.versions[i] = row.clone(),
            None => tables.versions.push(row.clone()),
        }
        Ok(())
    }

    async fn replace_paragraphs(&self, version: &str, paragraphs: &[ParagraphRow]) -> Result<()> {
        check_unique_ordinals(version, paragraphs)?;
        let mut tables = self.write()?;
        tables
            .paragraphs
            .insert(version.to_string(), paragraphs.to_vec());
        Ok(())
    }

    async fn write_version(&self, row: &VersionRow, paragraphs: &[ParagraphRow]) -> Result<()> {
        check_unique_ordinals(&row.version_name, paragraphs)?;
        let mut tables = self.write()?;
        match tables
            .versions
            .iter()
            .position(|v| v.version_name == row.version_name)
        {
            Some(i) => tables.versions[i] = row.clone(),
            None => tables.versions.push(row.clone()),
        }
        tables
            .paragraphs
            .insert(row.version_name.clone(), paragraphs.to_vec());
        Ok(())
    }
}
