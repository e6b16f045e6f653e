//! Embedding accessor.
//!
//! Reads per-paragraph vectors (`embedding` or `projection`) from the store
//! and decodes them into fixed-width `f32` rows.
//!
//! Batch reads sort by ordinal before decoding, whatever order the store
//! returned. Rows that fail to decode are logged and skipped; the call only
//! fails when no row at all survives. Long scans honour a
//! [`CancellationToken`] between rows and yield to the runtime every
//! [`YIELD_EVERY`] rows.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use corpus_lens_core::models::VectorField;
use corpus_lens_core::store::CorpusStore;
use corpus_lens_core::vector::{parse_vector, EmbeddingMatrix};
use corpus_lens_core::{CorpusError, CorpusResult};

use crate::config::VectorConfig;

/// Rows decoded between cooperative yields during a batch scan.
pub const YIELD_EVERY: usize = 256;

/// A row left out of a batch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub ordinal: i64,
    pub reason: String,
}

/// Result of [`EmbeddingAccessor::fetch_all_vectors`].
#[derive(Debug, Clone)]
pub struct VectorScan {
    pub matrix: EmbeddingMatrix,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Clone)]
pub struct EmbeddingAccessor {
    store: Arc<dyn CorpusStore>,
    widths: VectorConfig,
}

impl EmbeddingAccessor {
    pub fn new(store: Arc<dyn CorpusStore>, widths: VectorConfig) -> Self {
        Self { store, widths }
    }

    pub fn widths(&self) -> VectorConfig {
        self.widths
    }

    /// Decode one paragraph's vector.
    pub async fn fetch_vector(
        &self,
        version: &str,
        ordinal: i64,
        field: VectorField,
    ) -> CorpusResult<Vec<f32>> {
        let stored = self
            .store
            .fetch_paragraph_vector(version, ordinal, field)
            .await?
            .ok_or_else(|| CorpusError::ParagraphNotFound {
                version: version.to_string(),
                ordinal,
            })?;

        parse_vector(&stored, self.widths.width(field)).map_err(|e| CorpusError::Parse {
            version: version.to_string(),
            ordinal,
            field,
            reason: e.to_string(),
        })
    }

    /// Decode every paragraph's vector into a matrix ordered by ordinal.
    pub async fn fetch_all_vectors(
        &self,
        version: &str,
        field: VectorField,
        cancel: &CancellationToken,
    ) -> CorpusResult<VectorScan> {
        if cancel.is_cancelled() {
            return Err(CorpusError::Cancelled);
        }

        let mut rows = self.store.fetch_paragraph_vectors(version, field).await?;
        rows.sort_by_key(|(ordinal, _)| *ordinal);

        let width = self.widths.width(field);
        let mut matrix = EmbeddingMatrix::new(field, width);
        let mut skipped = Vec::new();

        for (i, (ordinal, stored)) in rows.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(version, %field, scanned = i, "vector scan cancelled");
                return Err(CorpusError::Cancelled);
            }
            if i > 0 && i % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }

            let reason = match parse_vector(stored, width) {
                Ok(values) => {
                    if matrix.push(*ordinal, values) {
                        continue;
                    }
                    "duplicate ordinal".to_string()
                }
                Err(e) => e.to_string(),
            };
            let err = CorpusError::Parse {
                version: version.to_string(),
                ordinal: *ordinal,
                field,
                reason: reason.clone(),
            };
            warn!(error = %err, "skipping paragraph vector");
            skipped.push(SkippedRow {
                ordinal: *ordinal,
                reason,
            });
        }

        if matrix.is_empty() {
            return Err(CorpusError::NoData {
                version: version.to_string(),
                field,
            });
        }

        Ok(VectorScan { matrix, skipped })
    }
}
