//! # Corpus Lens Core
//!
//! Shared, runtime-free logic for Corpus Lens: corpus data models, the
//! error taxonomy, the lexical frequency engine, the paragraph vector codec,
//! and the [`store::CorpusStore`] contract.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Concrete store
//! adapters, the corpus cache, and the HTTP surface live in the
//! `corpus-lens` application crate.

pub mod error;
pub mod lexical;
pub mod models;
pub mod store;
pub mod vector;

pub use error::{CorpusError, CorpusResult, StatusClass};
