//! # Corpus Lens
//!
//! Lexical and embedding statistics for versioned text corpora (editions of
//! a book, translations, revisions), served from a warm in-memory cache.
//!
//! Each corpus version is ingested once into SQLite: metadata, raw text,
//! an ordered word set, and per-paragraph text with an embedding and a
//! low-dimensional projection vector. At startup every version is loaded
//! into an immutable [`cache::CacheSnapshot`]; requests then name a version
//! and an allow-listed operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────────┐
//! │  ingest  │──▶│  SQLite  │──▶│ corpus cache  │
//! │  (JSON)  │   │  store   │   │  (snapshot)   │
//! └──────────┘   └────┬─────┘   └──────┬────────┘
//!                     │                │
//!                     ▼                ▼
//!               ┌──────────────────────────┐
//!               │ dispatcher (allow-lists) │
//!               └────────────┬─────────────┘
//!                    ┌───────┴───────┐
//!                    ▼               ▼
//!               ┌─────────┐     ┌─────────┐
//!               │   CLI   │     │  HTTP   │
//!               │(corpus) │     │ (axum)  │
//!               └─────────┘     └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! corpus init                       # create database
//! corpus ingest pedro-paramo.json   # load one version
//! corpus versions                   # list what is stored
//! corpus get 1955 word_freq         # one operation, printed as JSON
//! corpus serve                      # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the store contract |
//! | [`registry`] | Version listing |
//! | [`cache`] | Immutable per-version snapshots with atomic reload |
//! | [`frequencies`] | Per-request frequency tables and word codecs |
//! | [`paragraphs`] | Paragraph texts and word counts |
//! | [`embedding`] | Embedding and projection matrices |
//! | [`dispatch`] | Allow-listed operation dispatch |
//! | [`ingest`] | JSON ingestion |
//! | [`get`] | One-shot lookups for the CLI |
//! | [`server`] | HTTP server |

pub mod cache;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod embedding;
pub mod frequencies;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod paragraphs;
pub mod registry;
pub mod server;
pub mod sqlite_store;

#[cfg(test)]
mod fixtures;
