//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/corpus.sqlite"
//!
//! [vectors]
//! embedding_dims = 768
//! projection_dims = 3
//!
//! [cache]
//! warmup_concurrency = 4
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! request_timeout_secs = 30
//! ```
//!
//! Only `[db]` is required; every other section falls back to defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use corpus_lens_core::models::VectorField;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub vectors: VectorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Fixed widths of the per-paragraph vector columns.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct VectorConfig {
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    #[serde(default = "default_projection_dims")]
    pub projection_dims: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            embedding_dims: default_embedding_dims(),
            projection_dims: default_projection_dims(),
        }
    }
}

impl VectorConfig {
    pub fn width(&self, field: VectorField) -> usize {
        match field {
            VectorField::Embedding => self.embedding_dims,
            VectorField::Projection => self.projection_dims,
        }
    }
}

fn default_embedding_dims() -> usize {
    768
}
fn default_projection_dims() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Versions loaded in parallel during warm-up.
    #[serde(default = "default_warmup_concurrency")]
    pub warmup_concurrency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            warmup_concurrency: default_warmup_concurrency(),
        }
    }
}

fn default_warmup_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// Parse and validate a configuration string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.vectors.embedding_dims == 0 {
        anyhow::bail!("vectors.embedding_dims must be > 0");
    }
    if config.vectors.projection_dims == 0 {
        anyhow::bail!("vectors.projection_dims must be > 0");
    }
    if config.cache.warmup_concurrency == 0 {
        anyhow::bail!("cache.warmup_concurrency must be > 0");
    }
    if config.server.request_timeout_secs == 0 {
        anyhow::bail!("server.request_timeout_secs must be > 0");
    }
    Ok(())
}
