//! # Corpus Lens CLI (`corpus`)
//!
//! ## Usage
//!
//! ```bash
//! corpus --config ./config/corpus.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `corpus init` | Create the SQLite database and schema |
//! | `corpus ingest <file>` | Load one version from a JSON document |
//! | `corpus versions` | List stored versions |
//! | `corpus get <version> <operation>` | Resolve one operation and print the JSON envelope |
//! | `corpus serve` | Warm the cache and start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! corpus get 1955 author
//! corpus get 1955 n_paragraph_umap --paragraph 12
//! RUST_LOG=corpus_lens=debug corpus serve
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use corpus_lens::{config, get, ingest, migrate, registry, server};

/// Corpus Lens CLI: lexical and embedding statistics for versioned text
/// corpora.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/corpus.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "corpus",
    about = "Corpus Lens: lexical and embedding statistics for versioned text corpora",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/corpus.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file with the `versions` and
    /// `paragraphs` tables. Safe to run repeatedly.
    Init,

    /// Ingest one corpus version from a JSON document.
    ///
    /// Replaces the version's row and all of its paragraphs if it already
    /// exists.
    Ingest {
        /// Path to the JSON document.
        file: PathBuf,
    },

    /// List stored versions.
    Versions,

    /// Resolve one operation and print the JSON envelope.
    Get {
        /// Version identifier.
        version: String,
        /// Operation name (see `GET /operations`).
        operation: String,
        /// Paragraph ordinal, for `n_paragraph`, `n_paragraph_embedding`
        /// and `n_paragraph_umap`.
        #[arg(long)]
        paragraph: Option<i64>,
    },

    /// Warm the corpus cache and start the HTTP server.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file } => {
            ingest::ingest_file(&cfg, &file).await?;
        }
        Commands::Versions => {
            registry::run_versions(&cfg).await?;
        }
        Commands::Get {
            version,
            operation,
            paragraph,
        } => {
            get::run_get(&cfg, &version, &operation, paragraph).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
