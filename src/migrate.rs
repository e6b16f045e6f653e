//! Schema creation for the `versions` and `paragraphs` relations.
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so `corpus init` can be
//! re-run safely against an existing database.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_name TEXT NOT NULL UNIQUE,
            author TEXT NOT NULL,
            year INTEGER NOT NULL,
            editorial TEXT NOT NULL,
            isbn INTEGER,
            version_data TEXT NOT NULL DEFAULT '{}',
            raw_text TEXT NOT NULL,
            n_words INTEGER NOT NULL,
            n_paragraphs INTEGER NOT NULL,
            word_set TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Vector columns hold either little-endian f32 BLOBs or legacy TEXT literals.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS paragraphs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_name TEXT NOT NULL,
            n_paragraph INTEGER NOT NULL CHECK (n_paragraph >= 0),
            text TEXT NOT NULL,
            n_words INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            projection BLOB NOT NULL,
            UNIQUE(version_name, n_paragraph)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_paragraphs_version ON paragraphs(version_name, n_paragraph)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
