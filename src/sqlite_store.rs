//! SQLite-backed [`CorpusStore`] implementation.
//!
//! Every method runs inside its own short transaction opened with
//! `pool.begin()`. The transaction is committed on success; on any early
//! return (query error, decode error) it is dropped, which rolls it back and
//! returns the connection to the pool. [`CorpusStore::write_version`] runs
//! the version upsert and the paragraph replacement in one transaction.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

use corpus_lens_core::models::{ParagraphRow, StoredVector, VectorField, VersionRow};
use corpus_lens_core::store::CorpusStore;

/// SQLite implementation of the [`CorpusStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Select list that splits a vector column by storage class, so BLOBs and
/// legacy TEXT literals decode without a type mismatch.
fn vector_columns(field: VectorField) -> String {
    let col = field.column();
    format!(
        "CASE WHEN typeof({col}) = 'blob' THEN {col} END AS vector_blob, \
         CASE WHEN typeof({col}) = 'blob' THEN NULL ELSE CAST({col} AS TEXT) END AS vector_text"
    )
}

fn stored_vector(row: &SqliteRow) -> Result<StoredVector> {
    if let Some(bytes) = row.try_get::<Option<Vec<u8>>, _>("vector_blob")? {
        return Ok(StoredVector::Binary(bytes));
    }
    let text: Option<String> = row.try_get("vector_text")?;
    Ok(StoredVector::Text(text.unwrap_or_default()))
}

fn bind_vector<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    vector: &'q StoredVector,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match vector {
        StoredVector::Binary(bytes) => query.bind(bytes.as_slice()),
        StoredVector::Text(literal) => query.bind(literal.as_str()),
    }
}

fn version_row(row: &SqliteRow) -> Result<VersionRow> {
    Ok(VersionRow {
        version_name: row.try_get("version_name")?,
        author: row.try_get("author")?,
        year: row.try_get("year")?,
        editorial: row.try_get("editorial")?,
        isbn: row.try_get("isbn")?,
        version_data: row.try_get("version_data")?,
        raw_text: row.try_get("raw_text")?,
        n_words: row.try_get("n_words")?,
        n_paragraphs: row.try_get("n_paragraphs")?,
        word_set: row.try_get("word_set")?,
    })
}

async fn upsert_version_row(conn: &mut SqliteConnection, row: &VersionRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO versions (version_name, author, year, editorial, isbn,
                              version_data, raw_text, n_words, n_paragraphs, word_set)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(version_name) DO UPDATE SET
            author = excluded.author,
            year = excluded.year,
            editorial = excluded.editorial,
            isbn = excluded.isbn,
            version_data = excluded.version_data,
            raw_text = excluded.raw_text,
            n_words = excluded.n_words,
            n_paragraphs = excluded.n_paragraphs,
            word_set = excluded.word_set
        "#,
    )
    .bind(&row.version_name)
    .bind(&row.author)
    .bind(row.year)
    .bind(&row.editorial)
    .bind(row.isbn)
    .bind(&row.version_data)
    .bind(&row.raw_text)
    .bind(row.n_words)
    .bind(row.n_paragraphs)
    .bind(&row.word_set)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Delete every paragraph of `version` and insert `paragraphs`. Callers own
/// the surrounding transaction.
async fn replace_paragraph_rows(
    conn: &mut SqliteConnection,
    version: &str,
    paragraphs: &[ParagraphRow],
) -> Result<()> {
    sqlx::query("DELETE FROM paragraphs WHERE version_name = ?")
        .bind(version)
        .execute(&mut *conn)
        .await?;

    for p in paragraphs {
        let query = sqlx::query(
            r#"
            INSERT INTO paragraphs (version_name, n_paragraph, text, n_words, embedding, projection)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(version)
        .bind(p.n_paragraph)
        .bind(&p.text)
        .bind(p.n_words);
        let query = bind_vector(query, &p.embedding);
        let query = bind_vector(query, &p.projection);
        query.execute(&mut *conn).await?;
    }
    Ok(())
}

#[async_trait]
impl CorpusStore for SqliteStore {
    async fn list_version_names(&self) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;
        let names: Vec<String> =
            sqlx::query_scalar("SELECT version_name FROM versions ORDER BY version_name")
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(names)
    }

    async fn fetch_version(&self, version: &str) -> Result<Option<VersionRow>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT version_name, author, year, editorial, isbn, version_data,
                   raw_text, n_words, n_paragraphs, word_set
            FROM versions
            WHERE version_name = ?
            "#,
        )
        .bind(version)
        .fetch_optional(&mut *tx)
        .await?;
        let parsed = row.as_ref().map(version_row).transpose()?;
        tx.commit().await?;
        Ok(parsed)
    }

    async fn fetch_raw_text(&self, version: &str) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await?;
        let text: Option<String> =
            sqlx::query_scalar("SELECT raw_text FROM versions WHERE version_name = ?")
                .bind(version)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(text)
    }

    async fn fetch_paragraph_texts(&self, version: &str) -> Result<Vec<(i64, String)>> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT n_paragraph, text FROM paragraphs WHERE version_name = ?")
                .bind(version)
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn fetch_paragraph_word_counts(&self, version: &str) -> Result<Vec<(i64, i64)>> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT n_paragraph, n_words FROM paragraphs WHERE version_name = ?")
                .bind(version)
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn fetch_paragraph_text(&self, version: &str, ordinal: i64) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await?;
        let text: Option<String> = sqlx::query_scalar(
            "SELECT text FROM paragraphs WHERE version_name = ? AND n_paragraph = ?",
        )
        .bind(version)
        .bind(ordinal)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(text)
    }

    async fn fetch_paragraph_vector(
        &self,
        version: &str,
        ordinal: i64,
        field: VectorField,
    ) -> Result<Option<StoredVector>> {
        let sql = format!(
            "SELECT {} FROM paragraphs WHERE version_name = ? AND n_paragraph = ?",
            vector_columns(field)
        );
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&sql)
            .bind(version)
            .bind(ordinal)
            .fetch_optional(&mut *tx)
            .await?;
        let vector = row.as_ref().map(stored_vector).transpose()?;
        tx.commit().await?;
        Ok(vector)
    }

    async fn fetch_paragraph_vectors(
        &self,
        version: &str,
        field: VectorField,
    ) -> Result<Vec<(i64, StoredVector)>> {
        // No ORDER BY: ordering is the accessor's job, not the store's.
        let sql = format!(
            "SELECT n_paragraph, {} FROM paragraphs WHERE version_name = ?",
            vector_columns(field)
        );
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(&sql)
            .bind(version)
            .fetch_all(&mut *tx)
            .await?;
        let mut vectors = Vec::with_capacity(rows.len());
        for row in &rows {
            let ordinal: i64 = row.try_get("n_paragraph")?;
            vectors.push((ordinal, stored_vector(row)?));
        }
        tx.commit().await?;
        Ok(vectors)
    }

    async fn upsert_version(&self, row: &VersionRow) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_version_row(&mut tx, row).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_paragraphs(&self, version: &str, paragraphs: &[ParagraphRow]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        replace_paragraph_rows(&mut tx, version, paragraphs).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn write_version(&self, row: &VersionRow, paragraphs: &[ParagraphRow]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_version_row(&mut tx, row).await?;
        replace_paragraph_rows(&mut tx, &row.version_name, paragraphs).await?;
        tx.commit().await?;
        Ok(())
    }
}
