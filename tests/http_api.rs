//! HTTP surface tests against a real SQLite file, driven through the
//! router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use corpus_lens::cache::CorpusCache;
use corpus_lens::config::{parse_config, Config};
use corpus_lens::db;
use corpus_lens::dispatch::Dispatcher;
use corpus_lens::ingest::{ingest_document, IngestDocument};
use corpus_lens::migrate;
use corpus_lens::server::{build_router, AppState};
use corpus_lens::sqlite_store::SqliteStore;
use corpus_lens_core::models::{StoredVector, VectorField, VersionRow};
use corpus_lens_core::store::CorpusStore;

const EDITION: &str = r#"{
    "version_name": "1955",
    "author": "Juan Rulfo",
    "year": 1955,
    "editorial": "FCE",
    "metadata": "primera edición",
    "raw_text": "El Llano # en llamas",
    "paragraphs": [
        {"n_paragraph": 1, "text": "en llamas", "embedding": [1, 1, 1, 1], "projection": [1, -1]},
        {"n_paragraph": 0, "text": "El Llano", "embedding": [0, 0, 0, 0], "projection": [0, -1]}
    ]
}"#;

/// Legacy rows store vectors as text literals; ordinal 2 is malformed.
const LEGACY_VECTORS: [(i64, &str); 5] = [
    (4, "[4.0, 4.0, 4.0, 4.0]"),
    (0, "[0.0, 0.0, 0.0, 0.0]"),
    (2, "[2.0, nope, 2.0, 2.0]"),
    (1, "(1.0 1.0 1.0 1.0)"),
    (3, "[3.0, 3.0, 3.0, 3.0]"),
];

struct TestEnv {
    _tmp: TempDir,
    config: Config,
    store: Arc<SqliteStore>,
}

async fn setup() -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let config = parse_config(&format!(
        "[db]\npath = \"{}/corpus.sqlite\"\n[vectors]\nembedding_dims = 4\nprojection_dims = 2\n",
        tmp.path().display()
    ))
    .unwrap();
    migrate::run_migrations(&config).await.unwrap();
    let store = Arc::new(db::open_store(&config).await.unwrap());

    let doc: IngestDocument = serde_json::from_str(EDITION).unwrap();
    ingest_document(&*store, config.vectors, &doc)
        .await
        .unwrap();

    store
        .upsert_version(&VersionRow {
            version_name: "legacy".into(),
            author: "Anónimo".into(),
            year: 1900,
            editorial: "Sin editorial".into(),
            isbn: None,
            version_data: "{}".into(),
            raw_text: "a # b # c # d # e".into(),
            n_words: 5,
            n_paragraphs: 5,
            word_set: "a#b#c#d#e".into(),
        })
        .await
        .unwrap();
    for (ordinal, literal) in LEGACY_VECTORS {
        sqlx::query(
            "INSERT INTO paragraphs (version_name, n_paragraph, text, n_words, embedding, projection)
             VALUES ('legacy', ?, ?, 1, ?, '[0.0, 0.0]')",
        )
        .bind(ordinal)
        .bind(format!("paragraph {}", ordinal))
        .bind(literal)
        .execute(store.pool())
        .await
        .unwrap();
    }

    TestEnv {
        _tmp: tmp,
        config,
        store,
    }
}

async fn router_with(env: &TestEnv, shutdown: CancellationToken) -> Router {
    let store: Arc<dyn CorpusStore> = env.store.clone();
    let cache = CorpusCache::warm(Arc::clone(&store), 2).await;
    let dispatcher = Dispatcher::new(cache, store, env.config.vectors);
    build_router(AppState::new(dispatcher, Duration::from_secs(5), shutdown))
}

async fn router(env: &TestEnv) -> Router {
    router_with(env, CancellationToken::new()).await
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, Method::GET, uri).await
}

#[tokio::test]
async fn test_health_and_versions() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&app, "/versions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["versions"], serde_json::json!(["1955", "legacy"]));
    assert_eq!(body["failed"], serde_json::json!([]));
}

#[tokio::test]
async fn test_operations_catalog() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/operations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["parameterized"].as_array().unwrap().len(), 3);
    assert!(body["derived"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("word_freq")));
}

#[tokio::test]
async fn test_generic_attribute() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/1955/metadata").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "1955");
    assert_eq!(body["metadata"], "primera edición");

    let (_, body) = get(&app, "/1955/n_words").await;
    assert_eq!(body["n_words"], 4);
}

#[tokio::test]
async fn test_unknown_version_is_404() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/ZZZ/author").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_unknown_operation_is_404() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/1955/__dict__").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_parameterized_at_generic_route_is_400() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/1955/n_paragraph").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_paragraph_route() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/1955/n_paragraph/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_paragraph"], "en llamas");

    let (status, body) = get(&app, "/1955/n_paragraph_umap/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_paragraph_umap"], serde_json::json!([0.0, -1.0]));

    let (status, _) = get(&app, "/1955/n_paragraph/9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/1955/n_paragraph/-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/1955/n_paragraph/first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/1955/word_freq/0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_malformed_row_is_skipped() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/legacy/all_embeddings").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["all_embeddings"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    let firsts: Vec<f64> = rows.iter().map(|r| r[0].as_f64().unwrap()).collect();
    assert_eq!(firsts, vec![0.0, 1.0, 3.0, 4.0]);
}

#[tokio::test]
async fn test_single_malformed_vector_is_500() {
    let env = setup().await;
    let app = router(&env).await;

    let (status, body) = get(&app, "/legacy/n_paragraph_embedding/2").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "internal");

    let (status, body) = get(&app, "/legacy/n_paragraph_embedding/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_paragraph_embedding"], serde_json::json!([1.0, 1.0, 1.0, 1.0]));
}

#[tokio::test]
async fn test_word_freq_over_http_keeps_order() {
    let env = setup().await;
    let app = router(&env).await;

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/1955/int_to_word").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        r#"{"version":"1955","int_to_word":{"0":"el","1":"llano","2":"en","3":"llamas"}}"#
    );
}

#[tokio::test]
async fn test_reload_picks_up_new_versions() {
    let env = setup().await;
    let app = router(&env).await;

    let mut doc: IngestDocument = serde_json::from_str(EDITION).unwrap();
    doc.version_name = "1980".into();
    ingest_document(&*env.store, env.config.vectors, &doc)
        .await
        .unwrap();

    let (status, _) = get(&app, "/1980/author").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::POST, "/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loaded"], 3);

    let (status, body) = get(&app, "/1980/author").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"], "Juan Rulfo");
}

#[tokio::test]
async fn test_shutdown_cancels_vector_scans() {
    let env = setup().await;
    let shutdown = CancellationToken::new();
    let app = router_with(&env, shutdown.clone()).await;
    shutdown.cancel();

    let (status, body) = get(&app, "/1955/all_embeddings").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"]["code"], "timeout");
}

#[tokio::test]
async fn test_sqlite_store_reads_both_encodings() {
    let env = setup().await;
    let store = &*env.store;

    let binary = store
        .fetch_paragraph_vector("1955", 1, VectorField::Embedding)
        .await
        .unwrap();
    assert!(matches!(binary, Some(StoredVector::Binary(ref b)) if b.len() == 16));

    let text = store
        .fetch_paragraph_vector("legacy", 3, VectorField::Embedding)
        .await
        .unwrap();
    assert_eq!(text, Some(StoredVector::Text("[3.0, 3.0, 3.0, 3.0]".into())));

    let all = store
        .fetch_paragraph_vectors("legacy", VectorField::Projection)
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn test_sqlite_upsert_replaces_row() {
    let env = setup().await;
    let mut doc: IngestDocument = serde_json::from_str(EDITION).unwrap();
    doc.author = "J. Rulfo".into();
    doc.paragraphs.truncate(1);
    ingest_document(&*env.store, env.config.vectors, &doc)
        .await
        .unwrap();

    assert_eq!(env.store.list_version_names().await.unwrap(), vec!["1955", "legacy"]);
    let row = env.store.fetch_version("1955").await.unwrap().unwrap();
    assert_eq!(row.author, "J. Rulfo");
    assert_eq!(row.n_paragraphs, 1);
    let texts = env.store.fetch_paragraph_texts("1955").await.unwrap();
    assert_eq!(texts, vec![(1, "en llamas".to_string())]);
}

#[tokio::test]
async fn test_failed_paragraph_write_leaves_version_untouched() {
    let env = setup().await;
    sqlx::query(
        "CREATE TRIGGER reject_paragraphs BEFORE INSERT ON paragraphs
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(env.store.pool())
    .await
    .unwrap();

    // Re-ingesting an existing version rolls back the version row too.
    let mut doc: IngestDocument = serde_json::from_str(EDITION).unwrap();
    doc.author = "J. Rulfo".into();
    doc.paragraphs.truncate(1);
    let err = ingest_document(&*env.store, env.config.vectors, &doc)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("disk full"));

    let row = env.store.fetch_version("1955").await.unwrap().unwrap();
    assert_eq!(row.author, "Juan Rulfo");
    assert_eq!(row.n_paragraphs, 2);
    assert_eq!(env.store.fetch_paragraph_texts("1955").await.unwrap().len(), 2);

    // A new version leaves no row behind.
    doc.version_name = "1980".into();
    assert!(ingest_document(&*env.store, env.config.vectors, &doc)
        .await
        .is_err());
    assert!(env.store.fetch_version("1980").await.unwrap().is_none());
    assert_eq!(
        env.store.list_version_names().await.unwrap(),
        vec!["1955", "legacy"]
    );
}
