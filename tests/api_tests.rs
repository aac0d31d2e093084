use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use movie_similarity::api::{create_router, AppState};
use movie_similarity::config::Config;
use movie_similarity::db::{ArtifactStore, FileArtifactStore};
use movie_similarity::models::CatalogRecord;
use movie_similarity::services::{InMemoryCatalog, IndexBuilder, RecommendationEngine};

fn catalog() -> Vec<CatalogRecord> {
    vec![
        CatalogRecord::new("Alien").with_overview("space horror crew hunted aboard ship"),
        CatalogRecord::new("Aliens").with_overview("space marines hunted by horror"),
        CatalogRecord::new("Ratatouille").with_overview("rat cooking paris restaurant"),
        CatalogRecord::new("Chef").with_overview("cooking food truck restaurant"),
    ]
}

struct Harness {
    server: TestServer,
    engine: Arc<RecommendationEngine>,
    _dir: tempfile::TempDir,
}

fn harness(ready: bool) -> Harness {
    harness_with(catalog(), ready)
}

fn harness_with(records: Vec<CatalogRecord>, ready: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(dir.path()));
    let engine = Arc::new(RecommendationEngine::new());
    if ready {
        engine.install(IndexBuilder::new().build(&records).unwrap());
    }
    let config = Config {
        default_top_n: 2,
        max_top_n: 3,
        ..Config::default()
    };
    let state = AppState::new(
        engine.clone(),
        store,
        Arc::new(InMemoryCatalog::new(records)),
        config,
    );
    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        engine,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_health_check() {
    let h = harness(false);
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reflects_engine_state() {
    let h = harness(false);
    h.server
        .get("/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let h = harness(true);
    let response = h.server.get("/ready").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "ready");
    assert_eq!(body["rows"], 4);
}

#[tokio::test]
async fn test_recommendations_ranked() {
    let h = harness(true);
    let response = h
        .server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Alien")
        .add_query_param("top_n", 3)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["title"], "Alien");
    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 3);
    assert_eq!(recs[0]["title"], "Aliens");
    assert!(recs.iter().all(|r| r["title"] != "Alien"));
}

#[tokio::test]
async fn test_recommendations_default_and_clamped_top_n() {
    let h = harness(true);
    let response = h
        .server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Chef")
        .await;
    let body: Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);

    let response = h
        .server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Chef")
        .add_query_param("top_n", 50)
        .await;
    let body: Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_title_not_found() {
    let h = harness(true);
    let response = h
        .server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Nonexistent")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Nonexistent"));

    // A failed lookup leaves the service ready
    h.server.get("/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_title_matched_verbatim() {
    let h = harness_with(
        vec![
            CatalogRecord::new("Avatar ").with_overview("marine on an alien moon"),
            CatalogRecord::new("Aliens").with_overview("marines fight alien hive"),
        ],
        true,
    );

    let response = h
        .server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Avatar ")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Avatar ");
    assert_eq!(body["recommendations"][0]["title"], "Aliens");

    h.server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Avatar")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_query_parameters() {
    let h = harness(true);
    h.server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Alien")
        .add_query_param("top_n", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    h.server
        .get("/api/v1/recommendations")
        .add_query_param("title", "  ")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations_before_ready() {
    let h = harness(false);
    h.server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Alien")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_reload_without_artifact_is_unavailable() {
    let h = harness(false);
    h.server
        .post("/api/v1/admin/reload")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_rebuild_then_reload() {
    let h = harness(false);

    let response = h.server.post("/api/v1/admin/rebuild").await;
    response.assert_status_ok();
    let built: Value = response.json();
    assert_eq!(built["rows"], 4);

    h.engine.unload();
    let response = h.server.post("/api/v1/admin/reload").await;
    response.assert_status_ok();
    let reloaded: Value = response.json();
    assert_eq!(reloaded["artifact_id"], built["artifact_id"]);

    let response = h.server.get("/api/v1/admin/artifact").await;
    response.assert_status_ok();
    let status: Value = response.json();
    assert_eq!(status["stale"], false);
    assert_eq!(status["manifest"]["artifact_id"], built["artifact_id"]);
}

#[tokio::test]
async fn test_request_id_header_returned() {
    let h = harness(false);
    let response = h.server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}
