use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult, SimilarityError};
use crate::models::{ArtifactManifest, RecommendationResponse};
use crate::services::EngineState;

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub state: EngineState,
    pub artifact_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub rows: usize,
}

#[derive(Debug, Serialize)]
pub struct ArtifactStatusResponse {
    pub manifest: ArtifactManifest,
    /// `None` when the catalog could not be read for comparison
    pub stale: Option<bool>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Readiness: 200 once an artifact is loaded, 503 before
pub async fn ready(State(state): State<AppState>) -> AppResult<Json<ReadyResponse>> {
    let manifest = state.engine.manifest().ok_or(SimilarityError::NotReady)?;
    Ok(Json(ReadyResponse {
        state: state.engine.state(),
        artifact_id: manifest.artifact_id,
        built_at: manifest.built_at,
        rows: manifest.rows,
    }))
}

/// Top-N titles most similar to the query title
pub async fn recommend(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    // Titles are matched exactly as stored; only blank input is rejected
    let title = query.title;
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    let top_n = query.top_n.unwrap_or(state.config.default_top_n);
    if top_n == 0 {
        return Err(SimilarityError::InvalidTopN(top_n).into());
    }
    let top_n = top_n.min(state.config.max_top_n);

    let timeout_ms = state.config.query_timeout_ms;
    let engine = state.engine.clone();
    let query_title = title.clone();
    let task = tokio::task::spawn_blocking(move || engine.try_recommend(&query_title, top_n));

    let recommendations = match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Err(_) => return Err(AppError::Timeout(timeout_ms)),
        Ok(Err(e)) => return Err(AppError::Internal(format!("query task failed: {}", e))),
        Ok(Ok(result)) => result?,
    };

    tracing::info!(title = %title, top_n, returned = recommendations.len(), "Served recommendations");

    Ok(Json(RecommendationResponse {
        title,
        recommendations,
    }))
}

/// Rebuilds the index from the configured catalog and swaps it in
pub async fn rebuild(State(state): State<AppState>) -> AppResult<Json<ArtifactManifest>> {
    tracing::info!(catalog = %state.catalog.describe(), "Rebuild requested");
    let manifest = state
        .engine
        .rebuild(state.catalog.clone(), state.store.as_ref())
        .await?;
    Ok(Json(manifest))
}

/// Reloads the current artifact from the store
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<ArtifactManifest>> {
    let manifest = state.engine.load_from(state.store.as_ref()).await?;
    Ok(Json(manifest))
}

/// Manifest of the loaded artifact and whether the catalog has moved on
pub async fn artifact_status(State(state): State<AppState>) -> AppResult<Json<ArtifactStatusResponse>> {
    let manifest = state.engine.manifest().ok_or(SimilarityError::NotReady)?;

    let catalog = state.catalog.clone();
    let stale = match tokio::task::spawn_blocking(move || catalog.load()).await {
        Ok(Ok(records)) => state.engine.is_stale(&records),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Could not read catalog for staleness check");
            None
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    Ok(Json(ArtifactStatusResponse { manifest, stale }))
}
