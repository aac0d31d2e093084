use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures of the similarity engine, from catalog loading through query time
#[derive(thiserror::Error, Debug)]
pub enum SimilarityError {
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Empty vocabulary: no indexable terms in {documents} document(s)")]
    EmptyVocabulary { documents: usize },

    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Unknown title: {0}")]
    UnknownTitle(String),

    #[error("Engine not ready: no artifact loaded")]
    NotReady,

    #[error("Invalid top_n: {0} (must be at least 1)")]
    InvalidTopN(usize),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<redis::RedisError> for SimilarityError {
    fn from(err: redis::RedisError) -> Self {
        SimilarityError::Storage(err.to_string())
    }
}

pub type SimilarityResult<T> = Result<T, SimilarityError>;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Similarity(err) => match err {
                SimilarityError::UnknownTitle(_) => StatusCode::NOT_FOUND,
                SimilarityError::InvalidTopN(_) => StatusCode::BAD_REQUEST,
                SimilarityError::NotReady
                | SimilarityError::ArtifactMissing(_)
                | SimilarityError::ArtifactCorrupt(_) => StatusCode::SERVICE_UNAVAILABLE,
                SimilarityError::CatalogUnavailable(_) | SimilarityError::EmptyVocabulary { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SimilarityError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
