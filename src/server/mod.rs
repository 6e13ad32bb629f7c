//! HTTP boundary: thin adapters over the core contracts.
//!
//! Routes:
//! - `GET  /` health check
//! - `GET  /documents/search?query=&top_k=` ranked chunks
//! - `POST /documents/answer` generative answer
//! - `POST /documents/upload` multipart PDF ingestion
//! - `POST /documents/load` bulk-load pre-embedded chunks
//! - `POST /uploads/sign` presigned upload URL
//!
//! Responses never expose internal error detail; failures are logged
//! server-side and surfaced as a generic message with the right status code.

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::context::AppContext;
use crate::datastore::{DataStoreError, ScoredChunk};
use crate::documents::DocumentChunk;
use crate::generation::GenerationError;
use crate::ingest::{IngestReport, NamedFile};
use crate::objectstore::SignerError;
use crate::retrieve::RetrieveError;

/// Default number of results when the caller does not say.
const DEFAULT_TOP_K: usize = 3;

/// Multipart uploads carry whole PDFs.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error(transparent)]
    DataStore(#[from] DataStoreError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl ServerError {
    /// Status code plus the message the client is allowed to see.
    fn response_parts(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Multipart(_) => (
                StatusCode::BAD_REQUEST,
                "malformed multipart request".to_string(),
            ),
            Self::DataStore(DataStoreError::InvalidTopK)
            | Self::Retrieve(RetrieveError::DataStore(DataStoreError::InvalidTopK)) => (
                StatusCode::BAD_REQUEST,
                "top_k must be at least 1".to_string(),
            ),
            Self::DataStore(DataStoreError::Dimension { expected, actual }) => (
                StatusCode::BAD_REQUEST,
                format!("embedding dimension mismatch: expected {expected}, got {actual}"),
            ),
            Self::Retrieve(RetrieveError::Generation(GenerationError::Disabled))
            | Self::Signer(SignerError::Config(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server configuration error".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "request failed".to_string(),
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.response_parts();
        if status.is_server_error() {
            tracing::error!(target: "server", "{self}");
        } else {
            tracing::debug!(target: "server", "{self}");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Build the router over a shared context.
pub fn app(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/documents/search", get(search_documents))
        .route("/documents/answer", post(answer_question))
        .route("/documents/upload", post(upload_documents))
        .route("/documents/load", post(load_chunks))
        .route("/uploads/sign", post(sign_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(context)
}

/// Bind and serve until the process is stopped.
pub async fn serve(context: Arc<AppContext>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(target: "server", "listening on {bind}");
    axum::serve(listener, app(context)).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<u64>,
}

async fn health(State(context): State<Arc<AppContext>>) -> Json<HealthResponse> {
    // The banner stays up even when the store is unreachable; the count is
    // informational.
    let chunks = context.datastore.count().await.ok();
    Json(HealthResponse {
        message: "sara retrieval service is running",
        chunks,
    })
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ScoredChunk>,
}

async fn search_documents(
    State(context): State<Arc<AppContext>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServerError> {
    if params.query.trim().is_empty() {
        return Err(ServerError::BadRequest("query must not be empty".to_string()));
    }
    let top_k = params.top_k.unwrap_or(DEFAULT_TOP_K);

    let results = context.query_engine().search(&params.query, top_k).await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Deserialize)]
struct AnswerRequest {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

async fn answer_question(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ServerError> {
    if request.query.trim().is_empty() {
        return Err(ServerError::BadRequest("query must not be empty".to_string()));
    }
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);

    let answer = context.query_engine().answer(&request.query, top_k).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn upload_documents(
    State(context): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, ServerError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        files.push(NamedFile {
            name,
            bytes: bytes.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(ServerError::BadRequest(
            "no files in multipart request".to_string(),
        ));
    }

    let report = context.ingest_pipeline().ingest_files(files).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
struct LoadResponse {
    status: &'static str,
    loaded: usize,
}

async fn load_chunks(
    State(context): State<Arc<AppContext>>,
    Json(chunks): Json<Vec<DocumentChunk>>,
) -> Result<Json<LoadResponse>, ServerError> {
    if chunks.iter().any(|c| c.content.is_empty()) {
        return Err(ServerError::BadRequest(
            "chunk content must not be empty".to_string(),
        ));
    }

    let loaded = chunks.len();
    context.datastore.add(&chunks).await?;
    Ok(Json(LoadResponse {
        status: "ok",
        loaded,
    }))
}

#[derive(Deserialize)]
struct SignRequest {
    file_name: String,
}

#[derive(Serialize)]
struct SignResponse {
    signed_url: String,
}

async fn sign_upload(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<SignRequest>,
) -> Result<Json<SignResponse>, ServerError> {
    if request.file_name.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "file_name is required".to_string(),
        ));
    }

    let signer = context.signer.as_ref().ok_or_else(|| {
        SignerError::Config("uploads.bucket and credentials are not set".to_string())
    })?;

    let signed_url = signer.signed_upload_url(&request.file_name)?;
    Ok(Json(SignResponse { signed_url }))
}
