use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::LibrarianError;
use crate::index::SearchHit;
use crate::librarian::Librarian;

const ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:8501",
];

#[derive(Clone)]
pub struct AppState {
    pub librarian: Arc<Librarian>,
    pub corpus_path: PathBuf,
    pub chat_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
struct BooksResponse {
    books: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    books: usize,
}

/// Error body shaped like `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let origins = ALLOWED_ORIGINS
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/books", get(books))
        .route("/books/reload", post(reload_books))
        .route("/search", get(search))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        message: "Smart Librarian API is running!".to_owned(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        message: "API is operational".to_owned(),
    })
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Message cannot be empty",
        ));
    }

    let request_id = uuid::Uuid::new_v4();
    tracing::info!(%request_id, chars = request.message.chars().count(), "chat request");

    let result = tokio::time::timeout(
        state.chat_timeout,
        state.librarian.recommend(&request.message),
    )
    .await
    .map_err(|_| {
        tracing::warn!(%request_id, timeout = ?state.chat_timeout, "chat request timed out");
        ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
    })?;

    match result {
        Ok(recommendation) => {
            tracing::info!(
                %request_id,
                flagged = recommendation.flagged_inappropriate,
                recommended = recommendation.recommended().len(),
                "chat response"
            );
            Ok(Json(recommendation).into_response())
        }
        Err(LibrarianError::InvalidInput(detail)) => {
            Err(ApiError::new(StatusCode::BAD_REQUEST, detail))
        }
        Err(err) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {err}"),
        )),
    }
}

async fn books(State(state): State<AppState>) -> Json<BooksResponse> {
    Json(BooksResponse {
        books: state.librarian.list_titles().await,
    })
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    if query.query.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Query cannot be empty"));
    }

    let results = state
        .librarian
        .search(&query.query, query.limit)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "search failed");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Search error: {err}"),
            )
        })?;
    Ok(Json(SearchResponse { results }))
}

async fn reload_books(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    match state.librarian.reload_corpus(&state.corpus_path).await {
        Ok(books) => Ok(Json(ReloadResponse { books })),
        Err(err @ LibrarianError::ResourceNotFound { .. }) => {
            Err(ApiError::new(StatusCode::NOT_FOUND, err.to_string()))
        }
        Err(err) => {
            tracing::error!(error = %err, "corpus reload failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Reload error: {err}"),
            ))
        }
    }
}
