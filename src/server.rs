//! HTTP API for the newsletter dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Answer a question from the newsletter corpus |
//! | `GET`  | `/api/newsletter/months` | List month names |
//! | `GET`  | `/api/newsletter/{month}` | One month's record |
//! | `GET`  | `/api/analytics/overview` | Attendance and APAAR trends |
//! | `GET`  | `/api/admin/stats` | Index statistics |
//! | `GET`  | `/api/health` | Health check |
//! | `GET`  | `/api/llm/status` | Narrative provider status |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "month not found: March 2030" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser dashboard
//! can be served from anywhere.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use newsletter_rag_core::models::{Metric, MonthRecord, Sourced};
use newsletter_rag_core::NewsletterIndex;

use crate::answer::{answer_query, ChatAnswer};
use crate::config::Config;
use crate::llm::{LlmStatus, NarrativeClient};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    index: Arc<NewsletterIndex>,
    narrator: Arc<NarrativeClient>,
}

impl AppState {
    pub fn new(config: Config, index: NewsletterIndex, narrator: NarrativeClient) -> Self {
        Self {
            config: Arc::new(config),
            index: Arc::new(index),
            narrator: Arc::new(narrator),
        }
    }
}

/// Build the router. Split out from [`run_server`] so tests can drive it
/// without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/newsletter/months", get(handle_list_months))
        .route("/api/newsletter/{month}", get(handle_get_month))
        .route("/api/analytics/overview", get(handle_overview))
        .route("/api/admin/stats", get(handle_stats))
        .route("/api/health", get(handle_health))
        .route("/api/llm/status", get(handle_llm_status))
        .layer(cors)
        .with_state(state)
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, index: NewsletterIndex) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let narrator = NarrativeClient::new(&config.llm)?;
    let state = AppState::new(config.clone(), index, narrator);
    let app = router(state);

    tracing::info!("newsletter server listening on http://{}", bind_addr);
    println!("Newsletter server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<ChatAnswer>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    let narrator = state.narrator.is_enabled().then(|| state.narrator.as_ref());
    let answer = answer_query(
        &state.index,
        narrator,
        &req.query,
        state.config.retrieval.top_k,
        state.config.retrieval.context_results,
    )
    .await;
    tracing::debug!(query = %req.query, mode = %answer.mode, "chat answered");
    Ok(Json(answer))
}

// ============ GET /api/newsletter/* ============

#[derive(Serialize)]
struct MonthListResponse {
    months: Vec<String>,
}

async fn handle_list_months(State(state): State<AppState>) -> Json<MonthListResponse> {
    Json(MonthListResponse {
        months: state
            .index
            .list_months()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

async fn handle_get_month(
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> Result<Json<Sourced<MonthRecord>>, AppError> {
    state
        .index
        .get_month(&month)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(format!("month not found: {}", month)))
}

// ============ GET /api/analytics/overview ============

#[derive(Serialize)]
struct AttendancePoint {
    month: String,
    attendance: Option<Metric>,
}

#[derive(Serialize)]
struct ApaarPoint {
    month: String,
    apaar_ids: Option<Metric>,
}

#[derive(Serialize)]
struct OverviewResponse {
    attendance_trend: Vec<AttendancePoint>,
    apaar_trend: Vec<ApaarPoint>,
    /// States reported in the first month, in file order.
    states: Vec<String>,
}

async fn handle_overview(State(state): State<AppState>) -> Json<OverviewResponse> {
    let months = state.index.months();
    Json(OverviewResponse {
        attendance_trend: months
            .iter()
            .map(|m| AttendancePoint {
                month: m.month.clone(),
                attendance: m.attendance_rate.clone(),
            })
            .collect(),
        apaar_trend: months
            .iter()
            .map(|m| ApaarPoint {
                month: m.month.clone(),
                apaar_ids: m.apaar_ids.clone(),
            })
            .collect(),
        states: months
            .first()
            .map(|m| m.states.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default(),
    })
}

// ============ GET /api/admin/stats ============

#[derive(Serialize)]
struct StatsResponse {
    documents_loaded: usize,
    chunks_indexed: usize,
    /// True when queries go through the exact inner-product index.
    faiss_enabled: bool,
    backend: String,
    vocabulary_size: usize,
}

async fn handle_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        documents_loaded: state.index.month_count(),
        chunks_indexed: state.index.chunk_count(),
        faiss_enabled: state.index.using_flat_index(),
        backend: state.index.backend_name().to_string(),
        vocabulary_size: state.index.vocabulary_size(),
    })
}

// ============ GET /api/health, /api/llm/status ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    rag_initialized: bool,
    mode: String,
    version: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        rag_initialized: state.index.is_ready(),
        mode: if state.narrator.is_enabled() {
            "hybrid".to_string()
        } else {
            "rag_only".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_llm_status(State(state): State<AppState>) -> Json<LlmStatus> {
    Json(state.narrator.status())
}
