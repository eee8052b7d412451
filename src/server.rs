/*!
 * HTTP upload endpoint.
 *
 * `POST /api/analyse` takes a multipart form with a `file` field holding a PDF
 * and answers with the analysis result as JSON. Uploads stay in memory.
 */

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::app_config::ServerConfig;
use crate::document::{is_pdf_filename, Document};
use crate::errors::AnalysisError;
use crate::pipeline::{AnalysisPipeline, AnalysisResult};

/// Message for rejected non-PDF uploads
pub const NOT_A_PDF_MESSAGE: &str = "Nur PDF-Dateien akzeptiert";

/// Message for uploads over the configured size limit
pub const TOO_LARGE_MESSAGE: &str = "Datei ist zu groß";

/// Message for uploads that are not a readable multipart form
pub const MALFORMED_UPLOAD_MESSAGE: &str = "Upload konnte nicht gelesen werden";

/// Name of the multipart field carrying the document
pub const FILE_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<AnalysisPipeline>,
}

/// Error body returned to clients: `{ "error": <kind>, "detail": <message> }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "bad_request".to_string(),
            detail: detail.into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        let status = error.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            info!("Rejected upload over the size limit");
            Self {
                status,
                error: "payload_too_large".to_string(),
                detail: TOO_LARGE_MESSAGE.to_string(),
            }
        } else {
            warn!("Unreadable multipart upload: {}", error);
            Self::bad_request(MALFORMED_UPLOAD_MESSAGE)
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(error: AnalysisError) -> Self {
        Self {
            status: StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            error: error.kind().to_string(),
            detail: error.public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.error, "detail": self.detail }));
        (self.status, body).into_response()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the router
pub fn router(pipeline: Arc<AnalysisPipeline>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/analyse", post(analyse_upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .with_state(AppState { pipeline })
}

/// Serve until the process is stopped
pub async fn serve(pipeline: Arc<AnalysisPipeline>, config: &ServerConfig) -> Result<()> {
    let app = router(pipeline, config);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    info!("Listening on http://{}", config.bind_address);
    axum::serve(listener, app).await.context("HTTP server failed")
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn analyse_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let mut document = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_pdf_filename(&filename) {
            info!("Rejected upload '{}': not a PDF", filename);
            return Err(ApiError::bad_request(NOT_A_PDF_MESSAGE));
        }

        let bytes = field.bytes().await?;
        document = Some(Document::new(filename, bytes));
        break;
    }

    let document = document.ok_or_else(|| ApiError::bad_request("Feld 'file' fehlt"))?;
    let result = state.pipeline.analyse(&document).await?;
    Ok(Json(result))
}
