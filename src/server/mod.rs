//! HTTP surface: `POST /analyze` and `GET /health`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analysis::Analyzer;
use crate::config::ServerConfig;
use crate::types::AnalysisResponse;

/// Multipart field name accepted even when the part carries no file name.
const FILE_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    analyzer: Arc<Analyzer>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    pitch_backend: &'static str,
}

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

impl Upload {
    fn extension(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
    }
}

/// Build the router with CORS, tracing and the upload limit applied.
pub fn make_app(analyzer: Arc<Analyzer>, config: &ServerConfig) -> Result<Router> {
    let state = AppState { analyzer };
    let cors = cors_layer(&config.allowed_origins)?;

    Ok(Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub async fn run_server(analyzer: Analyzer, config: ServerConfig) -> Result<()> {
    let app = make_app(Arc::new(analyzer), &config)?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "raagalyzer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")
}

/// Browsers reject `*` alongside credentials, so methods and headers are
/// mirrored from the preflight instead.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("invalid CORS origin {origin:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        pitch_backend: state.analyzer.pitch_backend(),
    })
}

async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<AnalysisResponse> {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            warn!(%message, "rejected upload");
            return Json(AnalysisResponse::error(message));
        }
    };
    info!(
        file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        bytes = upload.bytes.len(),
        "received upload"
    );

    let analyzer = state.analyzer.clone();
    let result =
        tokio::task::spawn_blocking(move || analyzer.analyze(&upload.bytes, upload.extension()))
            .await;

    match result {
        Ok(response) => Json(response),
        Err(err) => {
            error!(error = %err, "analysis task did not complete");
            Json(AnalysisResponse::error(format!("analysis task failed: {err}")))
        }
    }
}

/// First part with a file name, or the part named `file`.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> std::result::Result<Upload, String> {
    let mut multipart = multipart.map_err(|rejection| rejection.to_string())?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| format!("malformed multipart body: {err}"))?
    {
        let file_name = field.file_name().map(str::to_owned);
        if file_name.is_none() && field.name() != Some(FILE_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| format!("failed to read upload: {err}"))?;
        return Ok(Upload { file_name, bytes });
    }

    Err("no audio file in upload".to_string())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
