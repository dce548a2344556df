use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    routing::{get, post},
};
use pdfchat_rag::{PdfExtractor, RagPipeline};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    error::ApiError,
    protocol::{HealthResponse, ProcessPdfResponse, QueryRequest, QueryResponse},
};

const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub extractor: Arc<dyn PdfExtractor>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline, extractor: Arc<dyn PdfExtractor>) -> Self {
        Self { pipeline: Arc::new(pipeline), extractor }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 3000, max_upload_bytes: 20 * 1024 * 1024 }
    }
}

pub fn app_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/process-pdf", post(process_pdf))
        .route("/api/query", post(query))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let pipeline = state.pipeline.clone();
    let app = app_router(state, config.max_upload_bytes);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for pdfchat server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("pdfchat listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    pipeline.vector_store().close().await?;
    info!("pdfchat stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let chunks = state.pipeline.chunk_count().await?;
    Ok(Json(HealthResponse { status: "ok".to_string(), chunks }))
}

/// Strip any client-side directory from an uploaded file name.
fn source_name(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("upload.pdf")
        .to_string()
}

async fn process_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessPdfResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) =
        multipart.next_field().await.map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let source = source_name(field.file_name());
        let bytes = field.bytes().await.map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        upload = Some((source, bytes));
        break;
    }

    let (source, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    info!(source = %source, bytes = bytes.len(), "processing upload");

    let extractor = state.extractor.clone();
    let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| ApiError::internal(format!("text extraction did not complete: {e}")))??;

    let report = state.pipeline.ingest_text(&source, &text).await?;

    Ok(Json(ProcessPdfResponse {
        success: true,
        chunks_stored: report.chunks_stored,
        document_id: report.document_id,
        source: report.source,
    }))
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let reply = state.pipeline.ask(&request.question, &request.history).await?;
    Ok(Json(QueryResponse { answer: reply.answer, sources: reply.sources }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_name_drops_client_paths() {
        assert_eq!(source_name(Some("C:\\Users\\me\\report.pdf")), "report.pdf");
        assert_eq!(source_name(Some("docs/2024/report.pdf")), "report.pdf");
        assert_eq!(source_name(Some("   ")), "upload.pdf");
        assert_eq!(source_name(None), "upload.pdf");
    }
}
