use std::sync::Arc;

use anyhow::Context;
use pdfchat_rag::extract::PdfTextExtractor;
use pdfchat_server::{AppConfig, AppState, run_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("failed to read configuration")?;
    let pipeline = config.build_pipeline().await.context("failed to initialize the retrieval pipeline")?;
    let state = AppState::new(pipeline, Arc::new(PdfTextExtractor));

    run_server(config.server, state).await
}
