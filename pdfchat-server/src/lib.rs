//! `pdfchat-server` exposes the `pdfchat-rag` pipeline over HTTP.
//! Clients upload PDFs with a multipart POST and ask questions with JSON.

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use config::AppConfig;
pub use error::ApiError;
pub use server::{AppState, ServerConfig, app_router, run_server};
