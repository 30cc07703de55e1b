//! docstream - layout OCR result delivery service.
//!
//! Accepts PDF or page-image uploads, runs an external layout/OCR analysis
//! engine over each document, and delivers structured per-page results
//! either as one aggregated batch response (JSON or zip) or as a
//! page-by-page event stream over a WebSocket.

pub mod archive;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;
pub mod pages;
pub mod server;
pub mod stream;
pub mod utils;
pub mod workspace;

/// Crate version reported in batch responses.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
