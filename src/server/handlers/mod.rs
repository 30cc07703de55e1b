//! Request handlers.

mod batch;
mod layout;
mod upload;
mod ws;

pub use batch::file_parse;
pub use layout::layout_ocr;
pub use ws::layout_ocr_stream;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::JobError;

/// Map a job error onto a structured HTTP error payload.
///
/// Classification and request-shape problems are the client's fault (400);
/// everything else is a server-side failure (500). The payload is always
/// `{"error": message}`, never a stack trace.
pub(super) fn error_response(e: JobError) -> Response {
    let status = match &e {
        JobError::UnsupportedFileType(_) | JobError::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}
