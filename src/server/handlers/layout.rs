//! Layout OCR endpoint: character-level layout boxes, inline JSON.

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::upload::parse_upload;
use super::error_response;
use crate::batch::format_document_pages;
use crate::engine::run_analysis;
use crate::server::AppState;
use crate::workspace::JobWorkspace;

/// `POST /layout_ocr` — analyze every uploaded document and return ordered
/// layout boxes with per-character bounding boxes for each page.
pub async fn layout_ocr(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (documents, options) = match parse_upload(multipart)
        .await
        .and_then(|form| form.into_documents())
    {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };

    let workspace = match JobWorkspace::create(&state.settings.output_dir) {
        Ok(workspace) => workspace,
        Err(e) => return error_response(e),
    };

    tracing::info!(
        job_id = %workspace.id(),
        documents = documents.len(),
        "processing layout OCR job"
    );

    let analyses = run_analysis(
        state.engine.as_ref(),
        &documents,
        options.parse_method,
        state.settings.analysis_flags(),
        options.start_page,
        options.end_page,
    )
    .await;

    let response = match analyses {
        Ok(analyses) => {
            let mut results = serde_json::Map::new();
            for (document, analysis) in documents.iter().zip(&analyses) {
                let pages =
                    format_document_pages(workspace.id(), analysis, options.include_discarded);
                results.insert(
                    document.name.clone(),
                    serde_json::json!({ "pages": pages }),
                );
            }
            Json(serde_json::json!({
                "backend": state.settings.backend,
                "version": crate::VERSION,
                "results": results,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(job_id = %workspace.id(), error = %e, "layout OCR job failed");
            error_response(e)
        }
    };

    workspace.dispose(state.settings.keep_workspaces);
    response
}
