//! Batch parse endpoint: aggregated JSON or zip download.

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tempfile::TempPath;
use tokio::io::AsyncReadExt;

use super::upload::parse_upload;
use super::error_response;
use crate::archive::build_archive;
use crate::batch::{collect_inline_results, format_document_pages, write_artifacts};
use crate::engine::run_analysis;
use crate::error::JobError;
use crate::models::Job;
use crate::server::AppState;
use crate::workspace::JobWorkspace;

/// `POST /file_parse` — parse every uploaded document, aggregate the
/// requested artifacts, and return either inline JSON or a zip download.
pub async fn file_parse(State(state): State<AppState>, multipart: Multipart) -> Response {
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
    let job = Job {
        workspace,
        documents,
        options,
    };

    let response = process(&state, &job).await;
    job.workspace.dispose(state.settings.keep_workspaces);

    match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(job_id = %job.id(), error = %e, "batch job failed");
            error_response(e)
        }
    }
}

async fn process(state: &AppState, job: &Job) -> Result<Response, JobError> {
    let options = &job.options;
    let workspace = &job.workspace;

    tracing::info!(
        job_id = %job.id(),
        documents = job.documents.len(),
        method = options.parse_method.as_str(),
        "processing batch job"
    );

    let analyses = run_analysis(
        state.engine.as_ref(),
        &job.documents,
        options.parse_method,
        state.settings.analysis_flags(),
        options.start_page,
        options.end_page,
    )
    .await?;

    // Sequential per-document aggregation; a failed page is logged and
    // absent, never fatal.
    for (document, analysis) in job.documents.iter().zip(&analyses) {
        let pages = format_document_pages(job.id(), analysis, options.include_discarded);
        write_artifacts(
            workspace,
            &document.name,
            options.parse_method,
            options.artifacts,
            &pages,
            analysis,
            &state.settings,
        )?;
    }

    if options.response_zip {
        let doc_names: Vec<String> = job.documents.iter().map(|d| d.name.clone()).collect();
        let zip_path = build_archive(workspace, &doc_names, options.parse_method, options.artifacts)?;

        let file = tokio::fs::File::open(&zip_path)
            .await
            .map_err(|e| JobError::Archive(e.to_string()))?;

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/zip")
            .header(
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"results.zip\"",
            )
            .body(Body::from_stream(archive_stream(file, zip_path)))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
    } else {
        let mut results = serde_json::Map::new();
        for document in &job.documents {
            results.insert(
                document.name.clone(),
                collect_inline_results(
                    workspace,
                    &document.name,
                    options.parse_method,
                    options.artifacts,
                ),
            );
        }

        Ok(Json(serde_json::json!({
            "backend": state.settings.backend,
            "version": crate::VERSION,
            "results": results,
        }))
        .into_response())
    }
}

/// Stream the transient archive from disk in chunks.
///
/// The `TempPath` travels with the stream state, so the file is deleted when
/// the response body completes or is dropped, never before transmission.
fn archive_stream(
    file: tokio::fs::File,
    path: TempPath,
) -> impl futures::Stream<Item = std::io::Result<Vec<u8>>> {
    futures::stream::unfold(Some((file, path)), |state| async move {
        let (mut file, path) = state?;
        let mut buf = vec![0u8; 64 * 1024];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some((file, path))))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}
