//! Batch result aggregation: per-document artifacts and inline JSON.
//!
//! Batch mode processes documents sequentially. For each document the
//! requested artifacts are materialized into the job workspace under
//! `<workspace>/<safe_name>/<method>/`, then either read back into an inline
//! JSON response or packaged into a zip (see `archive`). Artifacts a
//! document did not produce are silently omitted, never errors.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;

use crate::config::Settings;
use crate::engine::DocumentAnalysis;
use crate::error::JobError;
use crate::format::format_page;
use crate::models::{ArtifactFlags, PageData, ParseMethod};
use crate::utils::sanitize_filename;
use crate::workspace::JobWorkspace;

/// Format every page of one document, skipping pages that fail.
///
/// In batch delivery a failed page is simply absent from the result; the
/// failure is logged with the page index for correlation.
pub fn format_document_pages(
    job_id: &str,
    analysis: &DocumentAnalysis,
    include_discarded: bool,
) -> Vec<PageData> {
    let mut pages = Vec::with_capacity(analysis.pages.len());
    for (page_index, raw) in analysis.pages.iter().enumerate() {
        match format_page(raw, page_index, include_discarded) {
            Ok(page) => pages.push(page),
            Err(e) => {
                tracing::error!(job_id, page_index, error = %e, "skipping unformattable page");
            }
        }
    }
    pages
}

/// Render formatted pages as markdown.
///
/// Title blocks become headings, image/table blocks become image
/// references, everything else becomes a paragraph.
pub fn render_markdown(pages: &[PageData]) -> String {
    let mut out = String::new();
    for page in pages {
        for (block_type, text) in page.block_texts() {
            if text.is_empty() {
                continue;
            }
            match block_type.as_str() {
                "title" => {
                    out.push_str("# ");
                    out.push_str(&text);
                }
                "image" | "table" => {
                    out.push_str(&format!("![{block_type}]({text})"));
                }
                _ => out.push_str(&text),
            }
            out.push_str("\n\n");
        }
    }
    out
}

/// Flat content list: one entry per layout box, with page index.
pub fn content_list(pages: &[PageData]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = pages
        .iter()
        .flat_map(|page| {
            page.block_texts()
                .into_iter()
                .map(move |(block_type, text)| {
                    json!({
                        "type": block_type,
                        "text": text,
                        "page_idx": page.page_index,
                    })
                })
        })
        .collect();
    serde_json::Value::Array(entries)
}

/// Write the requested artifacts for one document into its parse directory.
pub fn write_artifacts(
    workspace: &JobWorkspace,
    doc_name: &str,
    method: ParseMethod,
    flags: ArtifactFlags,
    pages: &[PageData],
    analysis: &DocumentAnalysis,
    settings: &Settings,
) -> Result<(), JobError> {
    let safe_name = sanitize_filename(doc_name);
    let parse_dir = workspace.doc_dir(&safe_name, method);
    std::fs::create_dir_all(&parse_dir)?;

    if flags.markdown {
        std::fs::write(
            parse_dir.join(format!("{safe_name}.md")),
            render_markdown(pages),
        )?;
    }

    if flags.middle_json {
        let middle = json!({
            "backend": settings.backend,
            "version": crate::VERSION,
            "pages": pages,
        });
        std::fs::write(
            parse_dir.join(format!("{safe_name}_middle.json")),
            serde_json::to_string(&middle).map_err(|e| JobError::Analysis(e.to_string()))?,
        )?;
    }

    if flags.model_output && !analysis.model_output.is_null() {
        std::fs::write(
            parse_dir.join(format!("{safe_name}_model.json")),
            analysis.model_output.to_string(),
        )?;
    }

    if flags.content_list {
        std::fs::write(
            parse_dir.join(format!("{safe_name}_content_list.json")),
            content_list(pages).to_string(),
        )?;
    }

    if flags.images && !analysis.images.is_empty() {
        let images_dir = parse_dir.join("images");
        std::fs::create_dir_all(&images_dir)?;
        for image in &analysis.images {
            std::fs::write(images_dir.join(sanitize_filename(&image.name)), &image.data)?;
        }
    }

    Ok(())
}

/// Read one artifact back from a parse directory, if it exists.
fn read_artifact(parse_dir: &Path, filename: &str) -> Option<String> {
    std::fs::read_to_string(parse_dir.join(filename)).ok()
}

/// Collect the requested artifacts of one document into an inline JSON
/// object: `{md_content, middle_json, model_output, content_list, images}`.
///
/// Images are embedded as `data:image/jpeg;base64,...` URIs keyed by
/// filename.
pub fn collect_inline_results(
    workspace: &JobWorkspace,
    doc_name: &str,
    method: ParseMethod,
    flags: ArtifactFlags,
) -> serde_json::Value {
    let safe_name = sanitize_filename(doc_name);
    let parse_dir = workspace.doc_dir(&safe_name, method);
    let mut data = serde_json::Map::new();

    if flags.markdown {
        if let Some(md) = read_artifact(&parse_dir, &format!("{safe_name}.md")) {
            data.insert("md_content".to_string(), md.into());
        }
    }
    if flags.middle_json {
        if let Some(s) = read_artifact(&parse_dir, &format!("{safe_name}_middle.json")) {
            data.insert("middle_json".to_string(), s.into());
        }
    }
    if flags.model_output {
        if let Some(s) = read_artifact(&parse_dir, &format!("{safe_name}_model.json")) {
            data.insert("model_output".to_string(), s.into());
        }
    }
    if flags.content_list {
        if let Some(s) = read_artifact(&parse_dir, &format!("{safe_name}_content_list.json")) {
            data.insert("content_list".to_string(), s.into());
        }
    }
    if flags.images {
        let images_dir = parse_dir.join("images");
        if let Ok(entries) = std::fs::read_dir(&images_dir) {
            let mut images = serde_json::Map::new();
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if let Ok(bytes) = std::fs::read(entry.path()) {
                    images.insert(
                        name,
                        format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)).into(),
                    );
                }
            }
            if !images.is_empty() {
                data.insert("images".to_string(), images.into());
            }
        }
    }

    serde_json::Value::Object(data)
}
