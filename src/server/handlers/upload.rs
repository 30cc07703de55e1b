//! Shared multipart form parsing for the batch endpoints.

use axum::extract::Multipart;

use crate::error::JobError;
use crate::models::{reconcile_lang_list, ArtifactFlags, Document, JobOptions, ParseMethod};

/// Raw fields of a batch upload, before document classification.
#[derive(Debug)]
pub struct UploadForm {
    /// `(client filename, content)` in upload order.
    pub files: Vec<(String, Vec<u8>)>,
    pub lang_list: Vec<String>,
    pub options: JobOptions,
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Drain a multipart stream into an [`UploadForm`].
///
/// Unknown fields are ignored so clients can send superset forms. A request
/// without any file is rejected before analysis.
pub async fn parse_upload(mut multipart: Multipart) -> Result<UploadForm, JobError> {
    let mut files = Vec::new();
    let mut lang_list = Vec::new();
    let mut options = JobOptions {
        artifacts: ArtifactFlags::markdown_only(),
        ..JobOptions::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JobError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" {
            let filename = field
                .file_name()
                .unwrap_or("document.pdf")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| JobError::BadRequest(format!("failed to read upload: {e}")))?;
            files.push((filename, bytes.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| JobError::BadRequest(format!("failed to read field {name}: {e}")))?;

        match name.as_str() {
            "lang_list" => lang_list.push(value),
            "parse_method" => {
                options.parse_method = value.parse().unwrap_or(ParseMethod::Auto);
            }
            "include_discarded" => options.include_discarded = parse_bool(&value),
            "start_page_id" => {
                options.start_page = value
                    .trim()
                    .parse()
                    .map_err(|_| JobError::BadRequest(format!("invalid start_page_id: {value}")))?;
            }
            "end_page_id" => {
                options.end_page = Some(value.trim().parse().map_err(|_| {
                    JobError::BadRequest(format!("invalid end_page_id: {value}"))
                })?);
            }
            "return_md" => options.artifacts.markdown = parse_bool(&value),
            "return_middle_json" => options.artifacts.middle_json = parse_bool(&value),
            "return_model_output" => options.artifacts.model_output = parse_bool(&value),
            "return_content_list" => options.artifacts.content_list = parse_bool(&value),
            "return_images" => options.artifacts.images = parse_bool(&value),
            "response_format_zip" => options.response_zip = parse_bool(&value),
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(JobError::BadRequest("no files uploaded".to_string()));
    }

    Ok(UploadForm {
        files,
        lang_list,
        options,
    })
}

impl UploadForm {
    /// Classify every upload, pairing it with its reconciled language.
    pub fn into_documents(self) -> Result<(Vec<Document>, JobOptions), JobError> {
        let langs = reconcile_lang_list(self.lang_list, self.files.len());
        let documents = self
            .files
            .into_iter()
            .zip(langs)
            .map(|((filename, bytes), lang)| Document::from_upload(&filename, bytes, lang))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((documents, self.options))
    }
}
