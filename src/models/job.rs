//! Jobs: one client request, its documents, and its options.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Document;
use crate::workspace::JobWorkspace;

/// Parsing method passed through to the analysis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMethod {
    Auto,
    Ocr,
    Txt,
}

impl ParseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Ocr => "ocr",
            Self::Txt => "txt",
        }
    }
}

impl Default for ParseMethod {
    fn default() -> Self {
        Self::Auto
    }
}

impl FromStr for ParseMethod {
    type Err = ();

    /// Unknown method strings fall back to `auto`, matching the engine's own
    /// lenient handling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ocr" => Self::Ocr,
            "txt" => Self::Txt,
            _ => Self::Auto,
        })
    }
}

/// Which result artifacts a batch request wants back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactFlags {
    pub markdown: bool,
    pub middle_json: bool,
    pub model_output: bool,
    pub content_list: bool,
    pub images: bool,
}

impl ArtifactFlags {
    /// Default for `/file_parse`: markdown only.
    pub fn markdown_only() -> Self {
        Self {
            markdown: true,
            ..Self::default()
        }
    }
}

/// Per-job options shared by batch and streaming delivery.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub parse_method: ParseMethod,
    pub include_discarded: bool,
    /// First page of the inclusive window (0-based).
    pub start_page: usize,
    /// Last page of the inclusive window; `None` means to the end.
    pub end_page: Option<usize>,
    pub artifacts: ArtifactFlags,
    pub response_zip: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            parse_method: ParseMethod::Auto,
            include_discarded: false,
            start_page: 0,
            end_page: None,
            artifacts: ArtifactFlags::default(),
            response_zip: false,
        }
    }
}

/// One client request: isolated workspace, input documents, options.
///
/// The workspace is created at request arrival and removed after response
/// delivery or on unrecoverable failure.
#[derive(Debug)]
pub struct Job {
    pub workspace: JobWorkspace,
    pub documents: Vec<Document>,
    pub options: JobOptions,
}

impl Job {
    pub fn id(&self) -> &str {
        self.workspace.id()
    }
}

/// Reconcile a request's language list with its document count.
///
/// When the counts mismatch, the first language (or the default) is recycled
/// for every document.
pub fn reconcile_lang_list(lang_list: Vec<String>, doc_count: usize) -> Vec<String> {
    if lang_list.len() == doc_count {
        lang_list
    } else {
        let lang = lang_list
            .into_iter()
            .next()
            .unwrap_or_else(|| "ch".to_string());
        vec![lang; doc_count]
    }
}
