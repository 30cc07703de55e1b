//! The external layout/OCR analysis engine, modeled as a capability trait.
//!
//! The engine computes all pages of a job together (shared-model
//! amortization), so delivery pacing downstream is an abstraction over an
//! already-complete result set: one `analyze` call per job, never one per
//! page. Any concrete inference backend can sit behind [`AnalysisEngine`]
//! without affecting the protocol layer.

pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::JobError;
use crate::models::{Document, ParseMethod};
use crate::pages::select_page_range;

/// Errors from the engine call. Always fatal to the whole job.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("engine returned an invalid response: {0}")]
    BadResponse(String),

    #[error("engine rejected the job: {0}")]
    Rejected(String),
}

/// Feature toggles forwarded to the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalysisFlags {
    pub formula_enable: bool,
    pub table_enable: bool,
}

impl Default for AnalysisFlags {
    fn default() -> Self {
        Self {
            formula_enable: true,
            table_enable: true,
        }
    }
}

/// One character of raw model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChar {
    #[serde(rename = "char")]
    pub glyph: String,
    pub bbox: [f64; 4],
}

/// A raw span: a typed run of characters with recognized content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(rename = "type", default)]
    pub span_type: String,
    pub bbox: [f64; 4],
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub chars: Vec<RawChar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLine {
    pub bbox: [f64; 4],
    #[serde(default)]
    pub spans: Vec<RawSpan>,
}

/// A raw content block (paragraph, title, table, header/footer, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    pub bbox: [f64; 4],
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

/// Opaque per-page model output. Owned by the orchestrator until handed to
/// the formatter; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub discarded_blocks: Vec<RawBlock>,
}

/// An image the engine extracted from a document (figures, tables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedImage {
    pub name: String,
    /// JPEG bytes, base64 on the engine wire.
    #[serde(with = "b64_bytes")]
    pub data: Vec<u8>,
}

/// Everything the engine produced for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub pages: Vec<RawPage>,
    /// Raw model output, preserved verbatim for the model-output artifact.
    #[serde(default)]
    pub model_output: serde_json::Value,
    #[serde(default)]
    pub images: Vec<ExtractedImage>,
}

/// The analysis capability: one call per job covering every document.
///
/// Implementations must be safe to invoke concurrently from multiple jobs;
/// a capacity-bound engine should serialize or pool access internally.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn analyze(
        &self,
        documents: &[Document],
        method: ParseMethod,
        flags: AnalysisFlags,
    ) -> Result<Vec<DocumentAnalysis>, EngineError>;
}

/// Invoke the engine once for a whole job and clip each document's pages to
/// the requested inclusive window.
///
/// Pages are reindexed from 0 within the window, matching the behavior of
/// slicing the document before analysis. Engine failure aborts the job
/// before any page is formatted.
pub async fn run_analysis(
    engine: &dyn AnalysisEngine,
    documents: &[Document],
    method: ParseMethod,
    flags: AnalysisFlags,
    start_page: usize,
    end_page: Option<usize>,
) -> Result<Vec<DocumentAnalysis>, JobError> {
    let mut results = engine
        .analyze(documents, method, flags)
        .await
        .map_err(|e| JobError::Analysis(e.to_string()))?;

    if results.len() != documents.len() {
        return Err(JobError::Analysis(format!(
            "engine returned {} results for {} documents",
            results.len(),
            documents.len()
        )));
    }

    for analysis in &mut results {
        let range = select_page_range(analysis.pages.len(), start_page, end_page);
        analysis.pages.truncate(range.end);
        analysis.pages.drain(..range.start);
    }

    Ok(results)
}

mod b64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
