//! HTTP client for a remote inference server.
//!
//! Sends the whole job (all documents, base64-encoded) in one request and
//! receives per-document, per-page raw model output. The inference server is
//! expected to expose a single `POST /analyze` endpoint.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AnalysisEngine, AnalysisFlags, DocumentAnalysis, EngineError};
use crate::models::{Document, DocumentKind, ParseMethod};

/// Request body for the inference server.
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    documents: Vec<AnalyzeRequestDoc<'a>>,
    parse_method: &'a str,
    formula_enable: bool,
    table_enable: bool,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequestDoc<'a> {
    name: &'a str,
    kind: &'a str,
    lang: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<DocumentAnalysis>,
}

/// [`AnalysisEngine`] backed by an HTTP inference server.
pub struct RemoteEngine {
    client: reqwest::Client,
    server_url: String,
}

impl RemoteEngine {
    /// Create a client for the given server base URL.
    pub fn new(server_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            // Large documents on busy accelerators can take a while; the
            // connect timeout is what catches a dead server.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();

        Self {
            client,
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/analyze", self.server_url)
    }
}

#[async_trait]
impl AnalysisEngine for RemoteEngine {
    async fn analyze(
        &self,
        documents: &[Document],
        method: ParseMethod,
        flags: AnalysisFlags,
    ) -> Result<Vec<DocumentAnalysis>, EngineError> {
        let body = AnalyzeRequest {
            documents: documents
                .iter()
                .map(|doc| AnalyzeRequestDoc {
                    name: &doc.name,
                    kind: match doc.kind {
                        DocumentKind::Pdf => "pdf",
                        DocumentKind::Image => "image",
                    },
                    lang: &doc.lang,
                    content: STANDARD.encode(&doc.bytes),
                })
                .collect(),
            parse_method: method.as_str(),
            formula_enable: flags.formula_enable,
            table_enable: flags.table_enable,
        };

        tracing::debug!(
            url = %self.endpoint(),
            documents = documents.len(),
            method = method.as_str(),
            "sending analysis request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::Rejected(format!("{status}: {detail}")));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| EngineError::BadResponse(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(EngineError::Rejected(error));
        }

        Ok(parsed.results)
    }
}
