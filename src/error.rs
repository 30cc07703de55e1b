//! Error taxonomy for job processing.
//!
//! Page-level failures are recoverable and never abort a job; job-level
//! failures terminate the job and trigger workspace cleanup.

use thiserror::Error;

/// Errors that can occur while processing a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Document classification not recognized. Surfaced before any analysis.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Failure reading or writing a document's bytes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The external engine call failed. Fatal to the whole job.
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// A single page failed to format. Recoverable; the page is skipped.
    #[error("Failed to format page {page_index}: {message}")]
    PageFormat { page_index: usize, message: String },

    /// Zip assembly failure. Fatal to a batch-archive response.
    #[error("Archive assembly failed: {0}")]
    Archive(String),

    /// Malformed or incomplete client request.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl JobError {
    /// Whether this error aborts the whole job (as opposed to one page).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, JobError::PageFormat { .. })
    }
}
