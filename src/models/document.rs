//! Uploaded documents and their suffix classification.

use std::path::Path;

use crate::error::JobError;

/// Suffixes accepted as PDF documents.
const PDF_SUFFIXES: &[&str] = &["pdf"];

/// Suffixes accepted as page images.
const IMAGE_SUFFIXES: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Classified kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Classify a filename by its suffix. Classification is deliberately
    /// suffix-only; no content sniffing happens here.
    pub fn from_name(name: &str) -> Option<Self> {
        let suffix = Path::new(name).extension()?.to_str()?.to_lowercase();
        if PDF_SUFFIXES.contains(&suffix.as_str()) {
            Some(Self::Pdf)
        } else if IMAGE_SUFFIXES.contains(&suffix.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// One uploaded file, resolved to raw bytes and a classified kind.
#[derive(Debug, Clone)]
pub struct Document {
    /// Filename stem, used to key results and name artifacts.
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    /// OCR language for this document.
    pub lang: String,
}

impl Document {
    /// Build a document from a client-supplied filename and content.
    ///
    /// Fails with `UnsupportedFileType` before any analysis when the suffix
    /// is not a supported classification.
    pub fn from_upload(filename: &str, bytes: Vec<u8>, lang: String) -> Result<Self, JobError> {
        let kind = DocumentKind::from_name(filename).ok_or_else(|| {
            let suffix = Path::new(filename)
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("(none)");
            JobError::UnsupportedFileType(suffix.to_string())
        })?;

        let name = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();

        Ok(Self {
            name,
            kind,
            bytes,
            lang,
        })
    }
}
