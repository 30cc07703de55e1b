//! Core data model: uploaded documents, jobs, and the page-result wire types.

mod document;
mod job;
mod page;

pub use document::{Document, DocumentKind};
pub use job::{reconcile_lang_list, ArtifactFlags, Job, JobOptions, ParseMethod};
pub use page::{CharBox, LayoutBox, Line, PageData, PageSize, Span};
