//! Shared utility functions.

mod filename;

pub use filename::sanitize_filename;
