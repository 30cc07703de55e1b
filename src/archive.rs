//! Zip packaging of batch results.
//!
//! Every entry path goes through the filename sanitizer, so an archive can
//! never contain traversal sequences or hidden files regardless of what the
//! client named its uploads. The archive itself is a transient file; the
//! returned [`TempPath`] deletes it when dropped, which the response layer
//! ties to response completion.

use std::fs::File;
use std::io::Write;

use tempfile::TempPath;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::JobError;
use crate::models::{ArtifactFlags, ParseMethod};
use crate::utils::sanitize_filename;
use crate::workspace::JobWorkspace;

/// Artifact files for one document, as `(disk filename, entry filename)`
/// pairs relative to the parse dir. Both sides are already sanitized
/// because the disk layout is keyed by the sanitized name.
fn artifact_files(safe_name: &str, flags: ArtifactFlags) -> Vec<String> {
    let mut files = Vec::new();
    if flags.markdown {
        files.push(format!("{safe_name}.md"));
    }
    if flags.middle_json {
        files.push(format!("{safe_name}_middle.json"));
    }
    if flags.model_output {
        files.push(format!("{safe_name}_model.json"));
    }
    if flags.content_list {
        files.push(format!("{safe_name}_content_list.json"));
    }
    files
}

/// Package the requested artifacts of every document into a deflate zip.
///
/// Entries live under `sanitize(doc_name)/...`; files a document did not
/// produce are skipped. Returns the path of the transient archive.
pub fn build_archive(
    workspace: &JobWorkspace,
    doc_names: &[String],
    method: ParseMethod,
    flags: ArtifactFlags,
) -> Result<TempPath, JobError> {
    let tmp = tempfile::Builder::new()
        .prefix("docstream_results_")
        .suffix(".zip")
        .tempfile()
        .map_err(|e| JobError::Archive(e.to_string()))?;
    let (file, path) = tmp.into_parts();

    write_entries(file, workspace, doc_names, method, flags)
        .map_err(|e| JobError::Archive(e.to_string()))?;

    Ok(path)
}

fn write_entries(
    file: File,
    workspace: &JobWorkspace,
    doc_names: &[String],
    method: ParseMethod,
    flags: ArtifactFlags,
) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for doc_name in doc_names {
        let safe_name = sanitize_filename(doc_name);
        let parse_dir = workspace.doc_dir(&safe_name, method);
        if !parse_dir.exists() {
            continue;
        }

        for filename in artifact_files(&safe_name, flags) {
            let disk_path = parse_dir.join(&filename);
            let Ok(bytes) = std::fs::read(&disk_path) else {
                continue;
            };
            zip.start_file(format!("{safe_name}/{filename}"), options)?;
            zip.write_all(&bytes)?;
        }

        if flags.images {
            let images_dir = parse_dir.join("images");
            if let Ok(entries) = std::fs::read_dir(&images_dir) {
                for entry in entries.flatten() {
                    let entry_name = sanitize_filename(&entry.file_name().to_string_lossy());
                    let Ok(bytes) = std::fs::read(entry.path()) else {
                        continue;
                    };
                    zip.start_file(format!("{safe_name}/images/{entry_name}"), options)?;
                    zip.write_all(&bytes)?;
                }
            }
        }
    }

    zip.finish()?;
    Ok(())
}
