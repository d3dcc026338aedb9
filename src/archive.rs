//! Zip bundle extraction
//!
//! Some inputs arrive as a zip bundle wrapping the real media (typically a
//! video plus its overlay image). Extraction writes each entry to a fresh
//! file in the pipeline run's scratch directory, preserving archive entry
//! order; the extracted files carry no extension and are classified by
//! content sniffing afterwards. Entry payloads are not integrity-checked
//! beyond what the container reports — a corrupt payload surfaces later as a
//! type-sniff mismatch.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Extract every entry of a zip archive into `dest`
///
/// Returns the created file paths in archive entry order. Directory entries
/// are skipped. Runs on the blocking pool — the zip reader is synchronous.
pub async fn extract_zip(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_zip_sync(&archive_path, &dest))
        .await
        .map_err(|e| Error::Other(format!("extraction task failed: {e}")))?
}

fn extract_zip_sync(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest, "extracting zip bundle");

    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Archive {
        archive: archive_path.to_path_buf(),
        reason: format!("failed to read zip archive: {e}"),
    })?;

    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| Error::Archive {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read entry {index}: {e}"),
        })?;

        if entry.is_dir() {
            continue;
        }

        // Entry names are untrusted; files are materialized under scratch
        // with positional names and typed by sniffing, so the archive's own
        // paths are never used.
        let out_path = dest.join(format!("entry-{index:04}"));
        let mut out_file = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file).map_err(|e| Error::Archive {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to extract entry {index}: {e}"),
        })?;

        extracted.push(out_path);
    }

    info!(
        ?archive_path,
        extracted_count = extracted.len(),
        "zip extraction complete"
    );

    Ok(extracted)
}
