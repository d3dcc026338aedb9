//! Transform pipeline
//!
//! Takes the fetcher's resolved inputs through archive expansion, branch
//! selection (overlay merge, DASH rewrite-and-mux, or single passthrough)
//! and the final commit into permanent storage. Every run owns a scratch
//! directory under the configured temp dir; the directory is removed when
//! the run ends, on every exit path, so no intermediate file outlives its
//! request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive;
use crate::capability::{MediaIndexer, Notifier};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{FetchedMedia, Fetcher, ResolvedFile};
use crate::ledger::TaskLedger;
use crate::manifest;
use crate::muxer::Muxer;
use crate::sniff::{self, FileKind};
use crate::types::{DownloadRequest, DownloadStage, InputKind, InputMedia, TaskId};

/// Executes the transform pipeline for one request at a time
pub(crate) struct Pipeline {
    pub(crate) config: Arc<Config>,
    pub(crate) ledger: Arc<TaskLedger>,
    pub(crate) fetcher: Fetcher,
    pub(crate) muxer: Arc<dyn Muxer>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) indexer: Arc<dyn MediaIndexer>,
}

impl Pipeline {
    /// Run the full pipeline for a registered task
    ///
    /// On success the ledger entry is already in `Saved`; errors are
    /// returned to the controller, which maps them to a terminal stage.
    pub(crate) async fn run(
        &self,
        id: TaskId,
        request: &DownloadRequest,
        output_path: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        // The scratch dir owns every intermediate file of this run; dropping
        // it removes them regardless of how the run ends.
        let scratch = tempfile::tempdir_in(&self.config.storage.temp_dir)?;

        let fetched = self
            .fetcher
            .fetch_all(request, scratch.path(), token)
            .await?;

        let mut working_set: Vec<(InputMedia, ResolvedFile)> = request
            .inputs
            .iter()
            .filter_map(|input| {
                fetched
                    .files
                    .get(input)
                    .map(|resolved| (input.clone(), resolved.clone()))
            })
            .collect();

        let mut merge_overlay = request.should_merge_overlay;

        // Archive expansion: a zip bundle replaces the whole working set and
        // unconditionally forces overlay mode
        if let Some(archive_file) = working_set
            .iter()
            .find(|(_, resolved)| resolved.kind == FileKind::Zip)
            .map(|(_, resolved)| resolved.path.clone())
        {
            working_set = self
                .expand_archive(&archive_file, working_set, scratch.path())
                .await?;
            merge_overlay = true;
        }

        if merge_overlay {
            self.merge_overlay_branch(id, &working_set, fetched.dropped, scratch.path(), output_path, token)
                .await
        } else if request.is_dash_playlist {
            self.dash_branch(id, request, &fetched, scratch.path(), output_path, token)
                .await
        } else {
            self.passthrough_branch(id, request, &fetched, output_path, token)
                .await
        }
    }

    /// Extract a zip bundle and swap the working set for its entries
    async fn expand_archive(
        &self,
        archive_file: &Path,
        previous: Vec<(InputMedia, ResolvedFile)>,
        scratch: &Path,
    ) -> Result<Vec<(InputMedia, ResolvedFile)>> {
        let entries = archive::extract_zip(archive_file, scratch).await?;

        // The archive and everything resolved before it are consumed now.
        // Only scratch-owned files are deleted — a LocalPath input is the
        // caller's file, not ours.
        for (_, resolved) in previous {
            if resolved.path.starts_with(scratch) {
                if let Err(e) = tokio::fs::remove_file(&resolved.path).await {
                    warn!(path = ?resolved.path, error = %e, "failed to remove consumed file");
                }
            }
        }

        let mut replacement = Vec::with_capacity(entries.len());
        for path in entries {
            let kind = sniff::sniff_file(&path).await?;
            let input = InputMedia::new(
                InputKind::LocalPath,
                path.to_string_lossy().into_owned(),
            );
            replacement.push((input, ResolvedFile { path, kind }));
        }

        debug!(entries = replacement.len(), "expanded zip bundle into working set");
        Ok(replacement)
    }

    /// Overlay merge: exactly one video + one image, composited externally
    async fn merge_overlay_branch(
        &self,
        id: TaskId,
        working_set: &[(InputMedia, ResolvedFile)],
        dropped: usize,
        scratch: &Path,
        output_path: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        if working_set.len() != 2 {
            if dropped > 0 {
                return Err(Error::MissingMedia(format!(
                    "overlay merge needs 2 resolved media, got {} ({} input(s) dropped)",
                    working_set.len(),
                    dropped
                )));
            }
            return Err(Error::Precondition(format!(
                "overlay merge needs exactly 2 media, got {}",
                working_set.len()
            )));
        }

        let video = working_set
            .iter()
            .find(|(_, resolved)| resolved.kind.is_video())
            .ok_or_else(|| {
                Error::Precondition("overlay merge requires a video-typed media".to_string())
            })?;
        let image = working_set
            .iter()
            .find(|(_, resolved)| resolved.kind.is_image())
            .ok_or_else(|| {
                Error::Precondition("overlay merge requires an image-typed media".to_string())
            })?;

        // The muxer selects demuxers by extension; rename both inputs to
        // carry their sniffed type
        let video_path = rename_with_extension(&video.1.path, video.1.kind).await?;
        let image_path = rename_with_extension(&image.1.path, image.1.kind).await?;
        let merged = scratch.join(format!("merged.{}", video.1.kind.extension()));

        self.notifier.notify_short("Merging overlay...").await;
        self.ledger.update_stage(id, DownloadStage::Merging).await?;

        let mux_result = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            result = self.muxer.merge_overlay(&video_path, &image_path, &merged) => result,
        };
        mux_result.map_err(|e| Error::Merge(e.to_string()))?;

        self.commit(id, &merged, output_path, token).await
    }

    /// DASH: rewrite BaseURLs against the CDN, then chapter-mux externally
    async fn dash_branch(
        &self,
        id: TaskId,
        request: &DownloadRequest,
        fetched: &FetchedMedia,
        scratch: &Path,
        output_path: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let input = request
            .inputs
            .first()
            .ok_or_else(|| Error::Precondition("dash request has no input".to_string()))?;
        let resolved = fetched
            .files
            .get(input)
            .ok_or_else(|| Error::MissingMedia("dash manifest was never resolved".to_string()))?;

        if resolved.kind != FileKind::DashManifest {
            return Err(Error::Precondition(format!(
                "dash branch requires a manifest, sniffed {:?}",
                resolved.kind
            )));
        }

        let options = request.dash_options.ok_or_else(|| {
            Error::Precondition("dash request is missing dash_options".to_string())
        })?;

        let playlist = scratch.join(format!("playlist.{}", FileKind::DashManifest.extension()));
        manifest::rewrite_base_urls(&resolved.path, &playlist, &self.config.fetch.cdn_base_url)
            .await?;

        self.notifier.notify_short("Downloading dash media...").await;

        let muxed = scratch.join("dash-output.mp4");
        let mux_result = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            result = self
                .muxer
                .mux_dash_chapter(&playlist, &muxed, options.offset_time, options.duration) => result,
        };
        mux_result.map_err(|e| Error::Dash(e.to_string()))?;

        self.commit(id, &muxed, output_path, token).await
    }

    /// Single passthrough: the first declared input goes straight to commit
    async fn passthrough_branch(
        &self,
        id: TaskId,
        request: &DownloadRequest,
        fetched: &FetchedMedia,
        output_path: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let input = request
            .inputs
            .first()
            .ok_or_else(|| Error::Precondition("request has no input".to_string()))?;
        let resolved = fetched
            .files
            .get(input)
            .ok_or_else(|| Error::MissingMedia("input media was never resolved".to_string()))?;

        self.commit(id, &resolved.path, output_path, token).await
    }

    /// Move the final artifact into permanent storage and finish the task
    async fn commit(
        &self,
        id: TaskId,
        file: &Path,
        output_path: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let kind = sniff::sniff_file(file).await?;
        let destination = self.destination_for(output_path, kind);

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        move_file(file, &destination).await?;

        // Index refresh is fire-and-forget; a missing index layer must not
        // fail a committed download
        if let Err(e) = self.indexer.refresh(&destination).await {
            warn!(path = ?destination, error = %e, "media index refresh failed");
        }

        let absolute = tokio::fs::canonicalize(&destination)
            .await
            .unwrap_or_else(|_| destination.clone());
        self.ledger
            .set_output_file(id, &absolute.to_string_lossy())
            .await?;
        self.ledger.update_stage(id, DownloadStage::Saved).await?;

        info!(task_id = id.0, path = ?absolute, "committed media");
        self.notifier
            .notify_long(&format!("Saved media to {}", self.display_path(&destination)))
            .await;

        Ok(())
    }

    /// Resolve the template into a concrete destination with extension
    fn destination_for(&self, output_path: &str, kind: FileKind) -> PathBuf {
        let template = Path::new(output_path);
        let base = if template.is_absolute() {
            template.to_path_buf()
        } else {
            self.config.storage.media_dir.join(template)
        };
        let mut destination = base.into_os_string();
        destination.push(".");
        destination.push(kind.extension());
        PathBuf::from(destination)
    }

    /// Shown in the success notification: path relative to the media root
    fn display_path(&self, destination: &Path) -> String {
        destination
            .strip_prefix(&self.config.storage.media_dir)
            .unwrap_or(destination)
            .to_string_lossy()
            .into_owned()
    }
}

/// Rename a file in place to carry the given sniffed extension
async fn rename_with_extension(path: &Path, kind: FileKind) -> Result<PathBuf> {
    let renamed = path.with_extension(kind.extension());
    tokio::fs::rename(path, &renamed).await?;
    Ok(renamed)
}

/// Move a file, falling back to copy+remove across filesystems
async fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(source, destination).await?;
            tokio::fs::remove_file(source).await?;
            Ok(())
        }
    }
}
