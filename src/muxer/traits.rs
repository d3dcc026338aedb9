//! Traits and types for the external muxing capability

use async_trait::async_trait;
use std::path::Path;

/// Capabilities of a muxer implementation
#[derive(Debug, Clone, Copy)]
pub struct MuxerCapabilities {
    /// Can composite a still image over a video track
    pub can_merge_overlay: bool,
    /// Can chapter-mux a DASH manifest
    pub can_mux_dash: bool,
}

/// Trait for external media muxing
///
/// Both operations are long-running and failure-reporting; neither is ever
/// retried by the pipeline. Implementations can shell out to a binary or
/// provide stub behavior for graceful degradation.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Composite `overlay` (image) over `media` (video), writing `output`
    ///
    /// # Errors
    ///
    /// Returns an error if the external tool cannot be executed, exits
    /// non-zero, or the operation is not supported by this implementation.
    async fn merge_overlay(&self, media: &Path, overlay: &Path, output: &Path)
    -> crate::Result<()>;

    /// Mux the chapter `[offset_time, offset_time + duration)` of a DASH
    /// manifest into `output`
    ///
    /// `duration` of `None` muxes from the offset to end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the external tool cannot be executed, exits
    /// non-zero, or the operation is not supported by this implementation.
    async fn mux_dash_chapter(
        &self,
        manifest: &Path,
        output: &Path,
        offset_time: f64,
        duration: Option<f64>,
    ) -> crate::Result<()>;

    /// Query capabilities of this muxer
    fn capabilities(&self) -> MuxerCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
