//! No-op muxer for graceful degradation when no binary is available

use async_trait::async_trait;
use std::path::Path;

use super::traits::{Muxer, MuxerCapabilities};

/// Muxer that supports nothing
///
/// Selected when no ffmpeg binary is configured or discoverable. Requests
/// that reach a muxing branch fail with a clear "not supported" message
/// instead of a confusing spawn error; plain passthrough requests are
/// unaffected.
pub struct NoOpMuxer;

#[async_trait]
impl Muxer for NoOpMuxer {
    async fn merge_overlay(
        &self,
        _media: &Path,
        _overlay: &Path,
        _output: &Path,
    ) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "overlay merging requires an ffmpeg binary".to_string(),
        ))
    }

    async fn mux_dash_chapter(
        &self,
        _manifest: &Path,
        _output: &Path,
        _offset_time: f64,
        _duration: Option<f64>,
    ) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "dash muxing requires an ffmpeg binary".to_string(),
        ))
    }

    fn capabilities(&self) -> MuxerCapabilities {
        MuxerCapabilities {
            can_merge_overlay: false,
            can_mux_dash: false,
        }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_muxer_reports_not_supported() {
        let muxer = NoOpMuxer;
        let caps = muxer.capabilities();
        assert!(!caps.can_merge_overlay);
        assert!(!caps.can_mux_dash);

        let err = muxer
            .mux_dash_chapter(Path::new("/tmp/a.mpd"), Path::new("/tmp/out.mp4"), 0.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::NotSupported(_)));
    }
}
