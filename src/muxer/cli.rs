//! CLI-based muxer using an external ffmpeg binary

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::traits::{Muxer, MuxerCapabilities};

/// How much trailing stderr to keep in error messages
const STDERR_TAIL_LEN: usize = 400;

/// CLI-based muxer shelling out to ffmpeg
///
/// # Examples
///
/// ```no_run
/// use media_dl::muxer::{CliMuxer, Muxer};
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let muxer = CliMuxer::new(PathBuf::from("/usr/bin/ffmpeg"));
///
/// // Or auto-discover from PATH
/// let muxer = CliMuxer::from_path().expect("ffmpeg not found in PATH");
///
/// muxer
///     .merge_overlay(
///         Path::new("video.mp4"),
///         Path::new("overlay.png"),
///         Path::new("merged.mp4"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CliMuxer {
    binary_path: PathBuf,
}

impl CliMuxer {
    /// Create a new CLI muxer with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// Returns `Some(CliMuxer)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    async fn run(&self, mut command: Command, operation: &str) -> crate::Result<()> {
        let output = command.output().await.map_err(|e| {
            crate::Error::ExternalTool(format!("failed to execute ffmpeg for {operation}: {e}"))
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(crate::Error::ExternalTool(format!(
            "ffmpeg {operation} exited with {}: {}",
            output.status,
            stderr_tail(&stderr)
        )))
    }
}

/// Keep only the end of ffmpeg's stderr — the actual error is always last
fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth_back(STDERR_TAIL_LEN) {
        Some((index, _)) => &trimmed[index..],
        None => trimmed,
    }
}

#[async_trait]
impl Muxer for CliMuxer {
    async fn merge_overlay(
        &self,
        media: &Path,
        overlay: &Path,
        output: &Path,
    ) -> crate::Result<()> {
        debug!(?media, ?overlay, ?output, "merging overlay");

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-y")
            .arg("-i")
            .arg(media)
            .arg("-i")
            .arg(overlay)
            .arg("-filter_complex")
            .arg("[0:v][1:v]overlay=0:0")
            .arg("-c:a")
            .arg("copy")
            .arg(output);

        self.run(command, "overlay merge").await
    }

    async fn mux_dash_chapter(
        &self,
        manifest: &Path,
        output: &Path,
        offset_time: f64,
        duration: Option<f64>,
    ) -> crate::Result<()> {
        debug!(?manifest, ?output, offset_time, ?duration, "muxing dash chapter");

        let mut command = Command::new(&self.binary_path);
        command.arg("-y").arg("-ss").arg(format!("{offset_time}"));
        if let Some(duration) = duration {
            command.arg("-t").arg(format!("{duration}"));
        }
        command.arg("-i").arg(manifest).arg("-c").arg("copy").arg(output);

        self.run(command, "dash mux").await
    }

    fn capabilities(&self) -> MuxerCapabilities {
        MuxerCapabilities {
            can_merge_overlay: true,
            can_mux_dash: true,
        }
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_keeps_short_output_whole() {
        assert_eq!(stderr_tail("error: no such file\n"), "error: no such file");
    }

    #[test]
    fn stderr_tail_truncates_long_output_from_the_front() {
        let long: String = "x".repeat(2000) + "the real error";
        let tail = stderr_tail(&long);
        assert!(tail.len() <= STDERR_TAIL_LEN + 1);
        assert!(tail.ends_with("the real error"));
    }

    #[test]
    fn from_path_binary_discovery_matches_which() {
        // Behavior must agree with `which` regardless of whether ffmpeg is
        // actually installed on the test machine
        match which::which("ffmpeg") {
            Ok(expected) => {
                let muxer = CliMuxer::from_path().expect("which found ffmpeg");
                assert_eq!(muxer.binary_path, expected);
                let caps = muxer.capabilities();
                assert!(caps.can_merge_overlay);
                assert!(caps.can_mux_dash);
                assert_eq!(muxer.name(), "cli-ffmpeg");
            }
            Err(_) => {
                assert!(CliMuxer::from_path().is_none());
            }
        }
    }

    #[tokio::test]
    async fn missing_binary_is_an_external_tool_error() {
        let muxer = CliMuxer::new(PathBuf::from("/nonexistent/ffmpeg-binary-xyz"));
        let err = muxer
            .merge_overlay(
                Path::new("/tmp/a.mp4"),
                Path::new("/tmp/b.png"),
                Path::new("/tmp/out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::ExternalTool(_)));
    }
}
