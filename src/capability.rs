//! External capability seams
//!
//! The pipeline consumes three collaborators it does not implement: a
//! user-visible notifier (toast equivalent), a resolver for proprietary
//! remote-media references, and a media-index refresher. Each is a trait
//! object so embedders plug in platform behavior; no-op implementations are
//! provided for tests and headless use.

use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Fire-and-forget user-visible messages
///
/// Implementations must return promptly — the controller awaits these calls
/// inline between pipeline stages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a brief message (progress-style)
    async fn notify_short(&self, text: &str);

    /// Show a longer-lived message (outcomes and failures)
    async fn notify_long(&self, text: &str);
}

/// Notifier that drops every message
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify_short(&self, _text: &str) {}

    async fn notify_long(&self, _text: &str) {}
}

/// Notifier that logs messages through `tracing`
///
/// Useful default for embedders without a UI surface.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_short(&self, text: &str) {
        info!(notification = text, "notify");
    }

    async fn notify_long(&self, text: &str) {
        info!(notification = text, "notify");
    }
}

/// Resolver for proprietary remote-media references
///
/// A `ProtoReference` input carries opaque bytes only this collaborator can
/// turn into media. Returning `Ok(None)` means the reference could not be
/// resolved; the fetcher drops that input silently (counted, not fatal).
#[async_trait]
pub trait RemoteResolver: Send + Sync {
    /// Resolve opaque reference bytes to the media payload
    async fn resolve(&self, reference: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Resolver that resolves nothing
pub struct NoOpResolver;

#[async_trait]
impl RemoteResolver for NoOpResolver {
    async fn resolve(&self, _reference: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Media-index refresh hook
///
/// Invoked after a successful commit so gallery-style consumers discover the
/// new file. Failures are logged by the pipeline and never abort a request.
#[async_trait]
pub trait MediaIndexer: Send + Sync {
    /// Notify the index layer that a file exists at `path`
    async fn refresh(&self, path: &Path) -> Result<()>;
}

/// Indexer that does nothing
pub struct NoOpIndexer;

#[async_trait]
impl MediaIndexer for NoOpIndexer {
    async fn refresh(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
