//! # media-dl
//!
//! Embeddable media-acquisition pipeline with a persistent task ledger.
//!
//! Given a declarative request describing one or more media sources
//! (possibly encrypted, possibly a zip bundle, possibly a DASH manifest,
//! possibly an overlay composite), media-dl fetches every source
//! concurrently, applies the right post-processing chain, and commits the
//! final artifact to permanent storage — while tracking the request through
//! a crash-tolerant SQLite ledger that supports filtered pagination and
//! cancellation.
//!
//! ## Design Philosophy
//!
//! - **Library-first** — no CLI or UI, purely a Rust crate for embedding
//! - **Durable by default** — the ledger survives restarts; a prior run's
//!   finished tasks stay queryable
//! - **Capability seams** — notification, proprietary media resolution,
//!   muxing, and media indexing are traits the embedder provides
//! - **No retries** — a failed request is terminal; resubmission is the
//!   caller's decision
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{
//!     Config, DownloadController, DownloadRequest, InputKind, InputMedia, MediaCategory,
//!     NoOpIndexer, NoOpResolver, TaskTemplate, TracingNotifier,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = DownloadController::new(
//!         Config::default(),
//!         Arc::new(TracingNotifier),
//!         Arc::new(NoOpResolver),
//!         Arc::new(NoOpIndexer),
//!     )
//!     .await?;
//!
//!     let request = DownloadRequest {
//!         inputs: vec![InputMedia::new(
//!             InputKind::RemoteUrl,
//!             "https://example.com/clip.mp4",
//!         )],
//!         is_dash_playlist: false,
//!         should_merge_overlay: false,
//!         dash_options: None,
//!     };
//!     let template = TaskTemplate {
//!         output_path: "clips/example".to_string(),
//!         label: "example clip".to_string(),
//!         category: MediaCategory::Generic,
//!     };
//!
//!     // Fire-and-forget: completion is observable through the ledger
//!     let id = controller.handle(request, template).await?;
//!     println!("queued task {id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Zip bundle extraction
pub mod archive;
/// External capability seams (notifier, resolver, indexer)
pub mod capability;
/// Configuration types
pub mod config;
/// Pipeline controller — the request entry point
pub mod controller;
/// Symmetric media decryption
pub mod crypto;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Concurrent input resolution
pub mod fetcher;
/// Task ledger with live cancellation handles
pub mod ledger;
/// DASH manifest rewriting
pub mod manifest;
/// External muxing capability
pub mod muxer;
/// Content-signature file typing
pub mod sniff;
/// Core types
pub mod types;

mod pipeline;

// Re-export commonly used types
pub use capability::{
    MediaIndexer, NoOpIndexer, NoOpNotifier, NoOpResolver, Notifier, RemoteResolver,
    TracingNotifier,
};
pub use config::Config;
pub use controller::DownloadController;
pub use db::Database;
pub use error::{CryptoError, DatabaseError, Error, FetchError, Result};
pub use fetcher::{FetchedMedia, Fetcher, ResolvedFile};
pub use ledger::TaskLedger;
pub use muxer::{CliMuxer, Muxer, MuxerCapabilities, NoOpMuxer};
pub use sniff::FileKind;
pub use types::{
    DashOptions, DownloadRequest, DownloadStage, EncryptionKeyPair, InputKind, InputMedia,
    MediaCategory, MediaFilter, PendingTask, TaskId, TaskTemplate,
};
