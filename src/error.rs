//! Error types for media-dl
//!
//! This module provides the error taxonomy for the pipeline:
//! - Per-input fetch problems ([`FetchError`]) are soft failures — the
//!   fetcher logs them and omits the input from its result map
//! - Everything else aborts the whole request and is mapped to a terminal
//!   ledger stage at the controller boundary
//! - Cancellation is modeled as [`Error::Cancelled`] and is explicitly not a
//!   failure: it never produces a user notification

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant carries enough context to produce a useful user-facing
/// message; the controller persists `to_string()` on the ledger entry.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "media_dir")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Decryption failed (bad key/iv material or padding)
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Malformed archive container
    #[error("archive error in {archive}: {reason}")]
    Archive {
        /// The archive file that failed to open or read
        archive: PathBuf,
        /// The reason reported by the zip reader
        reason: String,
    },

    /// A required input never resolved to a local file
    #[error("missing media: {0}")]
    MissingMedia(String),

    /// A structural precondition of the selected branch was violated
    ///
    /// Overlay merge requires exactly one video and one image; the DASH
    /// branch requires a single remote-fetched manifest. These are
    /// programmer-visible request construction errors, not runtime flakes.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// DASH manifest could not be parsed or rewritten
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Overlay compositing failed — maps to the `MergeFailed` ledger stage
    #[error("overlay merge failed: {0}")]
    Merge(String),

    /// DASH chapter muxing failed — maps to the `Failed` ledger stage,
    /// distinct from overlay failures
    #[error("dash mux failed: {0}")]
    Dash(String),

    /// External tool execution failed (ffmpeg spawn, non-zero exit)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, no-op implementation)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Task not found in the ledger
    #[error("task not found: {0}")]
    NotFound(String),

    /// The request was cancelled via its ledger handle
    ///
    /// Not a failure: the controller suppresses notifications and leaves the
    /// ledger entry in whatever stage it last reached.
    #[error("cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error represents cancellation rather than failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Decryption errors (key material and padding)
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Decoded key is not a supported AES key size
    #[error("invalid key length: {0} bytes (expected 16 or 32)")]
    InvalidKeyLength(usize),

    /// Decoded IV is not one cipher block
    #[error("invalid iv length: {0} bytes (expected 16)")]
    InvalidIvLength(usize),

    /// Key or IV was not valid base64url
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),

    /// PKCS#7 padding validation failed — wrong key or corrupt ciphertext
    #[error("padding validation failed")]
    BadPadding,
}

/// Per-input fetch errors
///
/// These never escape the fetcher: each one is logged with a warning and the
/// affected input is omitted from the result map. Later stages detect the
/// omission through missing-key lookups and fail with
/// [`Error::MissingMedia`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed or returned a non-success status
    #[error("network failure: {0}")]
    Network(String),

    /// Reading or writing the temp file failed
    #[error("I/O failure: {0}")]
    Io(String),

    /// The external resolver returned no stream for a proto reference
    #[error("resolver returned no stream")]
    Unresolved,

    /// Input content was not valid base64url
    #[error("invalid content encoding: {0}")]
    Encoding(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}
