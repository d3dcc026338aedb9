//! Concurrent input resolution
//!
//! Resolves every [`InputMedia`] of a request to a local file, in parallel.
//! Per-input network and I/O failures are soft: the input is logged and
//! omitted from the result map, and later stages fail loudly on the missing
//! key. Crypto failures and cancellation abort the whole request — a
//! payload that decrypts wrongly is never silently dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::capability::RemoteResolver;
use crate::config::FetchConfig;
use crate::crypto::{decode_base64url, decrypt_media_detached};
use crate::error::{Error, FetchError, Result};
use crate::sniff::{self, FileKind};
use crate::types::{DownloadRequest, InputKind, InputMedia};

/// A locally materialized input plus its sniffed type
#[derive(Clone, Debug)]
pub struct ResolvedFile {
    /// Path of the materialized file — under the run's scratch directory for
    /// every kind except `LocalPath`
    pub path: PathBuf,
    /// Content-sniffed type, determined immediately after materialization
    pub kind: FileKind,
}

/// Result of fetching all inputs of a request
#[derive(Debug, Default)]
pub struct FetchedMedia {
    /// Successfully resolved inputs, keyed by their declaration
    pub files: HashMap<InputMedia, ResolvedFile>,
    /// Number of inputs dropped by the soft-failure policy
    ///
    /// Deliberately observable: the omission itself is policy, but tests and
    /// diagnostics need to see it happened.
    pub dropped: usize,
}

/// Resolves request inputs to local files
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    resolver: Arc<dyn RemoteResolver>,
}

impl Fetcher {
    /// Build a fetcher from config; the HTTP client carries the fixed
    /// identifying User-Agent on every request
    pub fn new(config: &FetchConfig, resolver: Arc<dyn RemoteResolver>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, resolver })
    }

    /// Fetch every input of the request concurrently
    ///
    /// Completes only once every per-input task has finished. Returns an
    /// error only for cancellation or a fatal (crypto) failure; everything
    /// else degrades to an omission counted in [`FetchedMedia::dropped`].
    pub async fn fetch_all(
        &self,
        request: &DownloadRequest,
        scratch: &Path,
        token: &CancellationToken,
    ) -> Result<FetchedMedia> {
        let mut handles = Vec::with_capacity(request.inputs.len());
        for (index, input) in request.inputs.iter().cloned().enumerate() {
            let fetcher = self.clone();
            let scratch = scratch.to_path_buf();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                fetcher.fetch_one(index, input, &scratch, &token).await
            }));
        }

        let mut fetched = FetchedMedia::default();
        let mut fatal: Option<Error> = None;

        for joined in futures::future::join_all(handles).await {
            let outcome = joined.map_err(|e| Error::Other(format!("fetch task panicked: {e}")))?;
            match outcome {
                Ok(Some((input, resolved))) => {
                    fetched.files.insert(input, resolved);
                }
                Ok(None) => fetched.dropped += 1,
                Err(e) => {
                    // Siblings have already run to completion; report the
                    // first fatal error once all of them are accounted for.
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        debug!(
            resolved = fetched.files.len(),
            dropped = fetched.dropped,
            "fetched request inputs"
        );
        Ok(fetched)
    }

    /// Resolve one input
    ///
    /// `Ok(None)` is the soft-failure omission; `Err` is fatal to the whole
    /// request (cancellation or decryption failure).
    async fn fetch_one(
        &self,
        index: usize,
        input: InputMedia,
        scratch: &Path,
        token: &CancellationToken,
    ) -> Result<Option<(InputMedia, ResolvedFile)>> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let bytes = match input.kind {
            InputKind::ProtoReference => {
                let reference = match decode_base64url(&input.content) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return Ok(self.drop_input(index, FetchError::Encoding(e.to_string())));
                    }
                };
                let resolved = tokio::select! {
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    resolved = self.resolver.resolve(&reference) => resolved,
                };
                match resolved {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => return Ok(self.drop_input(index, FetchError::Unresolved)),
                    Err(e) => {
                        return Ok(self.drop_input(index, FetchError::Network(e.to_string())));
                    }
                }
            }
            InputKind::DirectBytes => match decode_base64url(&input.content) {
                Ok(bytes) => bytes,
                Err(e) => return Ok(self.drop_input(index, FetchError::Encoding(e.to_string()))),
            },
            InputKind::RemoteUrl => {
                let response = tokio::select! {
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    response = self.client.get(&input.content).send() => response,
                };
                let response = match response.and_then(|r| r.error_for_status()) {
                    Ok(response) => response,
                    Err(e) => {
                        return Ok(self.drop_input(index, FetchError::Network(e.to_string())));
                    }
                };
                let body = tokio::select! {
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    body = response.bytes() => body,
                };
                match body {
                    Ok(bytes) => bytes.to_vec(),
                    Err(e) => {
                        return Ok(self.drop_input(index, FetchError::Network(e.to_string())));
                    }
                }
            }
            InputKind::LocalPath => {
                // Used in place — no copy, no temp file, no decryption
                let path = PathBuf::from(&input.content);
                let kind = match sniff::sniff_file(&path).await {
                    Ok(kind) => kind,
                    Err(e) => return Ok(self.drop_input(index, FetchError::Io(e.to_string()))),
                };
                return Ok(Some((input, ResolvedFile { path, kind })));
            }
        };

        // Decryption failures are fatal, not omissions
        let bytes = match &input.encryption {
            Some(keys) => {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                decrypt_media_detached(bytes, keys).await?
            }
            None => bytes,
        };

        let kind = sniff::sniff(&bytes);
        let path = scratch.join(format!("media-{index:02}"));
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            return Ok(self.drop_input(index, FetchError::Io(e.to_string())));
        }

        Ok(Some((input, ResolvedFile { path, kind })))
    }

    /// Log and apply the soft-failure omission policy
    fn drop_input(
        &self,
        index: usize,
        error: FetchError,
    ) -> Option<(InputMedia, ResolvedFile)> {
        warn!(input_index = index, %error, "dropping input from result map");
        None
    }
}
