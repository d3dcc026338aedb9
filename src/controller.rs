//! Pipeline controller — the entry point binding requests to ledger tasks
//!
//! One `handle` call per inbound request: the ledger entry is registered
//! before any I/O so list consumers see it immediately, then the pipeline
//! runs as an independent background task under a cancellable context. All
//! otherwise-unhandled failures are caught here, mapped to a terminal
//! stage, persisted, and reported through the notifier. Cancellation is
//! distinct from failure: it stops the run silently.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::capability::{MediaIndexer, Notifier, RemoteResolver};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::ledger::TaskLedger;
use crate::muxer::{CliMuxer, Muxer, NoOpMuxer};
use crate::pipeline::Pipeline;
use crate::types::{DownloadRequest, DownloadStage, TaskId, TaskTemplate};

/// Main controller instance (cloneable — all state is Arc-wrapped)
#[derive(Clone)]
pub struct DownloadController {
    db: Arc<Database>,
    ledger: Arc<TaskLedger>,
    pipeline: Arc<Pipeline>,
    notifier: Arc<dyn Notifier>,
}

impl DownloadController {
    /// Create a new controller
    ///
    /// This initializes all core components:
    /// - Creates the media and temp directories
    /// - Opens/creates the SQLite ledger database and runs migrations
    /// - Selects a muxer implementation from the tools config
    pub async fn new(
        config: Config,
        notifier: Arc<dyn Notifier>,
        resolver: Arc<dyn RemoteResolver>,
        indexer: Arc<dyn MediaIndexer>,
    ) -> Result<Self> {
        // Select the muxer the way external tools are usually wired:
        // explicit path wins, then PATH discovery, then graceful no-op
        let muxer: Arc<dyn Muxer> = if let Some(ref ffmpeg_path) = config.tools.ffmpeg_path {
            Arc::new(CliMuxer::new(ffmpeg_path.clone()))
        } else if config.tools.search_path {
            CliMuxer::from_path()
                .map(|m| Arc::new(m) as Arc<dyn Muxer>)
                .unwrap_or_else(|| Arc::new(NoOpMuxer))
        } else {
            Arc::new(NoOpMuxer)
        };

        Self::with_muxer(config, notifier, resolver, indexer, muxer).await
    }

    /// Create a controller with an explicit muxer implementation
    pub async fn with_muxer(
        config: Config,
        notifier: Arc<dyn Notifier>,
        resolver: Arc<dyn RemoteResolver>,
        indexer: Arc<dyn MediaIndexer>,
        muxer: Arc<dyn Muxer>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.storage.media_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create media directory '{}': {}",
                        config.storage.media_dir.display(),
                        e
                    ),
                ))
            })?;
        tokio::fs::create_dir_all(&config.storage.temp_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create temp directory '{}': {}",
                        config.storage.temp_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let ledger = Arc::new(TaskLedger::new(
            db.clone(),
            config.persistence.query_page_size,
        ));

        let capabilities = muxer.capabilities();
        info!(
            muxer = muxer.name(),
            can_merge_overlay = capabilities.can_merge_overlay,
            can_mux_dash = capabilities.can_mux_dash,
            "controller initialized"
        );

        let config = Arc::new(config);
        let pipeline = Arc::new(Pipeline {
            config: config.clone(),
            ledger: ledger.clone(),
            fetcher: Fetcher::new(&config.fetch, resolver)?,
            muxer,
            notifier: notifier.clone(),
            indexer,
        });

        Ok(Self {
            db,
            ledger,
            pipeline,
            notifier,
        })
    }

    /// The ledger query surface exposed to list consumers
    pub fn ledger(&self) -> &Arc<TaskLedger> {
        &self.ledger
    }

    /// Handle an inbound download request, fire-and-forget
    ///
    /// Registers the ledger entry in `Downloading` stage, binds a
    /// cancellation handle, and spawns the pipeline run. Returns the new
    /// task id immediately; completion is observable through the ledger.
    pub async fn handle(&self, request: DownloadRequest, template: TaskTemplate) -> Result<TaskId> {
        request.validate()?;

        let (id, token) = self.ledger.add_task(&template).await?;

        let pipeline = self.pipeline.clone();
        let ledger = self.ledger.clone();
        let notifier = self.notifier.clone();
        let output_path = template.output_path.clone();

        tokio::spawn(async move {
            match pipeline.run(id, &request, &output_path, &token).await {
                Ok(()) => {
                    debug!(task_id = id.0, "pipeline run complete");
                }
                Err(e) if e.is_cancellation() => {
                    // Cancellation short-circuits silently: no terminal
                    // stage is forced and no failure notification fires
                    debug!(task_id = id.0, "pipeline run cancelled");
                }
                Err(e) => {
                    let stage = terminal_stage_for(&e);
                    let message = e.to_string();
                    error!(task_id = id.0, error = %message, ?stage, "pipeline run failed");

                    if let Err(db_err) = ledger.set_error(id, &message).await {
                        error!(task_id = id.0, error = %db_err, "failed to persist error message");
                    }
                    if let Err(db_err) = ledger.update_stage(id, stage).await {
                        error!(task_id = id.0, error = %db_err, "failed to persist terminal stage");
                    }

                    notifier.notify_long(&notification_for(&e)).await;
                }
            }
            ledger.release_handle(id).await;
        });

        Ok(id)
    }

    /// Handle the serialized trigger contract: a JSON [`DownloadRequest`]
    /// plus a JSON [`TaskTemplate`]
    pub async fn handle_serialized(&self, request: &str, template: &str) -> Result<TaskId> {
        let request: DownloadRequest = serde_json::from_str(request)?;
        let template: TaskTemplate = serde_json::from_str(template)?;
        self.handle(request, template).await
    }

    /// Close the ledger database pool
    pub async fn close(&self) {
        self.db.close().await;
    }
}

/// Terminal stage an error maps to — overlay failures get their own stage
fn terminal_stage_for(error: &Error) -> DownloadStage {
    match error {
        Error::Merge(_) => DownloadStage::MergeFailed,
        _ => DownloadStage::Failed,
    }
}

/// User-facing failure message per branch
fn notification_for(error: &Error) -> String {
    match error {
        Error::Merge(reason) => format!("Failed to merge overlay: {reason}"),
        Error::Dash(reason) => format!("Failed to download dash media: {reason}"),
        other => format!("Failed to download media: {other}"),
    }
}
