//! Sync Worker
//!
//! Background worker that takes [`SyncTrigger`] messages off a queue and
//! runs them one at a time. The configuration is loaded fresh for every run.
//! The worker stops once every [`SyncHandle`] has been dropped and the queue
//! is drained.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument};

use dirsync_directory::{ConfigError, DirectoryConfig};

use crate::engine::{ReconciliationEngine, CONFIG_ERROR_CODE};
use crate::report::{SyncMode, SyncReport};
use crate::trigger::SyncTrigger;

/// Supplies the directory configuration at the start of each run.
pub type ConfigLoader = Arc<dyn Fn() -> Result<DirectoryConfig, ConfigError> + Send + Sync>;

/// Errors seen by a [`SyncHandle`].
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker is no longer accepting triggers.
    #[error("Sync worker has stopped")]
    Stopped,

    /// The worker dropped the request without reporting back.
    #[error("Sync worker dropped the request before it completed")]
    NoReply,
}

struct SyncRequest {
    trigger: SyncTrigger,
    reply: Option<oneshot::Sender<SyncReport>>,
}

/// Enqueues triggers for a [`SyncWorker`].
#[derive(Clone)]
pub struct SyncHandle {
    sender: mpsc::Sender<SyncRequest>,
}

impl SyncHandle {
    /// Enqueue a trigger without waiting for the run.
    pub async fn trigger(&self, trigger: SyncTrigger) -> Result<(), WorkerError> {
        self.sender
            .send(SyncRequest {
                trigger,
                reply: None,
            })
            .await
            .map_err(|_| WorkerError::Stopped)
    }

    /// Enqueue a trigger and wait for its report.
    pub async fn run(&self, trigger: SyncTrigger) -> Result<SyncReport, WorkerError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(SyncRequest {
                trigger,
                reply: Some(reply),
            })
            .await
            .map_err(|_| WorkerError::Stopped)?;
        receiver.await.map_err(|_| WorkerError::NoReply)
    }
}

/// Runs queued synchronizations sequentially.
pub struct SyncWorker {
    engine: Arc<ReconciliationEngine>,
    config: ConfigLoader,
    receiver: mpsc::Receiver<SyncRequest>,
}

impl SyncWorker {
    /// Create a worker and the handle that feeds it.
    ///
    /// `capacity` bounds the number of triggers waiting in the queue.
    #[must_use]
    pub fn channel(
        engine: Arc<ReconciliationEngine>,
        config: ConfigLoader,
        capacity: usize,
    ) -> (Self, SyncHandle) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = Self {
            engine,
            config,
            receiver,
        };
        (worker, SyncHandle { sender })
    }

    /// Process triggers until the queue is closed.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Starting sync worker");

        while let Some(request) = self.receiver.recv().await {
            let report = self.process(&request.trigger).await;
            if let Some(reply) = request.reply {
                if reply.send(report).is_err() {
                    debug!("Trigger sender no longer waiting for the report");
                }
            }
        }

        info!("Sync worker stopped");
    }

    async fn process(&self, trigger: &SyncTrigger) -> SyncReport {
        let config = match (self.config)() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Failed to load directory configuration");
                let mut report = SyncReport::start(SyncMode::for_target(trigger.target_login()));
                report.abort(CONFIG_ERROR_CODE, e.to_string());
                return report;
            }
        };

        self.engine.run_sync(&config, trigger.target_login()).await
    }
}
