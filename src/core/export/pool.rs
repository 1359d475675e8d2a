//! Worker pool
//!
//! Starts a fixed number of [`ExportWorker`]s, each as its own tokio task
//! holding one connection for its whole life.

use super::queue::WorkQueue;
use super::shutdown_requested;
use super::sink::BundleSink;
use super::worker::{ExportWorker, WorkerReport, WorkerSettings};
use crate::adapters::database::ConnectionProvider;
use crate::domain::{DatabaseError, Result, WorkItem};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct WorkerPool<P: ConnectionProvider> {
    provider: Arc<P>,
    settings: Arc<WorkerSettings>,
    sink: Arc<dyn BundleSink>,
    size: usize,
}

impl<P: ConnectionProvider + 'static> WorkerPool<P> {
    pub fn new(
        provider: Arc<P>,
        settings: Arc<WorkerSettings>,
        sink: Arc<dyn BundleSink>,
        size: usize,
    ) -> Self {
        Self {
            provider,
            settings,
            sink,
            size: size.max(1),
        }
    }

    /// Acquires one connection per worker and spawns the workers
    ///
    /// Workers whose connection cannot be acquired are not started.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connection` if no worker could be started.
    pub async fn start(
        &self,
        queue: WorkQueue<WorkItem>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunningPool> {
        let mut handles = Vec::with_capacity(self.size);

        for id in 0..self.size {
            let connection = match self.provider.acquire().await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::error!(worker = id, error = %e, "Worker could not acquire a connection");
                    continue;
                }
            };

            let mut worker = ExportWorker::new(
                id,
                connection,
                queue.clone(),
                Arc::clone(&self.sink),
                Arc::clone(&self.settings),
                shutdown.clone(),
            );
            handles.push(tokio::spawn(async move { worker.run().await }));
        }

        if handles.is_empty() {
            return Err(DatabaseError::Connection(
                "No export worker could acquire a database connection".to_string(),
            )
            .into());
        }

        tracing::info!(
            workers = handles.len(),
            requested = self.size,
            "Export workers started"
        );
        Ok(RunningPool { handles })
    }
}

/// Handles of the spawned workers
pub struct RunningPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl RunningPool {
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to stop
    ///
    /// A worker task that panicked or was aborted contributes no report.
    pub async fn join(self) -> Vec<WorkerReport> {
        futures::future::join_all(self.handles)
            .await
            .into_iter()
            .enumerate()
            .filter_map(|(id, joined)| match joined {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::error!(worker = id, error = %e, "Worker task did not complete");
                    None
                }
            })
            .collect()
    }

    /// Waits for every worker, aborting stragglers once `grace` has passed
    /// after a shutdown request
    pub async fn join_or_abort(
        self,
        mut shutdown: watch::Receiver<bool>,
        grace: Duration,
    ) -> Vec<WorkerReport> {
        let aborts: Vec<_> = self.handles.iter().map(|h| h.abort_handle()).collect();
        let joined = self.join();
        tokio::pin!(joined);

        tokio::select! {
            reports = &mut joined => reports,
            _ = async {
                shutdown_requested(&mut shutdown).await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    timeout_secs = grace.as_secs(),
                    "Workers did not stop within the shutdown timeout, aborting"
                );
                for abort in &aborts {
                    abort.abort();
                }
                joined.await
            }
        }
    }
}
