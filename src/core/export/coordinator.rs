//! Export coordinator - main orchestrator for the export process
//!
//! This module wires the dispatcher, the worker pool and the output writers
//! together and folds their reports into one [`ExportSummary`].

use crate::adapters::database::{create_connection_provider, ConnectionProvider, ExportConnection};
use crate::adapters::output::{OutputSettings, OutputWriterPool};
use crate::adapters::postgresql::PostgreSQLClient;
use crate::config::CityKmlConfig;
use crate::core::export::dispatcher::Dispatcher;
use crate::core::export::pool::WorkerPool;
use crate::core::export::queue::{QueueSender, WorkQueue};
use crate::core::export::sink::BundleSink;
use crate::core::export::summary::{ExportError, ExportErrorType, ExportSummary};
use crate::core::export::worker::WorkerSettings;
use crate::core::reader::has_geometry_at;
use crate::domain::{Result, WorkItem};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Export coordinator
pub struct ExportCoordinator<P: ConnectionProvider = PostgreSQLClient> {
    config: CityKmlConfig,
    provider: Arc<P>,
    shutdown: watch::Receiver<bool>,
}

impl ExportCoordinator<PostgreSQLClient> {
    /// Create a coordinator for the configured PostgreSQL city database
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the database is not
    /// reachable.
    pub async fn new(config: CityKmlConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let provider = create_connection_provider(&config)?;
        provider.test_connection().await?;
        Ok(Self::with_provider(config, provider, shutdown))
    }
}

impl<P: ConnectionProvider + 'static> ExportCoordinator<P> {
    /// Create a coordinator over any connection provider
    pub fn with_provider(
        config: CityKmlConfig,
        provider: Arc<P>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            provider,
            shutdown,
        }
    }

    /// Execute the export
    ///
    /// Starts the output writers, runs the pipeline into them and waits for
    /// every bundle to be written.
    ///
    /// # Errors
    ///
    /// Returns an error if the output writers cannot start or no worker can
    /// acquire a connection.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let (sink, writers) =
            OutputWriterPool::start(&OutputSettings::from_config(&self.config.export)).await?;

        let pipeline = self.run_pipeline(Arc::new(sink)).await;
        // All sink clones are gone once the pipeline returns
        let stats = writers.join().await;
        let mut summary = pipeline?;

        summary.bundles_written = stats.written;
        summary.write_failures = stats.failed;
        if stats.failed > 0 {
            summary.add_error(ExportError::new(
                ExportErrorType::Output,
                format!("{} bundle(s) could not be written", stats.failed),
            ));
        }

        summary.log_summary();
        Ok(summary)
    }

    /// Runs dispatcher and workers, delivering bundles to `sink`
    ///
    /// This is the main entry point for the export process. It:
    /// 1. Validates configuration
    /// 2. Compiles balloon templates once for all workers
    /// 3. Starts one worker per connection
    /// 4. Dispatches work items until the selection is exhausted
    /// 5. Waits for the workers to drain and merges their reports
    ///
    /// # Errors
    ///
    /// Returns an error if no worker can acquire a connection.
    pub async fn run_pipeline(&self, sink: Arc<dyn BundleSink>) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary {
            dry_run: self.config.export.dry_run,
            ..ExportSummary::new()
        };

        tracing::info!("Starting export process");

        // Validate configuration
        if let Err(e) = self.config.validate() {
            let error = ExportError::new(ExportErrorType::Configuration, e);
            summary.add_error(error);
            return Ok(summary.with_duration(start_time.elapsed()));
        }

        let export = &self.config.export;
        for class in &export.classes {
            if !has_geometry_at(*class, export.lod) {
                tracing::warn!(class = %class, lod = %export.lod, "Class has no geometry at this LOD");
            }
        }

        let settings = Arc::new(WorkerSettings::from_config(&self.config));
        let (sender, queue) = WorkQueue::bounded(export.queue_capacity);

        let pool = WorkerPool::new(Arc::clone(&self.provider), settings, sink, export.workers);
        let running = pool.start(queue, self.shutdown.clone()).await?;
        drop(pool);

        tracing::info!(
            workers = running.size(),
            classes = ?export.classes,
            display_forms = ?export.display_forms,
            lod = %export.lod,
            "Processing city objects"
        );

        self.dispatch(sender, &mut summary).await;

        let reports = running
            .join_or_abort(
                self.shutdown.clone(),
                Duration::from_secs(export.shutdown_timeout_secs),
            )
            .await;
        for report in &reports {
            summary.add_worker_report(report);
        }
        summary.interrupted |= *self.shutdown.borrow();

        Ok(summary.with_duration(start_time.elapsed()))
    }

    /// Runs the dispatcher on its own connection; the queue closes when
    /// `sender` is dropped at the end
    async fn dispatch(&self, sender: QueueSender<WorkItem>, summary: &mut ExportSummary) {
        let dispatcher = Dispatcher::from_config(&self.config.export);

        let mut connection = match self.provider.acquire().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(error = %e, "Dispatcher could not acquire a connection");
                summary.add_error(ExportError::new(
                    ExportErrorType::Connection,
                    format!("Dispatcher could not acquire a connection: {e}"),
                ));
                return;
            }
        };

        match dispatcher
            .dispatch(&connection, sender, self.shutdown.clone())
            .await
        {
            Ok(report) => summary.add_dispatch_report(&report),
            Err(e) => {
                tracing::error!(error = %e, "Dispatch failed");
                let error_type = if e.is_connection_lost() {
                    ExportErrorType::Connection
                } else {
                    ExportErrorType::Query
                };
                summary.add_error(ExportError::new(error_type, format!("Dispatch failed: {e}")));
            }
        }

        if let Err(e) = connection.commit().await {
            tracing::debug!(error = %e, "Dispatcher commit failed");
        }
        connection.close().await;
    }
}
