//! Export workers
//!
//! A worker owns one database connection and competes with its siblings for
//! work items on the shared queue. Each item goes through two phases:
//!
//! 1. **Load**: read the object and render its balloon. Interruptible by
//!    shutdown; an interrupted item is reported as unprocessed.
//! 2. **Commit**: emit a bundle directly, or add the object to this worker's
//!    accumulator for its class and flush it when full. Never interrupted.
//!
//! When the queue is closed and empty the worker drains: every open
//! accumulator is flushed, the transaction is committed and the connection
//! is released.

use super::accumulator::ObjectGroupAccumulator;
use super::queue::WorkQueue;
use super::shutdown_requested;
use super::sink::BundleSink;
use crate::adapters::database::ExportConnection;
use crate::balloon::BalloonRegistry;
use crate::config::CityKmlConfig;
use crate::core::reader::ObjectReader;
use crate::domain::{Bundle, CityObjectClass, ExportedObject, Lod, Result, WorkItem};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Settings shared read-only by every worker of a pool
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub reader: ObjectReader,
    pub balloons: BalloonRegistry,
    group_limits: BTreeMap<CityObjectClass, usize>,
    default_group_limit: usize,
}

impl WorkerSettings {
    pub fn new(lod: Lod, balloons: BalloonRegistry, default_group_limit: usize) -> Self {
        Self {
            reader: ObjectReader::new(lod),
            balloons,
            group_limits: BTreeMap::new(),
            default_group_limit,
        }
    }

    /// Builds settings from configuration, compiling balloon templates once
    pub fn from_config(config: &CityKmlConfig) -> Self {
        let mut settings = Self::new(
            config.export.lod,
            BalloonRegistry::from_config(config),
            config.export.default_group_limit,
        );
        settings.group_limits = config.export.group_limits.clone();
        settings
    }

    pub fn with_group_limit(mut self, class: CityObjectClass, limit: usize) -> Self {
        self.group_limits.insert(class, limit);
        self
    }

    pub fn group_limit(&self, class: CityObjectClass) -> usize {
        self.group_limits
            .get(&class)
            .copied()
            .unwrap_or(self.default_group_limit)
            .max(1)
    }

    pub fn lod(&self) -> Lod {
        self.reader.lod()
    }
}

/// What one worker did before it stopped
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Items loaded and handed to the commit phase
    pub processed: usize,
    /// Items without geometry
    pub skipped: usize,
    /// Items whose load failed
    pub failed: usize,
    pub bundles_by_class: BTreeMap<CityObjectClass, usize>,
    pub objects_by_class: BTreeMap<CityObjectClass, usize>,
    /// Bundles the sink refused
    pub undelivered_bundles: usize,
    /// Items dequeued but not exported because of shutdown
    pub unprocessed: Vec<WorkItem>,
    pub connection_lost: bool,
    pub interrupted: bool,
}

impl WorkerReport {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Self::default()
        }
    }

    /// Items this worker took off the queue
    pub fn dequeued(&self) -> usize {
        self.processed + self.skipped + self.failed + self.unprocessed.len()
    }

    pub fn total_bundles(&self) -> usize {
        self.bundles_by_class.values().sum()
    }

    pub fn total_objects(&self) -> usize {
        self.objects_by_class.values().sum()
    }

    fn record_bundle(&mut self, class: CityObjectClass, objects: usize) {
        *self.bundles_by_class.entry(class).or_default() += 1;
        *self.objects_by_class.entry(class).or_default() += objects;
    }
}

pub struct ExportWorker<C: ExportConnection> {
    id: usize,
    connection: C,
    queue: WorkQueue<WorkItem>,
    sink: Arc<dyn BundleSink>,
    settings: Arc<WorkerSettings>,
    shutdown: watch::Receiver<bool>,
    state: WorkerState,
    accumulators: HashMap<CityObjectClass, ObjectGroupAccumulator>,
    report: WorkerReport,
}

impl<C: ExportConnection> ExportWorker<C> {
    pub fn new(
        id: usize,
        connection: C,
        queue: WorkQueue<WorkItem>,
        sink: Arc<dyn BundleSink>,
        settings: Arc<WorkerSettings>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            connection,
            queue,
            sink,
            settings,
            shutdown,
            state: WorkerState::Idle,
            accumulators: HashMap::new(),
            report: WorkerReport::new(id),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, state: WorkerState) {
        tracing::debug!(worker = self.id, from = ?self.state, to = ?state, "Worker state change");
        self.state = state;
    }

    /// Consumes the queue until it is drained, shutdown is requested or the
    /// connection is lost, then releases the connection
    pub async fn run(&mut self) -> WorkerReport {
        self.transition(WorkerState::Running);
        let mut shutdown = self.shutdown.clone();

        loop {
            if *shutdown.borrow() {
                self.report.interrupted = true;
                break;
            }

            let next = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => None,
                item = self.queue.take() => Some(item),
            };
            let item = match next {
                None => {
                    self.report.interrupted = true;
                    break;
                }
                Some(None) => break,
                Some(Some(item)) => item,
            };

            let loaded = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => None,
                result = self.load(&item) => Some(result),
            };

            match loaded {
                None => {
                    tracing::info!(
                        worker = self.id,
                        object_id = %item.object_id(),
                        "Interrupted while loading, item left unprocessed"
                    );
                    self.report.unprocessed.push(item);
                    self.report.interrupted = true;
                    break;
                }
                Some(Ok(Some(object))) => self.commit(&item, object).await,
                Some(Ok(None)) => self.report.skipped += 1,
                Some(Err(e)) if e.is_connection_lost() => {
                    tracing::error!(
                        worker = self.id,
                        object_id = %item.object_id(),
                        error = %e,
                        "Database connection lost, worker stopping"
                    );
                    self.report.failed += 1;
                    self.report.connection_lost = true;
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        worker = self.id,
                        object_id = %item.object_id(),
                        class = %item.class(),
                        error = %e,
                        "Failed to export object"
                    );
                    self.report.failed += 1;
                }
            }
        }

        self.drain().await;
        std::mem::take(&mut self.report)
    }

    async fn load(&self, item: &WorkItem) -> Result<Option<ExportedObject>> {
        let Some(mut object) = self.settings.reader.read(&self.connection, item).await? else {
            return Ok(None);
        };

        if let Some(handler) = self.settings.balloons.get(item.class()) {
            object.placemark.description = handler
                .content(&self.connection, item.object_id(), self.settings.lod())
                .await?;
        }

        Ok(Some(object))
    }

    async fn commit(&mut self, item: &WorkItem, object: ExportedObject) {
        self.report.processed += 1;

        if !item.is_batchable() {
            self.emit(Bundle::single(object)).await;
            return;
        }

        let class = item.class();
        let limit = self.settings.group_limit(class);
        let full = match self.accumulators.entry(class) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().add(object);
                entry.get().is_full()
            }
            Entry::Vacant(entry) => entry
                .insert(ObjectGroupAccumulator::start(object, limit))
                .is_full(),
        };

        if full {
            if let Some(accumulator) = self.accumulators.remove(&class) {
                self.emit(accumulator.flush()).await;
            }
        }
    }

    async fn emit(&mut self, bundle: Bundle) {
        let class = bundle.class;
        let size = bundle.size();
        let representative_id = bundle.representative_id;

        match self.sink.send(bundle).await {
            Ok(()) => self.report.record_bundle(class, size),
            Err(e) => {
                tracing::error!(
                    worker = self.id,
                    representative_id = %representative_id,
                    error = %e,
                    "Bundle could not be delivered"
                );
                self.report.undelivered_bundles += 1;
            }
        }
    }

    async fn drain(&mut self) {
        self.transition(WorkerState::Draining);

        let mut open: Vec<_> = self.accumulators.drain().collect();
        open.sort_by_key(|(class, _)| *class);
        for (_, accumulator) in open {
            self.emit(accumulator.flush()).await;
        }

        if !self.report.connection_lost {
            if let Err(e) = self.connection.commit().await {
                tracing::warn!(worker = self.id, error = %e, "Commit failed");
            }
        }
        self.connection.close().await;

        self.transition(WorkerState::Stopped);
        tracing::info!(
            worker = self.id,
            processed = self.report.processed,
            skipped = self.report.skipped,
            failed = self.report.failed,
            bundles = self.report.total_bundles(),
            unprocessed = self.report.unprocessed.len(),
            "Worker stopped"
        );
    }
}
