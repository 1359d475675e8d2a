//! Export pipeline
//!
//! This module provides the concurrent export pipeline:
//! - [`Dispatcher`] selects objects and feeds the shared [`WorkQueue`]
//! - [`WorkerPool`] runs one [`ExportWorker`] per database connection
//! - [`ObjectGroupAccumulator`] batches 3D-model objects per worker and class
//! - [`BundleSink`] receives the finished bundles
//! - [`ExportCoordinator`] wires everything together and reports an
//!   [`ExportSummary`]

pub mod accumulator;
pub mod coordinator;
pub mod dispatcher;
pub mod pool;
pub mod queue;
pub mod sink;
pub mod summary;
pub mod worker;

pub use accumulator::ObjectGroupAccumulator;
pub use coordinator::ExportCoordinator;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use pool::{RunningPool, WorkerPool};
pub use queue::{QueueSender, WorkQueue};
pub use sink::{BundleSink, ChannelSink};
pub use summary::{ExportError, ExportErrorType, ExportSummary};
pub use worker::{ExportWorker, WorkerReport, WorkerSettings, WorkerState};

use tokio::sync::watch;

/// Resolves once shutdown has been requested
///
/// Never resolves if the sender is dropped without requesting shutdown.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
