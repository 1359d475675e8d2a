//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use super::dispatcher::DispatchReport;
use super::worker::WorkerReport;
use crate::domain::CityObjectClass;
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary of an export operation
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Work items put on the queue
    pub items_dispatched: usize,

    /// Group members expanded from selected city object groups
    pub group_members: usize,

    /// Items loaded and exported
    pub processed: usize,

    /// Items without geometry at the requested LOD
    pub skipped: usize,

    /// Items whose export failed
    pub failed: usize,

    /// Items dequeued but left unprocessed by a shutdown
    pub unprocessed: usize,

    /// Bundles emitted per class
    pub bundles_by_class: BTreeMap<CityObjectClass, usize>,

    /// Objects contained in those bundles per class
    pub objects_by_class: BTreeMap<CityObjectClass, usize>,

    /// Bundles written by the output writers
    pub bundles_written: usize,

    /// Bundles the output writers failed to store
    pub write_failures: usize,

    /// Workers that ran
    pub workers: usize,

    /// Workers that stopped because their connection was lost
    pub workers_lost: usize,

    /// Whether the export was interrupted by a shutdown signal
    pub interrupted: bool,

    /// Whether output was only serialized, not stored
    pub dry_run: bool,

    /// Duration of the export
    pub duration: Duration,

    /// Errors encountered during export
    pub errors: Vec<ExportError>,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    pub fn add_dispatch_report(&mut self, report: &DispatchReport) {
        self.items_dispatched += report.enqueued;
        self.group_members += report.group_members;
        self.interrupted |= report.interrupted;
    }

    /// Folds one worker's report into the totals
    pub fn add_worker_report(&mut self, report: &WorkerReport) {
        self.workers += 1;
        self.processed += report.processed;
        self.skipped += report.skipped;
        self.failed += report.failed;
        self.unprocessed += report.unprocessed.len();
        self.interrupted |= report.interrupted;

        for (class, count) in &report.bundles_by_class {
            *self.bundles_by_class.entry(*class).or_default() += count;
        }
        for (class, count) in &report.objects_by_class {
            *self.objects_by_class.entry(*class).or_default() += count;
        }

        if report.connection_lost {
            self.workers_lost += 1;
            self.add_error(
                ExportError::new(
                    ExportErrorType::Connection,
                    "Database connection lost".to_string(),
                )
                .with_context(format!("worker={}", report.worker_id)),
            );
        }
        if report.undelivered_bundles > 0 {
            self.add_error(
                ExportError::new(
                    ExportErrorType::Output,
                    format!("{} bundle(s) could not be delivered", report.undelivered_bundles),
                )
                .with_context(format!("worker={}", report.worker_id)),
            );
        }
    }

    pub fn total_bundles(&self) -> usize {
        self.bundles_by_class.values().sum()
    }

    pub fn total_objects(&self) -> usize {
        self.objects_by_class.values().sum()
    }

    /// Check if the export was successful (no failures)
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.write_failures == 0 && self.errors.is_empty()
    }

    /// Share of loaded items among all items that were attempted
    pub fn success_rate(&self) -> f64 {
        let attempted = self.processed + self.failed;
        if attempted == 0 {
            return 100.0;
        }
        (self.processed as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            dispatched = self.items_dispatched,
            processed = self.processed,
            skipped = self.skipped,
            failed = self.failed,
            unprocessed = self.unprocessed,
            bundles = self.total_bundles(),
            bundles_written = self.bundles_written,
            workers = self.workers,
            interrupted = self.interrupted,
            duration_secs = self.duration.as_secs(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Export completed"
        );

        for (class, bundles) in &self.bundles_by_class {
            tracing::debug!(
                class = %class,
                bundles = bundles,
                objects = self.objects_by_class.get(class).copied().unwrap_or(0),
                "Bundles per class"
            );
        }

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    "Export error"
                );
            }
        }
    }
}

/// Type of export error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportErrorType {
    /// Database connection error
    Connection,
    /// Query error
    Query,
    /// Balloon template error
    Template,
    /// Bundle delivery or storage error
    Output,
    /// Configuration error
    Configuration,
    /// Unknown error
    Unknown,
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g., worker, class)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CityObjectId, DisplayForm, GmlId, WorkItem};

    #[test]
    fn test_export_summary_creation() {
        let summary = ExportSummary::new();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.total_bundles(), 0);
        assert_eq!(summary.duration, Duration::from_secs(0));
        assert!(summary.errors.is_empty());
        assert!(summary.is_successful());
    }

    #[test]
    fn test_export_summary_with_duration() {
        let summary = ExportSummary::new().with_duration(Duration::from_secs(120));

        assert_eq!(summary.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_worker_reports_are_summed() {
        let mut first = WorkerReport::new(0);
        first.processed = 5;
        first.skipped = 1;
        first.bundles_by_class.insert(CityObjectClass::Building, 2);
        first.objects_by_class.insert(CityObjectClass::Building, 5);

        let mut second = WorkerReport::new(1);
        second.processed = 3;
        second.failed = 1;
        second.connection_lost = true;
        second.unprocessed.push(WorkItem::new(
            CityObjectId::new(9).unwrap(),
            GmlId::new("BLDG_9").unwrap(),
            CityObjectClass::Building,
            DisplayForm::Collada,
        ));
        second.bundles_by_class.insert(CityObjectClass::Building, 1);
        second.objects_by_class.insert(CityObjectClass::Building, 3);

        let mut summary = ExportSummary::new();
        summary.add_worker_report(&first);
        summary.add_worker_report(&second);

        assert_eq!(summary.workers, 2);
        assert_eq!(summary.processed, 8);
        assert_eq!(summary.unprocessed, 1);
        assert_eq!(summary.workers_lost, 1);
        assert_eq!(summary.total_bundles(), 3);
        assert_eq!(summary.objects_by_class[&CityObjectClass::Building], 8);
        assert_eq!(summary.errors[0].error_type, ExportErrorType::Connection);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_export_summary_success_rate() {
        let mut summary = ExportSummary::new();
        summary.processed = 95;
        summary.failed = 5;

        assert_eq!(summary.success_rate(), 95.0);

        let empty = ExportSummary::new();
        assert_eq!(empty.success_rate(), 100.0);
    }

    #[test]
    fn test_export_error_with_context() {
        let error = ExportError::new(ExportErrorType::Query, "Query failed".to_string())
            .with_context("worker=3".to_string());

        assert_eq!(error.error_type, ExportErrorType::Query);
        assert_eq!(error.context, Some("worker=3".to_string()));
    }
}
