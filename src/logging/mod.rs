//! Logging and observability
//!
//! Structured logging with:
//! - Console output for interactive runs
//! - JSON-formatted log files with daily or hourly rotation
//! - `RUST_LOG` overrides of the configured level
//!
//! # Example
//!
//! ```no_run
//! use citykml::logging::init_logging;
//! use citykml::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an export run
///
/// # Example
///
/// ```no_run
/// use citykml::log_export_start;
/// use citykml::domain::{CityObjectClass, DisplayForm, Lod};
///
/// let classes = vec![CityObjectClass::Building];
/// let forms = vec![DisplayForm::Footprint];
/// log_export_start!(&classes, &forms, Lod::default());
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($classes:expr, $display_forms:expr, $lod:expr) => {
        tracing::info!(
            classes = ?$classes,
            display_forms = ?$display_forms,
            lod = %$lod,
            "Starting export"
        );
    };
}

/// Log the completion of an export run
///
/// # Example
///
/// ```no_run
/// use citykml::log_export_complete;
/// use std::time::Duration;
///
/// log_export_complete!(42, Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! log_export_complete {
    ($count:expr, $duration:expr) => {
        tracing::info!(
            count = $count,
            duration_ms = $duration.as_millis(),
            "Export completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use citykml::log_error_with_context;
/// use citykml::domain::CityKmlError;
///
/// let error = CityKmlError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
