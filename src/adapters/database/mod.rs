//! Database abstraction layer
//!
//! This module provides the trait-based seam between the export core and the
//! database driver, plus the factory that builds the configured backend.

pub mod factory;
pub mod traits;

pub use factory::create_connection_provider;
pub use traits::{ConnectionProvider, ExportConnection, SqlParam, SqlRow, SqlValue};
