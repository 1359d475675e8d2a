//! External system integrations for CityKML.
//!
//! - [`database`] - Connection traits the export core depends on
//! - [`postgresql`] - PostgreSQL/PostGIS implementation of those traits
//! - [`output`] - Writer pool serializing finished bundles to disk
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the export core
//! can be driven by in-memory stubs in tests.

pub mod database;
pub mod output;
pub mod postgresql;
