//! Configuration management for CityKML.
//!
//! # Overview
//!
//! CityKML reads a TOML file (`citykml.toml` by default) with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CITYKML_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`DatabaseConfig`] - PostgreSQL/PostGIS connection and pool size
//! - [`ExportConfig`] - Workers, LOD, display forms, classes, filters, batching, output
//! - [`BalloonConfig`] - Descriptive content per class (`[balloon.<class>]`)
//! - [`LoggingConfig`] - Local JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! [database]
//! connection_string = "${CITYKML_DATABASE_URL}"
//! schema = "citydb"
//!
//! [export]
//! workers = 4
//! lod = 2
//! display_forms = ["footprint", "collada"]
//! classes = ["building"]
//!
//! [export.group_limits]
//! building = 20
//!
//! [balloon.building]
//! content_source = "generic_attribute_or_file"
//! template_file = "templates/building.html"
//! ```
//!
//! ```rust,no_run
//! use citykml::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("citykml.toml")?;
//! println!("Exporting {} classes", config.export.classes.len());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BalloonConfig, BalloonContentSource, BoundingBox, CityKmlConfig,
    DatabaseConfig, ExportConfig, LoggingConfig,
};
pub use secret::{redact_connection_string, secret_string, SecretString, SecretValue};
