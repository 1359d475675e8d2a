// CityKML - 3D City Database to KML/COLLADA export engine
// Copyright (c) 2025 Atlas Contributors
// Licensed under the MIT License

//! # CityKML - concurrent city model export
//!
//! CityKML exports city objects stored in a 3D city database (PostgreSQL /
//! PostGIS) as visualization bundles: footprints, extruded blocks, plain
//! geometry or textured 3D models, each with an optional HTML balloon
//! rendered from a template.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Dispatcher, worker pool, group batching, object reader
//! - [`balloon`] - Balloon template compiler and statement executor
//! - [`adapters`] - PostgreSQL connection pool and bundle output
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use citykml::config::load_config;
//! use citykml::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("citykml.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     println!("Wrote {} bundles", summary.bundles_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Balloon Templates
//!
//! Balloon templates are HTML with embedded database queries. They are
//! compiled once and evaluated per object:
//!
//! ```rust
//! use citykml::balloon::compile;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let template = compile("<h3><3DCityDB>BUILDING/NAME</3DCityDB></h3>")?;
//! assert_eq!(template.statements().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All library errors are [`domain::CityKmlError`]:
//!
//! ```rust,no_run
//! use citykml::domain::CityKmlError;
//!
//! fn example() -> Result<(), CityKmlError> {
//!     let config = citykml::config::load_config("citykml.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod balloon;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
