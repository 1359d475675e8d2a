//! Core export logic for CityKML.
//!
//! # Modules
//!
//! - [`export`] - Dispatcher, worker pool, group batching and coordination
//! - [`reader`] - Loads one city object's geometry at the requested LOD
//!
//! # Export Workflow
//!
//! 1. **Select**: the dispatcher queries the requested classes, ids and
//!    bounding box and expands city object groups into their members
//! 2. **Queue**: one work item per object and display form goes onto a
//!    bounded queue shared by all workers
//! 3. **Load**: each worker reads geometry and renders the balloon on its
//!    own connection
//! 4. **Batch**: 3D-model objects are grouped per class up to the
//!    configured limit, everything else is emitted as a single bundle
//! 5. **Write**: bundles are stored by the output writers
//! 6. **Report**: worker reports are folded into an export summary
//!
//! # Example
//!
//! ```rust,no_run
//! use citykml::config::load_config;
//! use citykml::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("citykml.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Processed: {}", summary.processed);
//! println!("Bundles: {}", summary.total_bundles());
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod reader;
