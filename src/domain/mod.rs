//! Domain models and types for CityKML.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`CityObjectId`], [`GmlId`])
//! - **Export vocabulary** ([`CityObjectClass`], [`DisplayForm`], [`Lod`])
//! - **Pipeline records** ([`WorkItem`], [`ExportedObject`], [`Bundle`])
//! - **Geometry model** ([`Geometry`], [`SceneGeometry`], [`TextureSet`])
//! - **Error types** ([`CityKmlError`], [`TemplateError`], [`DatabaseError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Database keys and GML identifiers are separate newtypes:
//!
//! ```rust
//! use citykml::domain::{CityObjectId, GmlId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let id = CityObjectId::new(4711)?;
//! let gml_id = GmlId::new("BLDG_0003000e008c4dd6")?;
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod class;
pub mod errors;
pub mod geometry;
pub mod ids;
pub mod result;
pub mod work_item;

// Re-export commonly used types for convenience
pub use bundle::{Bundle, ExportedObject, Placemark};
pub use class::{CityObjectClass, DisplayForm, Lod};
pub use errors::{CityKmlError, DatabaseError, TemplateError};
pub use geometry::{Geometry, GeometryKind, SceneGeometry, Surface, TextureSet};
pub use ids::{CityObjectId, GmlId};
pub use result::Result;
pub use work_item::WorkItem;
