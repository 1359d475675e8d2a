//! Bundle output
//!
//! A small pool of writer tasks that stores every bundle as one JSON
//! document under the output directory:
//!
//! ```text
//! <output_dir>/<class>/<display_form>_<representative_id>.json
//! ```
//!
//! In dry-run mode bundles are serialized and counted but not stored.

pub mod writer;

pub use writer::{bundle_path, OutputSettings, OutputWriterPool, WriterStats};
