//! Balloon templates
//!
//! Balloons are the descriptive HTML shown for a placemark. A template mixes
//! literal HTML with `<3DCityDB>` statements written in a small shorthand:
//!
//! ```text
//! <3DCityDB>BUILDING/MEASURED_HEIGHT</3DCityDB>
//! <3DCityDB>ADDRESS/STREET,HOUSE_NUMBER[FIRST]</3DCityDB>
//! <3DCityDB>CITYOBJECT_GENERICATTRIB/STRVAL[attrname = 'owner']</3DCityDB>
//! <3DCityDB>FOREACH ROOM/NAME</3DCityDB><li>%0: %1</li><3DCityDB>ENDFOREACH</3DCityDB>
//! ```
//!
//! - [`compiler`] - Template text to [`CompiledTemplate`]
//! - [`sql`] - Shorthand to parameterized SQL
//! - [`vocabulary`] - Tables and columns a statement may reference
//! - [`statement`] - Compiled statements with memoized SQL
//! - [`executor`] - Runs statements for one object
//! - [`handler`] - Per-class template selection

pub mod compiler;
pub mod executor;
pub mod handler;
pub mod sql;
pub mod statement;
pub mod vocabulary;

pub use compiler::{compile, compile_file, CompiledTemplate};
pub use executor::StatementExecutor;
pub use handler::{BalloonHandler, BalloonRegistry};
pub use statement::{BalloonStatement, SqlCache};
