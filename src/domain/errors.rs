//! Domain error types
//!
//! This module defines the error hierarchy for CityKML. Errors are split by the
//! blast radius they have on an export: template errors are local to one
//! template or statement, database errors are local to one object unless the
//! connection itself is gone.

use thiserror::Error;

/// Main CityKML error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum CityKmlError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Balloon template errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Export process errors
    #[error("Export error: {0}")]
    Export(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl CityKmlError {
    /// Whether this error means the underlying database connection is unusable
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, CityKmlError::Database(DatabaseError::Connection(_)))
    }
}

/// Balloon template errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Unbalanced start/end markers or a foreach block without its end marker
    #[error("Template syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// Unknown table or column in a statement shorthand
    #[error("Unsupported reference '{reference}': {message}")]
    UnsupportedReference { reference: String, message: String },
}

impl TemplateError {
    /// Creates a syntax error at the given byte offset
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Creates an unsupported reference error
    pub fn unsupported(reference: impl Into<String>, message: impl Into<String>) -> Self {
        TemplateError::UnsupportedReference {
            reference: reference.into(),
            message: message.into(),
        }
    }
}

/// Database errors
///
/// These errors don't expose third-party driver types.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// The connection is closed or could not be obtained
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed to execute
    #[error("Query failed: {0}")]
    Query(String),

    /// A value could not be decoded
    #[error("Failed to decode value: {0}")]
    Decode(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for CityKmlError {
    fn from(err: std::io::Error) -> Self {
        CityKmlError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CityKmlError {
    fn from(err: serde_json::Error) -> Self {
        CityKmlError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CityKmlError {
    fn from(err: toml::de::Error) -> Self {
        CityKmlError::Configuration(format!("TOML parse error: {err}"))
    }
}
