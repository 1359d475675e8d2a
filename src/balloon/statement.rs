//! Compiled balloon statements
//!
//! A statement is one top-level `<3DCityDB>...</3DCityDB>` span. Its kind is
//! decided at template compile time; its SQL is produced lazily on first
//! execution and memoized in a tri-state cache slot.

use super::sql::{self, CompiledQuery};
use crate::domain::TemplateError;
use std::sync::{Mutex, MutexGuard};

/// State of a statement's lazily compiled SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlCache {
    /// No compilation has been attempted yet
    NotAttempted,
    /// Compilation succeeded; the query is reused for every object
    Compiled(CompiledQuery),
    /// Compilation failed; never retried
    Failed,
}

/// Piece of a nested statement's raw text
#[derive(Debug)]
pub enum Segment {
    Text(String),
    Inner(Box<BalloonStatement>),
}

#[derive(Debug)]
pub enum StatementKind {
    /// Plain shorthand lookup
    Simple,
    /// Raw text containing further spans, expanded at execution time
    Nested(Vec<Segment>),
    /// Repeating block rendered once per result row
    Foreach { body: String },
}

#[derive(Debug)]
pub struct BalloonStatement {
    raw: String,
    kind: StatementKind,
    cache: Mutex<SqlCache>,
}

impl BalloonStatement {
    pub fn simple(raw: impl Into<String>) -> Self {
        Self::with_kind(raw, StatementKind::Simple)
    }

    pub fn nested(raw: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self::with_kind(raw, StatementKind::Nested(segments))
    }

    pub fn foreach(raw: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_kind(raw, StatementKind::Foreach { body: body.into() })
    }

    fn with_kind(raw: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
            cache: Mutex::new(SqlCache::NotAttempted),
        }
    }

    /// Text between the markers, inner markers included
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.kind, StatementKind::Nested(_))
    }

    pub fn is_foreach(&self) -> bool {
        matches!(self.kind, StatementKind::Foreach { .. })
    }

    pub fn foreach_body(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Foreach { body } => Some(body),
            _ => None,
        }
    }

    /// Number of selected columns, known once the SQL has compiled
    pub fn column_count(&self) -> Option<usize> {
        match &*self.lock_cache() {
            SqlCache::Compiled(query) => Some(query.column_count),
            _ => None,
        }
    }

    /// Snapshot of the cache slot
    pub fn sql_cache(&self) -> SqlCache {
        self.lock_cache().clone()
    }

    fn lock_cache(&self) -> MutexGuard<'_, SqlCache> {
        // The slot is only ever replaced wholesale, so a poisoned lock still
        // holds a consistent value.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the memoized query, compiling it on first use
    ///
    /// Nested statements are never cached here: their text depends on the
    /// object being rendered.
    ///
    /// # Errors
    ///
    /// Returns the compile error on the first failed attempt and
    /// `TemplateError::UnsupportedReference` on every later call.
    pub fn compiled_query(&self) -> Result<CompiledQuery, TemplateError> {
        let mut cache = self.lock_cache();
        match &*cache {
            SqlCache::Compiled(query) => Ok(query.clone()),
            SqlCache::Failed => Err(TemplateError::unsupported(
                self.raw.trim(),
                "statement failed to compile earlier",
            )),
            SqlCache::NotAttempted => match sql::compile(&self.raw, self.is_foreach()) {
                Ok(query) => {
                    *cache = SqlCache::Compiled(query.clone());
                    Ok(query)
                }
                Err(e) => {
                    *cache = SqlCache::Failed;
                    Err(e)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_moves_to_compiled_once() {
        let statement = BalloonStatement::simple("BUILDING/MEASURED_HEIGHT");
        assert_eq!(statement.sql_cache(), SqlCache::NotAttempted);
        assert_eq!(statement.column_count(), None);

        let first = statement.compiled_query().unwrap();
        assert!(matches!(statement.sql_cache(), SqlCache::Compiled(_)));
        assert_eq!(statement.compiled_query().unwrap(), first);
        assert_eq!(statement.column_count(), Some(1));
    }

    #[test]
    fn test_failed_compilation_is_not_retried() {
        let statement = BalloonStatement::simple("BUILDING/NOT_A_COLUMN");
        let first = statement.compiled_query().unwrap_err();
        assert!(first.to_string().contains("NOT_A_COLUMN"));
        assert_eq!(statement.sql_cache(), SqlCache::Failed);

        let second = statement.compiled_query().unwrap_err();
        assert!(second.to_string().contains("failed to compile earlier"));
        assert_eq!(statement.sql_cache(), SqlCache::Failed);
    }

    #[test]
    fn test_kind_accessors() {
        let foreach = BalloonStatement::foreach("FOREACH ADDRESS/STREET", "<li>%1</li>");
        assert!(foreach.is_foreach());
        assert_eq!(foreach.foreach_body(), Some("<li>%1</li>"));

        let nested = BalloonStatement::nested(
            "x",
            vec![Segment::Text("x".to_string())],
        );
        assert!(nested.is_nested());
        assert!(nested.foreach_body().is_none());
    }
}
