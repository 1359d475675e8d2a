//! Statement execution
//!
//! Runs compiled balloon statements against a worker's connection and turns
//! the result rows into text. Statement failures never abort rendering: they
//! are logged and render as an empty string. The only error that escapes is a
//! lost connection, which the owning worker must react to.

use super::compiler::CompiledTemplate;
use super::sql;
use super::statement::{BalloonStatement, Segment, StatementKind};
use crate::adapters::database::{ExportConnection, SqlParam, SqlRow, SqlValue};
use crate::domain::{CityObjectId, Lod, Result};
use futures::future::BoxFuture;

/// Executes balloon statements over one borrowed connection
pub struct StatementExecutor<'a, C: ExportConnection + ?Sized> {
    connection: &'a C,
}

impl<'a, C: ExportConnection + ?Sized> StatementExecutor<'a, C> {
    pub fn new(connection: &'a C) -> Self {
        Self { connection }
    }

    /// Renders one statement for one object
    ///
    /// Never fails; any failure, including a lost connection, yields an
    /// empty string.
    pub async fn execute(
        &self,
        statement: &BalloonStatement,
        object_id: CityObjectId,
        lod: Lod,
    ) -> String {
        match self.run(statement, object_id, lod).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    object_id = %object_id,
                    lod = %lod,
                    error = %e,
                    "Balloon statement aborted"
                );
                String::new()
            }
        }
    }

    /// Renders a whole template: chunks interleaved with statement output
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connection` if the connection is lost while
    /// rendering. Every other statement failure renders as an empty string.
    pub async fn render(
        &self,
        template: &CompiledTemplate,
        object_id: CityObjectId,
        lod: Lod,
    ) -> Result<String> {
        let mut content = String::new();
        for (chunk, statement) in template.chunks().iter().zip(template.statements()) {
            content.push_str(chunk);
            content.push_str(&self.run(statement, object_id, lod).await?);
        }
        if let Some(last) = template.chunks().last() {
            content.push_str(last);
        }
        Ok(content)
    }

    fn run<'s>(
        &'s self,
        statement: &'s BalloonStatement,
        object_id: CityObjectId,
        lod: Lod,
    ) -> BoxFuture<'s, Result<String>> {
        Box::pin(async move {
            match self.evaluate(statement, object_id, lod).await {
                Ok(text) => Ok(text),
                Err(e) if e.is_connection_lost() => Err(e),
                Err(e) => {
                    tracing::warn!(
                        object_id = %object_id,
                        lod = %lod,
                        statement = statement.raw_text().trim(),
                        error = %e,
                        "Balloon statement failed"
                    );
                    Ok(String::new())
                }
            }
        })
    }

    async fn evaluate(
        &self,
        statement: &BalloonStatement,
        object_id: CityObjectId,
        lod: Lod,
    ) -> Result<String> {
        let params = [SqlParam::Int(object_id.get())];
        let rows = match statement.kind() {
            StatementKind::Nested(segments) => {
                let mut text = String::new();
                for segment in segments {
                    match segment {
                        Segment::Text(t) => text.push_str(t),
                        Segment::Inner(inner) => {
                            text.push_str(&self.run(inner, object_id, lod).await?)
                        }
                    }
                }
                tracing::trace!(object_id = %object_id, expanded = %text, "Expanded nested statement");
                // Depends on the object, so compiled per execution and never
                // kept as a prepared statement
                let query = sql::compile(&text, false)?;
                self.connection.query_unprepared(&query.sql, &params).await?
            }
            _ => {
                let query = statement.compiled_query()?;
                self.connection.query(&query.sql, &params).await?
            }
        };

        Ok(match statement.foreach_body() {
            Some(body) => render_foreach(body, &rows),
            None => render_rows(&rows),
        })
    }
}

/// Stringifies one column value
pub fn render_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Bool(v) => v.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Numeric(v) => v.clone(),
        SqlValue::Text(v) => v.replace('"', "\\\""),
        SqlValue::Date(v) => v.format("%Y-%m-%d").to_string(),
        SqlValue::Timestamp(v) => v.to_rfc3339(),
        SqlValue::Geometry(g) => g.to_ordinate_string(),
    }
}

fn render_rows(rows: &[SqlRow]) -> String {
    rows.iter()
        .map(|row| {
            row.values()
                .iter()
                .map(render_value)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_foreach(body: &str, rows: &[SqlRow]) -> String {
    rows.iter()
        .enumerate()
        .map(|(i, row)| substitute_columns(body, i + 1, row))
        .collect()
}

/// Replaces `%n` tokens; `%0` is the 1-based row number
///
/// Digits are consumed greedily. Tokens past the last column stay as written.
fn substitute_columns(body: &str, row_number: usize, row: &SqlRow) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        let replacement = after[..digits].parse::<usize>().ok().and_then(|n| match n {
            0 => Some(row_number.to_string()),
            n => row.get(n - 1).map(render_value),
        });

        match replacement {
            Some(value) => {
                out.push_str(&value);
                rest = &after[digits..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balloon::compile;
    use crate::domain::{DatabaseError, Geometry, GeometryKind};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Answers queries by SQL substring; unmatched queries return no rows
    struct ScriptedConnection {
        responses: Vec<(&'static str, std::result::Result<Vec<SqlRow>, DatabaseError>)>,
        queries: Mutex<Vec<String>>,
        unprepared: Mutex<Vec<String>>,
    }

    impl ScriptedConnection {
        fn new(
            responses: Vec<(&'static str, std::result::Result<Vec<SqlRow>, DatabaseError>)>,
        ) -> Self {
            Self {
                responses,
                queries: Mutex::new(Vec::new()),
                unprepared: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExportConnection for ScriptedConnection {
        async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>> {
            assert_eq!(params, &[SqlParam::Int(42)]);
            self.queries.lock().unwrap().push(sql.to_string());
            for (needle, response) in &self.responses {
                if sql.contains(needle) {
                    return response.clone().map_err(Into::into);
                }
            }
            Ok(Vec::new())
        }

        async fn query_unprepared(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>> {
            self.unprepared.lock().unwrap().push(sql.to_string());
            self.query(sql, params).await
        }

        async fn commit(&mut self) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) {}
    }

    fn row(values: Vec<SqlValue>) -> SqlRow {
        SqlRow::new(values)
    }

    fn text(value: &str) -> SqlValue {
        SqlValue::Text(value.to_string())
    }

    fn object() -> CityObjectId {
        CityObjectId::new(42).unwrap()
    }

    #[tokio::test]
    async fn test_simple_statement_renders_value() {
        let conn = ScriptedConnection::new(vec![(
            "measured_height",
            Ok(vec![row(vec![SqlValue::Int(3)])]),
        )]);
        let template = compile("<p><3DCityDB>BUILDING/MEASURED_HEIGHT</3DCityDB></p>").unwrap();

        let html = StatementExecutor::new(&conn)
            .render(&template, object(), Lod::default())
            .await
            .unwrap();
        assert_eq!(html, "<p>3</p>");
    }

    #[tokio::test]
    async fn test_foreach_renders_body_per_row() {
        let conn = ScriptedConnection::new(vec![(
            "a.street",
            Ok(vec![
                row(vec![text("Main St")]),
                row(vec![text("Oak Ave")]),
                row(vec![text("Elm Rd")]),
            ]),
        )]);
        let template = compile(
            "<ul><3DCityDB>FOREACH ADDRESS/STREET</3DCityDB><li>%1 - %0</li>\
             <3DCityDB>ENDFOREACH</3DCityDB></ul>",
        )
        .unwrap();

        let html = StatementExecutor::new(&conn)
            .render(&template, object(), Lod::default())
            .await
            .unwrap();
        assert_eq!(
            html,
            "<ul><li>Main St - 1</li><li>Oak Ave - 2</li><li>Elm Rd - 3</li></ul>"
        );
    }

    #[tokio::test]
    async fn test_nested_statement_splices_inner_result() {
        let conn = ScriptedConnection::new(vec![
            ("ga.strval", Ok(vec![row(vec![text("STOREYS_ABOVE_GROUND")])])),
            ("b.storeys_above_ground", Ok(vec![row(vec![SqlValue::Int(5)])])),
        ]);
        let template = compile(
            "<3DCityDB>BUILDING/<3DCityDB>CITYOBJECT_GENERICATTRIB/STRVAL[attrname = 'col']\
             </3DCityDB></3DCityDB>",
        )
        .unwrap();

        let executor = StatementExecutor::new(&conn);
        let html = executor
            .render(&template, object(), Lod::default())
            .await
            .unwrap();
        assert_eq!(html, "5");
        assert_eq!(conn.queries().len(), 2);
        assert!(conn.queries()[1].starts_with("SELECT b.storeys_above_ground FROM building b"));

        // Only the expanded outer query bypasses the prepared statement cache
        let unprepared = conn.unprepared.lock().unwrap().clone();
        assert_eq!(unprepared, vec![conn.queries()[1].clone()]);
    }

    #[tokio::test]
    async fn test_expanded_nested_query_bypasses_statement_cache() {
        let conn = ScriptedConnection::new(vec![
            ("ga.strval", Ok(vec![row(vec![text("Main St")])])),
            ("a.city", Ok(vec![row(vec![text("Berlin")])])),
        ]);
        let template = compile(
            "<3DCityDB>ADDRESS/CITY[street = '<3DCityDB>CITYOBJECT_GENERICATTRIB/STRVAL\
             [attrname = 'street']</3DCityDB>']</3DCityDB>",
        )
        .unwrap();
        let executor = StatementExecutor::new(&conn);

        for _ in 0..3 {
            let html = executor
                .render(&template, object(), Lod::default())
                .await
                .unwrap();
            assert_eq!(html, "Berlin");
        }

        let unprepared = conn.unprepared.lock().unwrap().clone();
        assert_eq!(unprepared.len(), 3);
        assert!(unprepared.iter().all(|sql| sql.contains("(street = 'Main St')")));
        // Inner statement and expanded outer statement per render
        assert_eq!(conn.queries().len(), 6);
    }

    #[tokio::test]
    async fn test_failing_statement_renders_empty_and_siblings_survive() {
        let conn = ScriptedConnection::new(vec![
            ("b.class", Err(DatabaseError::Query("boom".to_string()))),
            ("co.name", Ok(vec![row(vec![text("Town Hall")])])),
        ]);
        let template = compile(
            "[<3DCityDB>BUILDING/CLASS</3DCityDB>][<3DCityDB>BUILDING/NOPE</3DCityDB>]\
             [<3DCityDB>CITYOBJECT/NAME</3DCityDB>]",
        )
        .unwrap();

        let html = StatementExecutor::new(&conn)
            .render(&template, object(), Lod::default())
            .await
            .unwrap();
        assert_eq!(html, "[][][Town Hall]");
        // The unknown column never reaches the database
        assert_eq!(conn.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_connection_loss_propagates_from_render_only() {
        let conn = ScriptedConnection::new(vec![(
            "b.class",
            Err(DatabaseError::Connection("closed".to_string())),
        )]);
        let template = compile("<3DCityDB>BUILDING/CLASS</3DCityDB>").unwrap();
        let executor = StatementExecutor::new(&conn);

        let err = executor
            .render(&template, object(), Lod::default())
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());

        let text = executor
            .execute(&template.statements()[0], object(), Lod::default())
            .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_rows_and_columns_are_comma_joined() {
        let conn = ScriptedConnection::new(vec![(
            "a.street",
            Ok(vec![
                row(vec![text("Main St"), text("1")]),
                row(vec![text("Oak Ave"), SqlValue::Null]),
            ]),
        )]);
        let template = compile("<3DCityDB>ADDRESS/STREET,HOUSE_NUMBER</3DCityDB>").unwrap();

        let html = StatementExecutor::new(&conn)
            .render(&template, object(), Lod::default())
            .await
            .unwrap();
        assert_eq!(html, "Main St, 1, Oak Ave, ");
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&SqlValue::Null), "");
        assert_eq!(render_value(&SqlValue::Bool(true)), "true");
        assert_eq!(render_value(&SqlValue::Float(12.5)), "12.5");
        assert_eq!(render_value(&SqlValue::Numeric("12.50".into())), "12.50");
        assert_eq!(render_value(&text("say \"hi\"")), "say \\\"hi\\\"");
        assert_eq!(
            render_value(&SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())),
            "2024-03-01"
        );

        let g = Geometry::new(GeometryKind::Point, 3, vec![1.0, 2.5, 3.0]);
        assert_eq!(render_value(&SqlValue::Geometry(g)), "(1,2.5,3)");
    }

    #[test]
    fn test_substitute_columns_is_greedy_and_keeps_unknown_tokens() {
        let r = row(vec![text("a"), text("b")]);
        assert_eq!(substitute_columns("%2%1 #%0", 7, &r), "ba #7");
        assert_eq!(substitute_columns("%12 100%", 1, &r), "%12 100%");
        assert_eq!(substitute_columns("%%1", 1, &r), "%a");
    }
}
