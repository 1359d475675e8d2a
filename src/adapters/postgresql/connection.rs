//! Export connection backed by a pooled PostgreSQL client

use crate::adapters::database::traits::{ExportConnection, SqlParam, SqlRow};
use crate::adapters::postgresql::values::{decode_row, encode_param};
use crate::domain::{DatabaseError, Result};
use async_trait::async_trait;
use deadpool_postgres::Object;
use tokio_postgres::types::ToSql;

const BEGIN_READ_ONLY: &str = "BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY";

/// Maps a driver error to the database error taxonomy
///
/// A closed client means the worker has lost its connection; everything else
/// is a statement failure.
pub(crate) fn map_pg_error(err: tokio_postgres::Error) -> DatabaseError {
    if err.is_closed() {
        DatabaseError::Connection(err.to_string())
    } else {
        DatabaseError::Query(err.to_string())
    }
}

/// Whether a statement is kept in the client's prepared statement cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preparation {
    Cached,
    /// Closed on the server once the statement is dropped
    OneShot,
}

async fn run_query(
    client: &Object,
    sql: &str,
    params: &[SqlParam],
    preparation: Preparation,
) -> std::result::Result<Vec<SqlRow>, DatabaseError> {
    let statement = match preparation {
        Preparation::Cached => client.prepare_cached(sql).await,
        Preparation::OneShot => client.prepare(sql).await,
    }
    .map_err(map_pg_error)?;
    let types = statement.params();
    if types.len() != params.len() {
        return Err(DatabaseError::Query(format!(
            "Statement expects {} parameters, got {}",
            types.len(),
            params.len()
        )));
    }

    // Parameters are encoded for the types the server inferred
    let encoded = params
        .iter()
        .zip(types)
        .map(|(param, ty)| encode_param(param, ty))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let refs: Vec<&(dyn ToSql + Sync)> = encoded
        .iter()
        .map(|b| b.as_ref() as &(dyn ToSql + Sync))
        .collect();

    let rows = client.query(&statement, &refs).await.map_err(map_pg_error)?;
    rows.iter().map(decode_row).collect()
}

/// One pooled connection, positioned on the city schema
pub struct PostgreSQLConnection {
    client: Option<Object>,
    in_transaction: bool,
}

impl PostgreSQLConnection {
    /// Sets the search path and opens the read-only transaction
    pub(crate) async fn position(client: Object, schema: &str) -> Result<Self> {
        client
            .batch_execute(&format!("SET search_path TO {schema}, public; {BEGIN_READ_ONLY}"))
            .await
            .map_err(map_pg_error)?;

        Ok(Self {
            client: Some(client),
            in_transaction: true,
        })
    }

    fn client(&self) -> Result<&Object> {
        self.client
            .as_ref()
            .ok_or_else(|| DatabaseError::Connection("Connection already closed".to_string()).into())
    }

    /// A failed statement aborts the surrounding transaction. Nothing was
    /// written, so roll back and start over to keep the connection usable.
    async fn recover(&self, client: &Object) {
        let restart = format!("ROLLBACK; {BEGIN_READ_ONLY}");
        if let Err(e) = client.batch_execute(&restart).await {
            tracing::warn!(error = %e, "Failed to restart read-only transaction");
        }
    }

    async fn run(
        &self,
        sql: &str,
        params: &[SqlParam],
        preparation: Preparation,
    ) -> Result<Vec<SqlRow>> {
        let client = self.client()?;

        match run_query(client, sql, params, preparation).await {
            Ok(rows) => Ok(rows),
            Err(DatabaseError::Connection(msg)) => Err(DatabaseError::Connection(msg).into()),
            Err(other) => {
                if self.in_transaction {
                    self.recover(client).await;
                }
                Err(other.into())
            }
        }
    }
}

#[async_trait]
impl ExportConnection for PostgreSQLConnection {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>> {
        self.run(sql, params, Preparation::Cached).await
    }

    async fn query_unprepared(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>> {
        self.run(sql, params, Preparation::OneShot).await
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        let client = self.client()?;
        client.batch_execute("COMMIT").await.map_err(map_pg_error)?;
        self.in_transaction = false;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if self.in_transaction && !client.is_closed() {
                if let Err(e) = client.batch_execute("ROLLBACK").await {
                    tracing::debug!(error = %e, "Rollback on close failed");
                }
            }
            self.in_transaction = false;
            // Dropping the object returns it to the pool
            drop(client);
        }
    }
}
