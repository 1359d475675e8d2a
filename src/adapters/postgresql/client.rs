//! PostgreSQL client implementation
//!
//! This module owns the connection pool and hands out positioned export
//! connections.

use crate::adapters::database::traits::ConnectionProvider;
use crate::adapters::postgresql::connection::{map_pg_error, PostgreSQLConnection};
use crate::config::schema::DatabaseConfig;
use crate::config::redact_connection_string;
use crate::domain::{CityKmlError, DatabaseError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// PostgreSQL client for CityKML
///
/// Wraps a deadpool connection pool sized to the worker count. Every
/// connection handed out by [`ConnectionProvider::acquire`] is positioned on
/// the configured schema inside a read-only transaction.
pub struct PostgreSQLClient {
    pool: Pool,
    config: DatabaseConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first acquire.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed or the pool
    /// cannot be built.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let raw: &str = config.connection_string.expose_secret().as_ref();
        let pg_config: tokio_postgres::Config = raw.parse().map_err(|e| {
            CityKmlError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
        })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection and check the city database schema
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connection` if the server is unreachable and
    /// `DatabaseError::Query` if the schema has no `cityobject` table.
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.pool.get().await.map_err(|e| {
            DatabaseError::Connection(format!("Failed to get connection from pool: {}", e))
        })?;

        client.query_one("SELECT 1", &[]).await.map_err(map_pg_error)?;

        let table = format!("{}.cityobject", self.config.schema);
        let found = client
            .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table])
            .await
            .map_err(map_pg_error)?;
        if !found.get::<_, bool>(0) {
            return Err(DatabaseError::Query(format!(
                "Schema '{}' does not contain a 3D city database",
                self.config.schema
            ))
            .into());
        }

        tracing::info!(
            database = %self.connection_string_safe(),
            schema = %self.config.schema,
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Get the connection string (without password)
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(&self.config.connection_string)
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }

    pub fn schema(&self) -> &str {
        &self.config.schema
    }
}

#[async_trait]
impl ConnectionProvider for PostgreSQLClient {
    type Connection = PostgreSQLConnection;

    async fn acquire(&self) -> Result<PostgreSQLConnection> {
        let object = self.pool.get().await.map_err(|e| {
            DatabaseError::Connection(format!("Failed to get connection from pool: {}", e))
        })?;

        let connection = PostgreSQLConnection::position(object, &self.config.schema).await?;
        tracing::debug!(
            schema = %self.config.schema,
            pool_size = self.pool.status().size,
            "Acquired export connection"
        );
        Ok(connection)
    }
}
