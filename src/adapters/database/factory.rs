//! Connection provider factory
//!
//! Builds the database backend selected by the configuration.

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::CityKmlConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Create the connection provider for the configured city database
///
/// The pool is sized so that every worker and the dispatcher can hold a
/// connection for the whole export.
///
/// # Errors
///
/// Returns an error if the pool cannot be created
pub fn create_connection_provider(config: &CityKmlConfig) -> Result<Arc<PostgreSQLClient>> {
    let mut db_config = config.database.clone();
    let required = config.export.workers + 1;
    if db_config.max_connections < required {
        tracing::warn!(
            max_connections = db_config.max_connections,
            workers = config.export.workers,
            "Pool smaller than worker count, growing pool to match"
        );
        db_config.max_connections = required;
    }

    tracing::info!(schema = %db_config.schema, "Creating PostgreSQL client");
    let client = PostgreSQLClient::new(db_config)?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[tokio::test]
    async fn test_pool_grows_to_fit_workers_and_dispatcher() {
        let config = parse_config(
            r#"
[database]
connection_string = "postgresql://localhost/citydb"
max_connections = 2

[export]
workers = 6
"#,
        )
        .unwrap();

        let provider = create_connection_provider(&config).unwrap();
        assert_eq!(provider.pool_status().max_size, 7);
    }
}
