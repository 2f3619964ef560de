use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::filter::FilterError;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Name of the violated unique constraint, if this is a SQLSTATE 23505.
    pub fn unique_violation(&self) -> Option<&str> {
        match self {
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Some(db_err.constraint().unwrap_or("unknown"))
            }
            _ => None,
        }
    }
}

/// Owns pool construction and schema management for the one application database.
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Created database pool");
        Ok(pool)
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_requires_url() {
        let config = DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            connection_timeout: 1,
            run_migrations: false,
        };
        assert!(matches!(
            DatabaseManager::connect(&config).await,
            Err(DatabaseError::ConfigMissing("DATABASE_URL"))
        ));
    }

    #[test]
    fn plain_errors_are_not_unique_violations() {
        assert!(DatabaseError::NotFound("x".into()).unique_violation().is_none());
        assert!(DatabaseError::Sqlx(sqlx::Error::RowNotFound).unique_violation().is_none());
    }
}
