//! External database connection.
//!
//! One provider owns one connection for the lifetime of its unit of work.
//! Access is serialized through an async mutex; closing takes the
//! connection out and every later use fails with `Closed`.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::config::{DatabaseConfig, DatabaseEngine};
use crate::error::{SqlFederationError, SqlResult};

/// A single connection to the external database.
pub struct DirectoryConnection {
    target: String,
    connection: Mutex<Option<PgConnection>>,
}

impl std::fmt::Debug for DirectoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConnection")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl DirectoryConnection {
    /// Builds connect options from the configuration.
    #[must_use]
    pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
        match config.engine {
            DatabaseEngine::PostgreSql => PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .database(&config.database)
                .username(&config.username)
                .password(&config.password),
        }
    }

    /// Opens a connection.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the database cannot be reached or refuses
    /// the credentials.
    pub async fn connect(config: &DatabaseConfig) -> SqlResult<Self> {
        let target = format!("{}:{}/{}", config.host, config.port, config.database);
        let options = Self::connect_options(config);

        let connection = PgConnection::connect_with(&options)
            .await
            .map_err(|e| SqlFederationError::connection(format!("{target}: {e}")))?;

        tracing::debug!(target_db = %target, engine = config.engine.name(), "Connected to external database");

        Ok(Self {
            target,
            connection: Mutex::new(Some(connection)),
        })
    }

    /// Returns `host:port/database` of this connection.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Locks the connection for one statement.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after [`close`](Self::close).
    pub async fn acquire(&self) -> SqlResult<MappedMutexGuard<'_, PgConnection>> {
        let guard = self.connection.lock().await;
        MutexGuard::try_map(guard, |slot| slot.as_mut()).map_err(|_| SqlFederationError::Closed)
    }

    /// Runs `SELECT 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the round-trip fails or the connection is closed.
    pub async fn test_connection(&self) -> SqlResult<()> {
        let mut conn = self.acquire().await?;
        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(|e| SqlFederationError::connection(format!("test query failed: {e}")))?;
        Ok(())
    }

    /// Returns true once the connection has been released.
    pub async fn is_closed(&self) -> bool {
        self.connection.lock().await.is_none()
    }

    /// Releases the connection.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if already released, or the error from the
    /// database's terminate handshake.
    pub async fn close(&self) -> SqlResult<()> {
        let connection = self
            .connection
            .lock()
            .await
            .take()
            .ok_or(SqlFederationError::Closed)?;

        connection.close().await?;
        tracing::debug!(target_db = %self.target, "Closed external database connection");
        Ok(())
    }
}
