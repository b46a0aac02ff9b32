//! SQL federation error types.
//!
//! ## Security Note
//!
//! Error messages must not leak database passwords or credential hashes.

use kc_federation::FederationError;
use thiserror::Error;

/// Errors raised by the external-database adapter.
#[derive(Debug, Error)]
pub enum SqlFederationError {
    /// Invalid configuration.
    #[error("External database configuration error: {0}")]
    Configuration(String),

    /// A configured table or column name cannot be used as an identifier.
    #[error("Invalid identifier for {field}: {reason}")]
    InvalidIdentifier {
        /// Configuration field holding the identifier.
        field: &'static str,
        /// Why the identifier was rejected.
        reason: &'static str,
    },

    /// A search parameter that is unknown or not mapped to a column.
    #[error("Unsupported parameter: {0}")]
    UnsupportedParameter(String),

    /// Connection failed.
    #[error("External database connection failed: {0}")]
    Connection(String),

    /// Query execution failed.
    #[error("External database query failed: {0}")]
    Query(String),

    /// A column could not be decoded into the expected type.
    #[error("Could not decode column {column}: {message}")]
    Decode {
        /// Positional column name.
        column: &'static str,
        /// Decoder message.
        message: String,
    },

    /// `COUNT(*)` returned no row.
    #[error("Error while fetching users count")]
    MissingCount,

    /// The directory connection has been released.
    #[error("External database connection is closed")]
    Closed,

    /// Underlying sqlx error.
    #[error("External database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl SqlFederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Wraps a failed statement.
    #[must_use]
    pub fn query_failed(err: sqlx::Error) -> Self {
        Self::Query(err.to_string())
    }

    /// Creates an unsupported parameter error.
    #[must_use]
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::UnsupportedParameter(name.into())
    }

    /// Checks if this error comes from talking to the database.
    #[must_use]
    pub const fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Query(_)
                | Self::Decode { .. }
                | Self::MissingCount
                | Self::Sqlx(_)
        )
    }
}

/// Result type for external-database operations.
pub type SqlResult<T> = Result<T, SqlFederationError>;

impl From<SqlFederationError> for FederationError {
    fn from(err: SqlFederationError) -> Self {
        match err {
            SqlFederationError::Configuration(msg) => FederationError::Configuration(msg),
            SqlFederationError::InvalidIdentifier { .. } => {
                FederationError::Configuration(err.to_string())
            }
            SqlFederationError::UnsupportedParameter(name) => {
                FederationError::unsupported_parameter(name)
            }
            SqlFederationError::Closed => FederationError::Closed,
            SqlFederationError::Connection(_)
            | SqlFederationError::Query(_)
            | SqlFederationError::Decode { .. }
            | SqlFederationError::MissingCount
            | SqlFederationError::Sqlx(_) => FederationError::Directory(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_failures_collapse_to_directory_errors() {
        let cases = [
            SqlFederationError::connection("refused"),
            SqlFederationError::query_failed(sqlx::Error::RowNotFound),
            SqlFederationError::Decode {
                column: "enabled",
                message: "mismatched types".to_string(),
            },
            SqlFederationError::MissingCount,
            SqlFederationError::Sqlx(sqlx::Error::PoolClosed),
        ];

        for err in cases {
            assert!(err.is_directory_error());
            assert!(FederationError::from(err).is_directory_error());
        }
    }

    #[test]
    fn non_directory_errors_keep_their_category() {
        let err: FederationError = SqlFederationError::unsupported("nickname").into();
        assert!(matches!(err, FederationError::UnsupportedParameter(p) if p == "nickname"));

        let err: FederationError = SqlFederationError::InvalidIdentifier {
            field: "user table",
            reason: "must not be empty",
        }
        .into();
        assert!(err.is_configuration_error());

        let err: FederationError = SqlFederationError::Closed.into();
        assert!(matches!(err, FederationError::Closed));
    }
}
