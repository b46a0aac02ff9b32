//! Federation error types.
//!
//! The taxonomy keeps three outcomes apart at the host boundary:
//! a missing user (not an error, lookups return `None`), a directory
//! outage (`Directory`), and a rejected credential write (`ReadOnly`).
//! Hosts must never turn a `Directory` error into a failed login.

use thiserror::Error;

/// Errors that can occur during federation operations.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Configuration error (unsupported engine or algorithm, malformed schema).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external directory could not be read (connectivity, bad SQL, type mismatch).
    #[error("Directory I/O failure: {0}")]
    Directory(String),

    /// Provider is read-only.
    #[error("Provider is read-only: cannot {0}")]
    ReadOnly(String),

    /// A search parameter that the provider does not understand.
    #[error("Unsupported parameter: {0}")]
    UnsupportedParameter(String),

    /// A user attribute that the provider cannot supply.
    #[error("Unknown user attribute: {0}")]
    UnknownAttribute(String),

    /// The host realm failed to resolve or create a role.
    #[error("Realm error: {0}")]
    Realm(String),

    /// The provider was used after `close()`.
    #[error("Provider is closed")]
    Closed,
}

impl FederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a directory I/O error.
    #[must_use]
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    /// Creates a read-only error.
    #[must_use]
    pub fn read_only(operation: impl Into<String>) -> Self {
        Self::ReadOnly(operation.into())
    }

    /// Creates an unsupported parameter error.
    #[must_use]
    pub fn unsupported_parameter(name: impl Into<String>) -> Self {
        Self::UnsupportedParameter(name.into())
    }

    /// Creates an unknown attribute error.
    #[must_use]
    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        Self::UnknownAttribute(name.into())
    }

    /// Creates a realm error.
    #[must_use]
    pub fn realm(msg: impl Into<String>) -> Self {
        Self::Realm(msg.into())
    }

    /// Checks if this is a directory I/O failure.
    #[must_use]
    pub const fn is_directory_error(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Checks if this is a read-only rejection.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly(_))
    }

    /// Checks if this is a configuration error.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_categories() {
        assert!(FederationError::directory("connection refused").is_directory_error());
        assert!(FederationError::read_only("update credential").is_read_only());
        assert!(FederationError::config("unknown engine").is_configuration_error());

        assert!(!FederationError::read_only("update credential").is_directory_error());
        assert!(!FederationError::directory("timeout").is_read_only());
        assert!(!FederationError::Closed.is_directory_error());
    }

    #[test]
    fn read_only_message_names_operation() {
        let err = FederationError::read_only("update credential");
        assert_eq!(
            err.to_string(),
            "Provider is read-only: cannot update credential"
        );
    }
}
