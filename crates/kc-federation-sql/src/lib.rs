//! # kc-federation-sql
//!
//! External database federation provider for Keycloak Rust.
//!
//! Serves users out of an existing relational user table (with an optional
//! roles table) described entirely by configuration. The store is read-only:
//! users are looked up, listed, searched and their passwords checked, but
//! nothing is ever written back.
//!
//! ## Layers
//!
//! - [`config`]: schema descriptor and connection settings
//! - [`query`]: parameterized SQL built from the schema descriptor
//! - [`directory`]: runs queries on one connection and decodes rows
//! - [`mapper`]: rows to normalized users to host users
//! - [`provider`]: host-facing provider with its per-instance user cache
//! - [`factory`]: component configuration to a connected provider

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod factory;
pub mod mapper;
pub mod password;
pub mod provider;
pub mod query;

pub use config::{
    DatabaseConfig, DatabaseEngine, EnabledEncoding, Identifier, RoleSchema, SchemaDescriptor,
};
pub use connection::DirectoryConnection;
pub use directory::{SqlDirectory, UserDirectory};
pub use error::{SqlFederationError, SqlResult};
pub use factory::{ExternalDatabaseProviderFactory, PROVIDER_ID};
pub use mapper::{DirectoryRow, NormalizedUser, UserRowMapper};
pub use password::PasswordHashingAlgorithm;
pub use provider::ExternalDatabaseProvider;
pub use query::{QueryBuilder, SearchField, SqlQuery, UserColumn};
