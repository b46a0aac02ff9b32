//! # kc-federation
//!
//! User federation framework for Keycloak Rust.
//!
//! This crate provides the contracts between the host and user federation
//! providers: the provider traits, the host-facing user shape, the realm
//! context providers resolve roles through, and the error taxonomy.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod provider;
pub mod realm;
pub mod storage_id;

pub use config::{ConfigProperty, FederationConfig, PropertyKind};
pub use credential::CredentialInput;
pub use error::{FederationError, FederationResult};
pub use model::FederatedUser;
pub use provider::{
    CredentialInputUpdater, CredentialInputValidator, Pagination, UserLookupProvider,
    UserQueryProvider, UserStorageProvider, UserStorageProviderFactory,
};
pub use realm::{RealmContext, RoleRef};
pub use storage_id::StorageId;
