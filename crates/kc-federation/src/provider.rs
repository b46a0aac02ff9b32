//! User storage provider traits.
//!
//! These are the contracts the host calls on a federation provider.
//! A provider is created per unit of work (one authentication attempt or
//! one admin request) and closed when that unit of work ends.
//!
//! ## Implementation Notes
//!
//! - Providers should be thread-safe (Send + Sync)
//! - All directory-facing operations are async
//! - A not-found user is `Ok(None)`, never an error

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::{ConfigProperty, FederationConfig};
use crate::credential::CredentialInput;
use crate::error::{FederationError, FederationResult};
use crate::model::FederatedUser;
use crate::realm::RealmContext;

// ============================================================================
// Pagination
// ============================================================================

/// Offset and limit for listing operations.
///
/// Both parts are optional: no `max` means no row cap, no `first` means
/// nothing is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// Number of leading rows to skip.
    pub first: Option<usize>,
    /// Maximum number of rows to return.
    pub max: Option<usize>,
}

impl Pagination {
    /// No offset and no limit.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            first: None,
            max: None,
        }
    }

    /// A page of at most `max` rows starting at `first`.
    #[must_use]
    pub const fn new(first: usize, max: usize) -> Self {
        Self {
            first: Some(first),
            max: Some(max),
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn skip(&self) -> usize {
        self.first.unwrap_or(0)
    }

    /// Number of rows to fetch before skipping, or `None` for no cap.
    ///
    /// Rows are fetched up to `first + max` and the first `first` rows
    /// are then dropped by the caller.
    #[must_use]
    pub fn row_cap(&self) -> Option<usize> {
        self.max.map(|max| max.saturating_add(self.skip()))
    }
}

// ============================================================================
// User Storage Provider
// ============================================================================

/// Lifecycle shared by every federation provider.
#[allow(async_fn_in_trait)]
pub trait UserStorageProvider: Send + Sync {
    /// Returns the provider configuration.
    fn config(&self) -> &FederationConfig;

    /// Returns the provider type identifier.
    fn provider_type(&self) -> &'static str;

    /// Closes the provider, releasing its directory connection.
    ///
    /// Any call made after `close()` fails with `FederationError::Closed`.
    async fn close(&self) -> FederationResult<()>;
}

/// Creates provider instances from stored component configuration.
///
/// A factory is a long-lived singleton; [`create`](Self::create) is called
/// once per unit of work.
#[allow(async_fn_in_trait)]
pub trait UserStorageProviderFactory: Send + Sync {
    /// Provider type produced by this factory.
    type Provider: UserStorageProvider;

    /// Returns the provider type identifier.
    fn id(&self) -> &'static str;

    /// Returns the provider-specific configuration keys.
    fn config_properties(&self) -> Vec<ConfigProperty>;

    /// Checks a component configuration without connecting anywhere.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Configuration` for invalid settings.
    fn validate_configuration(&self, config: &FederationConfig) -> FederationResult<()>;

    /// Creates a provider for one unit of work.
    async fn create(&self, config: &FederationConfig) -> FederationResult<Self::Provider>;
}

/// Single-user lookups.
#[allow(async_fn_in_trait)]
pub trait UserLookupProvider: UserStorageProvider {
    /// Gets a user by its composite storage id.
    async fn get_user_by_id(
        &self,
        realm: &dyn RealmContext,
        id: &str,
    ) -> FederationResult<Option<Arc<FederatedUser>>>;

    /// Gets a user by username.
    async fn get_user_by_username(
        &self,
        realm: &dyn RealmContext,
        username: &str,
    ) -> FederationResult<Option<Arc<FederatedUser>>>;

    /// Gets a user by email.
    async fn get_user_by_email(
        &self,
        realm: &dyn RealmContext,
        email: &str,
    ) -> FederationResult<Option<Arc<FederatedUser>>>;
}

/// Bulk queries.
#[allow(async_fn_in_trait)]
pub trait UserQueryProvider: UserStorageProvider {
    /// Counts all users in the store.
    async fn get_users_count(&self, realm: &dyn RealmContext) -> FederationResult<u64>;

    /// Lists users, optionally paginated.
    async fn get_users(
        &self,
        realm: &dyn RealmContext,
        page: Pagination,
    ) -> FederationResult<Vec<Arc<FederatedUser>>>;

    /// Free-text search over username, email and full name.
    async fn search_for_user(
        &self,
        realm: &dyn RealmContext,
        search: &str,
        page: Pagination,
    ) -> FederationResult<Vec<Arc<FederatedUser>>>;

    /// Field-wise search.
    ///
    /// Valid keys are `first`, `last`, `email`, `username` and `enabled`.
    async fn search_for_user_by_params(
        &self,
        realm: &dyn RealmContext,
        params: &HashMap<String, String>,
        page: Pagination,
    ) -> FederationResult<Vec<Arc<FederatedUser>>>;
}

// ============================================================================
// Credentials
// ============================================================================

/// Validates credentials against the external store.
///
/// ## Security
///
/// Challenge responses must never be logged.
#[allow(async_fn_in_trait)]
pub trait CredentialInputValidator: Send + Sync {
    /// Checks whether the provider can validate credentials of this type.
    fn supports_credential_type(&self, credential_type: &str) -> bool;

    /// Checks whether the user has a credential of this type configured.
    fn is_configured_for(
        &self,
        realm: &dyn RealmContext,
        user: &FederatedUser,
        credential_type: &str,
    ) -> bool;

    /// Validates a credential.
    ///
    /// Returns `Ok(false)` for unsupported credential types and for users
    /// without a resolvable credential. Directory failures are errors.
    async fn is_valid(
        &self,
        realm: &dyn RealmContext,
        user: &FederatedUser,
        input: &CredentialInput,
    ) -> FederationResult<bool>;
}

/// Credential writes. Read-only providers keep every default.
#[allow(async_fn_in_trait)]
pub trait CredentialInputUpdater: Send + Sync {
    /// Updates a credential in the external store.
    ///
    /// Returns `FederationError::ReadOnly` unless overridden.
    async fn update_credential(
        &self,
        _realm: &dyn RealmContext,
        user: &FederatedUser,
        input: &CredentialInput,
    ) -> FederationResult<bool> {
        tracing::warn!(
            username = %user.username(),
            credential_type = %input.credential_type(),
            "Rejected credential update on read-only provider"
        );
        Err(FederationError::read_only("update credential"))
    }

    /// Disables all credentials of a type. No-op unless overridden.
    async fn disable_credential_type(
        &self,
        _realm: &dyn RealmContext,
        _user: &FederatedUser,
        _credential_type: &str,
    ) -> FederationResult<()> {
        Ok(())
    }

    /// Returns the credential types that can be disabled for a user.
    fn disableable_credential_types(
        &self,
        _realm: &dyn RealmContext,
        _user: &FederatedUser,
    ) -> BTreeSet<String> {
        BTreeSet::new()
    }
}
