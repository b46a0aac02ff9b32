//! Row normalization and host user mapping.
//!
//! A [`DirectoryRow`] is one positional result row as read from the
//! database. [`UserRowMapper`] turns it into a [`NormalizedUser`] with the
//! schema's defaults applied, and a normalized user into the host's
//! [`FederatedUser`] with its roles resolved in the realm.

use std::collections::BTreeSet;
use std::fmt;

use kc_federation::{FederatedUser, FederationResult, RealmContext};
use uuid::Uuid;

use crate::config::{EnabledEncoding, EnabledValue, SchemaDescriptor};

// ============================================================================
// Rows
// ============================================================================

/// One row of the shared projection.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryRow {
    /// Column 1.
    pub username: String,
    /// Column 2.
    pub email: Option<String>,
    /// Column 3.
    pub first_name: Option<String>,
    /// Column 4.
    pub last_name: Option<String>,
    /// Column 5, `None` when the schema has no enabled column.
    pub enabled: Option<EnabledValue>,
    /// Column 6.
    pub password_hash: Option<String>,
    /// Column 7, empty when roles are not supported.
    pub roles: Vec<String>,
}

impl fmt::Debug for DirectoryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryRow")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("enabled", &self.enabled)
            .field("password_hash", &"[REDACTED]")
            .field("roles", &self.roles)
            .finish()
    }
}

/// A directory user with schema defaults applied.
///
/// Built fresh from every read and never modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedUser {
    username: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    enabled: bool,
    credential_hash: Option<String>,
    roles: BTreeSet<String>,
}

impl NormalizedUser {
    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the first name.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    /// Returns the last name.
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Returns whether the account is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the stored password hash.
    #[must_use]
    pub fn credential_hash(&self) -> Option<&str> {
        self.credential_hash.as_deref()
    }

    /// Returns the role names.
    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }
}

impl fmt::Debug for NormalizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("enabled", &self.enabled)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Mapper
// ============================================================================

/// Maps directory rows to normalized and host users.
#[derive(Debug, Clone, Copy)]
pub struct UserRowMapper {
    enabled_encoding: EnabledEncoding,
    supports_roles: bool,
}

impl UserRowMapper {
    /// Creates a mapper for a schema.
    #[must_use]
    pub const fn new(schema: &SchemaDescriptor) -> Self {
        Self {
            enabled_encoding: schema.enabled_encoding,
            supports_roles: schema.supports_roles(),
        }
    }

    /// Normalizes a row.
    ///
    /// A missing enabled column means enabled. Roles are read only when
    /// the schema supports them; empty role names are dropped.
    #[must_use]
    pub fn normalize(&self, row: DirectoryRow) -> NormalizedUser {
        let roles = if self.supports_roles {
            row.roles.into_iter().filter(|r| !r.is_empty()).collect()
        } else {
            BTreeSet::new()
        };

        NormalizedUser {
            enabled: self.enabled_encoding.is_enabled(row.enabled),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            credential_hash: row.password_hash,
            roles,
        }
    }

    /// Builds the host user, resolving each role name in the realm.
    ///
    /// Roles the realm does not know yet are created.
    ///
    /// # Errors
    ///
    /// Returns the realm's error if a role cannot be resolved or created.
    pub async fn to_federated_user(
        &self,
        realm: &dyn RealmContext,
        federation_link: Uuid,
        user: &NormalizedUser,
    ) -> FederationResult<FederatedUser> {
        let mut federated = FederatedUser::new(federation_link, user.username.clone());
        federated.set_email(user.email.clone());
        federated.set_first_name(user.first_name.clone());
        federated.set_last_name(user.last_name.clone());
        federated.set_enabled(user.enabled);

        if !user.roles.is_empty() {
            let mut mappings = BTreeSet::new();
            for name in &user.roles {
                mappings.insert(realm.get_or_add_role(name).await?);
            }
            federated.set_role_mappings(mappings);
        }

        Ok(federated)
    }
}
