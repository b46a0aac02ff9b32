//! Host-facing user model for federated users.
//!
//! A [`FederatedUser`] is what providers hand back to the host. It is
//! populated through setters and exposes its profile both as typed
//! accessors and as the host's attribute map.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::error::{FederationError, FederationResult};
use crate::realm::RoleRef;
use crate::storage_id::StorageId;

/// Attribute name for the username.
pub const USERNAME: &str = "username";
/// Attribute name for the email address.
pub const EMAIL: &str = "email";
/// Attribute name for the first name.
pub const FIRST_NAME: &str = "firstName";
/// Attribute name for the last name.
pub const LAST_NAME: &str = "lastName";
/// Attribute name for the enabled flag.
pub const ENABLED: &str = "enabled";

/// A user served by a federation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedUser {
    // === Identity ===
    id: StorageId,
    federation_link: Uuid,
    username: String,
    enabled: bool,

    // === Profile ===
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,

    // === Authorization ===
    role_mappings: BTreeSet<RoleRef>,
}

impl FederatedUser {
    /// Creates an enabled user with no profile data and no roles.
    #[must_use]
    pub fn new(federation_link: Uuid, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: StorageId::new(federation_link, username.clone()),
            federation_link,
            username,
            enabled: true,
            email: None,
            first_name: None,
            last_name: None,
            role_mappings: BTreeSet::new(),
        }
    }

    /// Returns the composite storage id.
    #[must_use]
    pub const fn id(&self) -> &StorageId {
        &self.id
    }

    /// Returns the id of the provider component serving this user.
    #[must_use]
    pub const fn federation_link(&self) -> Uuid {
        self.federation_link
    }

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

    /// Returns the roles granted to this user.
    #[must_use]
    pub const fn role_mappings(&self) -> &BTreeSet<RoleRef> {
        &self.role_mappings
    }

    /// Checks whether the user holds a role with the given name.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.role_mappings.iter().any(|r| r.name == name)
    }

    /// Sets the email address.
    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    /// Sets the first name.
    pub fn set_first_name(&mut self, first_name: Option<String>) {
        self.first_name = first_name;
    }

    /// Sets the last name.
    pub fn set_last_name(&mut self, last_name: Option<String>) {
        self.last_name = last_name;
    }

    /// Sets whether the account is enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Replaces the role mappings.
    pub fn set_role_mappings(&mut self, roles: BTreeSet<RoleRef>) {
        self.role_mappings = roles;
    }

    /// Gets the user's full name.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }

    /// Returns the first value of a profile attribute.
    ///
    /// # Errors
    ///
    /// Returns `FederationError::UnknownAttribute` for any attribute the
    /// provider does not supply.
    pub fn first_attribute(&self, name: &str) -> FederationResult<Option<String>> {
        match name {
            USERNAME => Ok(Some(self.username.clone())),
            EMAIL => Ok(self.email.clone()),
            FIRST_NAME => Ok(self.first_name.clone()),
            LAST_NAME => Ok(self.last_name.clone()),
            ENABLED => Ok(Some(self.enabled.to_string())),
            other => Err(FederationError::unknown_attribute(other)),
        }
    }

    /// Returns the profile as the host's multi-valued attribute map.
    ///
    /// Unset optional attributes are omitted.
    #[must_use]
    pub fn attributes(&self) -> HashMap<String, Vec<String>> {
        let mut attributes = HashMap::new();
        attributes.insert(USERNAME.to_string(), vec![self.username.clone()]);
        attributes.insert(ENABLED.to_string(), vec![self.enabled.to_string()]);

        let optional = [
            (EMAIL, &self.email),
            (FIRST_NAME, &self.first_name),
            (LAST_NAME, &self.last_name),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                attributes.insert(name.to_string(), vec![v.clone()]);
            }
        }

        attributes
    }
}
