//! Realm context supplied by the host.
//!
//! Federation providers never own roles. They look roles up by name in
//! the realm and ask the realm to create any role it does not know yet.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FederationResult;

/// Opaque handle to a realm role, obtained from the host by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleRef {
    /// Role name (unique within the realm).
    pub name: String,
    /// Host-side role identifier.
    pub id: Uuid,
}

impl RoleRef {
    /// Creates a new role reference.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// The slice of a host realm that federation providers need.
#[async_trait]
pub trait RealmContext: Send + Sync {
    /// Returns the realm identifier.
    fn realm_id(&self) -> Uuid;

    /// Looks up a realm role by name.
    async fn get_role(&self, name: &str) -> FederationResult<Option<RoleRef>>;

    /// Creates a realm role with the given name.
    async fn add_role(&self, name: &str) -> FederationResult<RoleRef>;

    /// Returns the named role, creating it in the realm when it is missing.
    async fn get_or_add_role(&self, name: &str) -> FederationResult<RoleRef> {
        match self.get_role(name).await? {
            Some(role) => Ok(role),
            None => {
                tracing::debug!(role = %name, realm = %self.realm_id(), "Creating missing realm role");
                self.add_role(name).await
            }
        }
    }
}
