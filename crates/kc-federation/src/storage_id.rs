//! Composite identifiers for federated users.
//!
//! Users served by a federation provider carry ids of the form
//! `f:<provider-id>:<external-id>`. Ids without the `f:` prefix belong to
//! local storage and their external part is the whole id.

use std::fmt;

use uuid::Uuid;

const FEDERATED_PREFIX: &str = "f:";

/// A parsed user storage identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageId {
    provider_id: Option<String>,
    external_id: String,
}

impl StorageId {
    /// Creates a federated storage id for the given provider component.
    #[must_use]
    pub fn new(provider_id: Uuid, external_id: impl Into<String>) -> Self {
        Self {
            provider_id: Some(provider_id.to_string()),
            external_id: external_id.into(),
        }
    }

    /// Parses a host-provided identifier.
    #[must_use]
    pub fn parse(id: &str) -> Self {
        if let Some(rest) = id.strip_prefix(FEDERATED_PREFIX) {
            if let Some((provider, external)) = rest.split_once(':') {
                return Self {
                    provider_id: Some(provider.to_string()),
                    external_id: external.to_string(),
                };
            }
        }

        Self {
            provider_id: None,
            external_id: id.to_string(),
        }
    }

    /// Returns the provider component id, if this is a federated id.
    #[must_use]
    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    /// Returns the external id (the username for SQL-backed providers).
    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Returns true if the id points at a federation provider.
    #[must_use]
    pub const fn is_federated(&self) -> bool {
        self.provider_id.is_some()
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider_id {
            Some(provider) => write!(f, "{FEDERATED_PREFIX}{provider}:{}", self.external_id),
            None => f.write_str(&self.external_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federated_id_round_trip() {
        let provider = Uuid::now_v7();
        let id = StorageId::new(provider, "alice");
        let text = id.to_string();

        assert_eq!(text, format!("f:{provider}:alice"));

        let parsed = StorageId::parse(&text);
        assert!(parsed.is_federated());
        assert_eq!(parsed.external_id(), "alice");
        assert_eq!(parsed.provider_id(), Some(provider.to_string().as_str()));
    }

    #[test]
    fn external_id_may_contain_colons() {
        let parsed = StorageId::parse("f:provider:domain:alice");
        assert_eq!(parsed.provider_id(), Some("provider"));
        assert_eq!(parsed.external_id(), "domain:alice");
    }

    #[test]
    fn local_ids_are_not_federated() {
        let parsed = StorageId::parse("0b5a7d3e-local");
        assert!(!parsed.is_federated());
        assert_eq!(parsed.external_id(), "0b5a7d3e-local");
    }
}
