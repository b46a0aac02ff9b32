//! Federation provider configuration.
//!
//! A [`FederationConfig`] is the component model the host stores for each
//! configured provider: identity, ordering and a flat map of
//! provider-specific settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base configuration for all federation providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Unique identifier for this provider configuration.
    pub id: Uuid,

    /// Realm this provider belongs to.
    pub realm_id: Uuid,

    /// Provider type (e.g., "external-database").
    pub provider_type: String,

    /// Display name.
    pub name: String,

    /// Priority for user lookup (lower = higher priority).
    pub priority: i32,

    /// Whether the provider is enabled.
    pub enabled: bool,

    /// Provider-specific configuration.
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl FederationConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> FederationConfigBuilder {
        FederationConfigBuilder::new()
    }

    /// Gets a config value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Gets a trimmed config value, treating blank values as unset.
    #[must_use]
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Builder for [`FederationConfig`].
#[derive(Debug, Default)]
pub struct FederationConfigBuilder {
    id: Option<Uuid>,
    realm_id: Option<Uuid>,
    provider_type: Option<String>,
    name: Option<String>,
    priority: i32,
    enabled: bool,
    config: HashMap<String, String>,
}

impl FederationConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Sets the ID.
    #[must_use]
    pub const fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the realm ID.
    #[must_use]
    pub const fn realm_id(mut self, realm_id: Uuid) -> Self {
        self.realm_id = Some(realm_id);
        self
    }

    /// Sets the provider type.
    #[must_use]
    pub fn provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether the provider is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Adds a config value.
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Builds the configuration.
    ///
    /// Missing identifiers are generated, a missing provider type or name
    /// falls back to an empty string.
    #[must_use]
    pub fn build(self) -> FederationConfig {
        let id = self.id.unwrap_or_else(Uuid::now_v7);
        FederationConfig {
            id,
            realm_id: self.realm_id.unwrap_or_else(Uuid::now_v7),
            provider_type: self.provider_type.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            priority: self.priority,
            enabled: self.enabled,
            config: self.config,
        }
    }
}

// ============================================================================
// Configuration Properties
// ============================================================================

/// Kind of input an admin console renders for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Free text.
    String,
    /// One of a fixed set of options.
    List,
    /// Masked text.
    Password,
}

/// Describes one provider-specific configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigProperty {
    /// Configuration key.
    pub name: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Input kind.
    pub kind: PropertyKind,
    /// Value used when the key is absent.
    pub default_value: Option<&'static str>,
    /// Allowed values for list properties.
    pub options: Vec<&'static str>,
    /// Whether the value must be stored as a secret.
    pub secret: bool,
}

impl ConfigProperty {
    /// Creates a free-text property.
    #[must_use]
    pub const fn string(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: PropertyKind::String,
            default_value: None,
            options: Vec::new(),
            secret: false,
        }
    }

    /// Creates a list property.
    #[must_use]
    pub fn list(name: &'static str, label: &'static str, options: &[&'static str]) -> Self {
        Self {
            kind: PropertyKind::List,
            options: options.to_vec(),
            ..Self::string(name, label)
        }
    }

    /// Creates a secret password property.
    #[must_use]
    pub const fn password(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: PropertyKind::Password,
            default_value: None,
            options: Vec::new(),
            secret: true,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: &'static str) -> Self {
        self.default_value = Some(value);
        self
    }
}
