//! External database provider configuration.
//!
//! The administrator describes an existing user table (and optionally a
//! roles table) by name. Those names are the only configuration that ends
//! up in SQL text, so every one of them is validated once, here, and
//! quoted by [`Identifier::quoted`] wherever it is used.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SqlFederationError, SqlResult};
use crate::password::PasswordHashingAlgorithm;

// ============================================================================
// Database Engine
// ============================================================================

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatabaseEngine {
    /// PostgreSQL.
    #[default]
    #[serde(rename = "PostgreSQL")]
    PostgreSql,
}

impl DatabaseEngine {
    /// All supported engines, in the order offered to administrators.
    pub const ALL: [Self; 1] = [Self::PostgreSql];

    /// Returns the selector name shown to administrators.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PostgreSql => "PostgreSQL",
        }
    }

    /// Returns the engine's default port.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::PostgreSql => 5432,
        }
    }

    /// Resolves a selector name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unsupported engines.
    pub fn from_name(name: &str) -> SqlResult<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|engine| engine.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SqlFederationError::config(format!("{name} is not supported")))
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// A validated table or column name.
///
/// Identifiers are trimmed, non-empty and free of NUL bytes. They are
/// only ever rendered through [`Identifier::quoted`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validates an identifier for the named configuration field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the trimmed name is empty or contains NUL.
    pub fn new(field: &'static str, raw: &str) -> SqlResult<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(SqlFederationError::InvalidIdentifier {
                field,
                reason: "must not be empty",
            });
        }
        if name.contains('\0') {
            return Err(SqlFederationError::InvalidIdentifier {
                field,
                reason: "must not contain NUL characters",
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Validates an optional identifier, treating blank values as unset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if a non-blank name contains NUL.
    pub fn optional(field: &'static str, raw: Option<&str>) -> SqlResult<Option<Self>> {
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            Some(name) => Self::new(field, name).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the bare name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name as a double-quoted SQL identifier.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl TryFrom<String> for Identifier {
    type Error = SqlFederationError;

    fn try_from(value: String) -> SqlResult<Self> {
        Self::new("identifier", &value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Enabled Column Encoding
// ============================================================================

/// How the "enabled" column stores its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnabledEncoding {
    /// A SQL boolean column.
    #[default]
    Boolean,
    /// A numeric column where `1` means enabled and anything else disabled.
    Numeric,
}

/// A raw "enabled" cell as read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledValue {
    /// Value of a boolean column.
    Boolean(Option<bool>),
    /// Value of a numeric column.
    Numeric(Option<i64>),
}

impl EnabledEncoding {
    /// Resolves a selector name (`boolean` or `numeric`), ignoring case.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for any other name.
    pub fn from_name(name: &str) -> SqlResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(Self::Boolean),
            "numeric" => Ok(Self::Numeric),
            other => Err(SqlFederationError::config(format!(
                "unsupported enabled column type: {other}"
            ))),
        }
    }

    /// Converts a raw cell to the enabled flag.
    ///
    /// `None` means the schema has no enabled column, which defaults to
    /// enabled. A NULL cell in a configured column is disabled.
    #[must_use]
    pub const fn is_enabled(&self, value: Option<EnabledValue>) -> bool {
        match value {
            None => true,
            Some(EnabledValue::Boolean(flag)) => matches!(flag, Some(true)),
            Some(EnabledValue::Numeric(number)) => matches!(number, Some(1)),
        }
    }

    /// Parses the value of an `enabled` search parameter.
    ///
    /// Only `true` (any case) means enabled.
    #[must_use]
    pub fn parse_flag(value: &str) -> bool {
        value.trim().eq_ignore_ascii_case("true")
    }
}

// ============================================================================
// Schema Descriptor
// ============================================================================

/// Layout of an optional roles table joined to the user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSchema {
    /// Roles table name.
    pub roles_table: Identifier,
    /// Column of the roles table holding the role name.
    pub role_column: Identifier,
    /// Column of the roles table referencing the user.
    pub user_foreign_key_column: Identifier,
    /// Column of the user table the foreign key points at.
    pub user_primary_key_column: Identifier,
}

impl RoleSchema {
    /// Builds a role schema from its four optional parts.
    ///
    /// All four parts set yields `Some`, none set yields `None`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if only some of the parts are set.
    pub fn from_parts(
        roles_table: Option<Identifier>,
        role_column: Option<Identifier>,
        user_foreign_key_column: Option<Identifier>,
        user_primary_key_column: Option<Identifier>,
    ) -> SqlResult<Option<Self>> {
        match (
            roles_table,
            role_column,
            user_foreign_key_column,
            user_primary_key_column,
        ) {
            (Some(roles_table), Some(role_column), Some(fk), Some(pk)) => Ok(Some(Self {
                roles_table,
                role_column,
                user_foreign_key_column: fk,
                user_primary_key_column: pk,
            })),
            (None, None, None, None) => Ok(None),
            _ => Err(SqlFederationError::config(
                "roles table, role column, user foreign key column and user primary key \
                 column must be configured together",
            )),
        }
    }
}

/// Immutable description of the external user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// User table name.
    pub user_table: Identifier,
    /// Username column (the identity key).
    pub username_column: Identifier,
    /// Email column, if the table has one.
    pub email_column: Option<Identifier>,
    /// First name column.
    pub first_name_column: Option<Identifier>,
    /// Last name column.
    pub last_name_column: Option<Identifier>,
    /// Password hash column.
    pub password_column: Identifier,
    /// Enabled flag column.
    pub enabled_column: Option<Identifier>,
    /// Encoding of the enabled column.
    pub enabled_encoding: EnabledEncoding,
    /// Roles table layout, when roles are supported.
    pub roles: Option<RoleSchema>,
}

impl SchemaDescriptor {
    /// Creates a descriptor for a plain user table with username and password columns.
    #[must_use]
    pub fn new(user_table: Identifier, username_column: Identifier, password_column: Identifier) -> Self {
        Self {
            user_table,
            username_column,
            email_column: None,
            first_name_column: None,
            last_name_column: None,
            password_column,
            enabled_column: None,
            enabled_encoding: EnabledEncoding::default(),
            roles: None,
        }
    }

    /// Returns true if a roles table is configured.
    #[must_use]
    pub const fn supports_roles(&self) -> bool {
        self.roles.is_some()
    }

    /// Sets the email column.
    #[must_use]
    pub fn with_email_column(mut self, column: Identifier) -> Self {
        self.email_column = Some(column);
        self
    }

    /// Sets the first and last name columns.
    #[must_use]
    pub fn with_name_columns(mut self, first: Identifier, last: Identifier) -> Self {
        self.first_name_column = Some(first);
        self.last_name_column = Some(last);
        self
    }

    /// Sets the enabled column and its encoding.
    #[must_use]
    pub fn with_enabled_column(mut self, column: Identifier, encoding: EnabledEncoding) -> Self {
        self.enabled_column = Some(column);
        self.enabled_encoding = encoding;
        self
    }

    /// Sets the roles table layout.
    #[must_use]
    pub fn with_roles(mut self, roles: RoleSchema) -> Self {
        self.roles = Some(roles);
        self
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Everything needed to reach and read the external user table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    // === Connection ===
    /// Database engine.
    pub engine: DatabaseEngine,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Database user.
    pub username: String,
    /// Database password.
    #[serde(skip_serializing, default)]
    pub password: String,

    // === Schema ===
    /// User table layout.
    pub schema: SchemaDescriptor,

    // === Credentials ===
    /// Algorithm the stored password hashes use.
    pub hashing_algorithm: PasswordHashingAlgorithm,
}

impl DatabaseConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the host or database name is empty.
    pub fn validate(&self) -> SqlResult<()> {
        if self.host.trim().is_empty() {
            return Err(SqlFederationError::config("host cannot be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(SqlFederationError::config("database name cannot be empty"));
        }
        Ok(())
    }
}

/// Builder for [`DatabaseConfig`].
#[derive(Debug)]
pub struct DatabaseConfigBuilder {
    engine: DatabaseEngine,
    host: String,
    port: Option<u16>,
    database: Option<String>,
    username: String,
    password: String,
    schema: Option<SchemaDescriptor>,
    hashing_algorithm: PasswordHashingAlgorithm,
}

impl Default for DatabaseConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: DatabaseEngine::default(),
            host: "127.0.0.1".to_string(),
            port: None,
            database: None,
            username: "user".to_string(),
            password: String::new(),
            schema: None,
            hashing_algorithm: PasswordHashingAlgorithm::Pkcs5S2,
        }
    }

    /// Sets the database engine.
    #[must_use]
    pub const fn engine(mut self, engine: DatabaseEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the database user and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the user table layout.
    #[must_use]
    pub fn schema(mut self, schema: SchemaDescriptor) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the password hashing algorithm.
    #[must_use]
    pub fn hashing_algorithm(mut self, algorithm: PasswordHashingAlgorithm) -> Self {
        self.hashing_algorithm = algorithm;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database name or schema is missing, or if
    /// validation fails.
    pub fn build(self) -> SqlResult<DatabaseConfig> {
        let config = DatabaseConfig {
            port: self.port.unwrap_or_else(|| self.engine.default_port()),
            engine: self.engine,
            host: self.host,
            database: self
                .database
                .ok_or_else(|| SqlFederationError::config("database name is required"))?,
            username: self.username,
            password: self.password,
            schema: self
                .schema
                .ok_or_else(|| SqlFederationError::config("user table schema is required"))?,
            hashing_algorithm: self.hashing_algorithm,
        };

        config.validate()?;

        Ok(config)
    }
}
