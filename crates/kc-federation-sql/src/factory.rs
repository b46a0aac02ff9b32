//! Provider factory: component configuration to a connected provider.

use std::sync::Arc;

use kc_federation::{
    ConfigProperty, FederationConfig, FederationResult, UserStorageProviderFactory,
};

use crate::config::{
    DatabaseConfig, DatabaseEngine, EnabledEncoding, Identifier, RoleSchema, SchemaDescriptor,
};
use crate::connection::DirectoryConnection;
use crate::directory::SqlDirectory;
use crate::error::{SqlFederationError, SqlResult};
use crate::password::PasswordHashingAlgorithm;
use crate::provider::ExternalDatabaseProvider;

/// Provider type identifier.
pub const PROVIDER_ID: &str = "external-database";

// ============================================================================
// Configuration Keys
// ============================================================================

/// Database engine selector.
pub const DB_DATABASE_KEY: &str = "db:database";
/// Alternate name of the engine selector.
pub const DB_DATABASE_ENGINE_KEY: &str = "db:database-engine";
/// Database host.
pub const DB_HOST_KEY: &str = "db:host";
/// Database port.
pub const DB_PORT_KEY: &str = "db:port";
/// Database name.
pub const DB_DATABASE_NAME_KEY: &str = "db:database-name";
/// Database user.
pub const DB_USERNAME_KEY: &str = "db:username";
/// Database password.
pub const DB_PASSWORD_KEY: &str = "db:password";
/// User table name.
pub const DB_USER_TABLE_KEY: &str = "db:user-table";
/// Username column.
pub const DB_USER_TABLE_USERNAME_COLUMN_KEY: &str = "db:user-table-username";
/// Email column.
pub const DB_USER_TABLE_EMAIL_COLUMN_KEY: &str = "db:user-table-email";
/// First name column.
pub const DB_USER_TABLE_FIRST_NAME_COLUMN_KEY: &str = "db:user-table-first-name";
/// Last name column.
pub const DB_USER_TABLE_LAST_NAME_COLUMN_KEY: &str = "db:user-table-last-name";
/// Enabled column.
pub const DB_USER_TABLE_ENABLED_COLUMN_KEY: &str = "db:user-table-enabled";
/// Enabled column encoding (`boolean` or `numeric`).
pub const DB_USER_TABLE_ENABLED_TYPE_KEY: &str = "db:user-table-enabled-type";
/// Password column.
pub const DB_USER_TABLE_PASSWORD_COLUMN_KEY: &str = "db:user-table-password";
/// User primary key column, referenced by the roles table.
pub const DB_USER_TABLE_ID_COLUMN_KEY: &str = "db:user-table-id";
/// Roles table name.
pub const DB_ROLES_TABLE_KEY: &str = "db:roles-table";
/// Role name column.
pub const DB_ROLES_TABLE_ROLE_COLUMN_KEY: &str = "db:roles-table-role";
/// Roles table foreign key to the user table.
pub const DB_ROLES_TABLE_USER_ID_COLUMN_KEY: &str = "db:roles-table-user-id";
/// Password hashing algorithm.
pub const DB_PASSWORD_HASHING_ALGORITHM_KEY: &str = "db:password-hashing-algorithm";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_USERNAME: &str = "user";
const DEFAULT_USER_TABLE: &str = "user";
const DEFAULT_USERNAME_COLUMN: &str = "username";
const DEFAULT_EMAIL_COLUMN: &str = "email";
const DEFAULT_PASSWORD_COLUMN: &str = "password";

// ============================================================================
// Factory
// ============================================================================

/// Builds [`ExternalDatabaseProvider`]s from component configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalDatabaseProviderFactory;

impl ExternalDatabaseProviderFactory {
    /// Creates the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses the component settings into a database configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unsupported engines or algorithms,
    /// malformed ports, invalid identifiers or a partial roles setup.
    pub fn database_config(&self, model: &FederationConfig) -> SqlResult<DatabaseConfig> {
        let engine = match model
            .get_non_blank(DB_DATABASE_KEY)
            .or_else(|| model.get_non_blank(DB_DATABASE_ENGINE_KEY))
        {
            Some(name) => DatabaseEngine::from_name(name)?,
            None => DatabaseEngine::default(),
        };

        let port = model
            .get_non_blank(DB_PORT_KEY)
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| SqlFederationError::config(format!("invalid port: {raw}")))
            })
            .transpose()?;

        let hashing_algorithm = match model.get_non_blank(DB_PASSWORD_HASHING_ALGORITHM_KEY) {
            Some(name) => PasswordHashingAlgorithm::from_name(name)?,
            None => PasswordHashingAlgorithm::Pkcs5S2,
        };

        let mut builder = DatabaseConfig::builder()
            .engine(engine)
            .host(model.get_non_blank(DB_HOST_KEY).unwrap_or(DEFAULT_HOST))
            .credentials(
                model.get_non_blank(DB_USERNAME_KEY).unwrap_or(DEFAULT_USERNAME),
                model.get(DB_PASSWORD_KEY).unwrap_or_default(),
            )
            .schema(schema_descriptor(model)?)
            .hashing_algorithm(hashing_algorithm);

        if let Some(database) = model.get_non_blank(DB_DATABASE_NAME_KEY) {
            builder = builder.database(database);
        }
        if let Some(port) = port {
            builder = builder.port(port);
        }

        builder.build()
    }
}

/// Reads the user table layout from the component settings.
///
/// The email column defaults to `email` when its key is absent; an
/// explicitly blank value means the table has no email column.
fn schema_descriptor(model: &FederationConfig) -> SqlResult<SchemaDescriptor> {
    let required = |field: &'static str, key: &str, default: &str| {
        Identifier::new(field, model.get_non_blank(key).unwrap_or(default))
    };
    let optional = |field: &'static str, key: &str| Identifier::optional(field, model.get(key));

    let mut schema = SchemaDescriptor::new(
        required("user table", DB_USER_TABLE_KEY, DEFAULT_USER_TABLE)?,
        required("username column", DB_USER_TABLE_USERNAME_COLUMN_KEY, DEFAULT_USERNAME_COLUMN)?,
        required("password column", DB_USER_TABLE_PASSWORD_COLUMN_KEY, DEFAULT_PASSWORD_COLUMN)?,
    );

    schema.email_column = Identifier::optional(
        "email column",
        Some(
            model
                .get(DB_USER_TABLE_EMAIL_COLUMN_KEY)
                .unwrap_or(DEFAULT_EMAIL_COLUMN),
        ),
    )?;
    schema.first_name_column = optional("first name column", DB_USER_TABLE_FIRST_NAME_COLUMN_KEY)?;
    schema.last_name_column = optional("last name column", DB_USER_TABLE_LAST_NAME_COLUMN_KEY)?;
    schema.enabled_column = optional("enabled column", DB_USER_TABLE_ENABLED_COLUMN_KEY)?;
    if let Some(encoding) = model.get_non_blank(DB_USER_TABLE_ENABLED_TYPE_KEY) {
        schema.enabled_encoding = EnabledEncoding::from_name(encoding)?;
    }

    schema.roles = RoleSchema::from_parts(
        optional("roles table", DB_ROLES_TABLE_KEY)?,
        optional("role column", DB_ROLES_TABLE_ROLE_COLUMN_KEY)?,
        optional("roles user id column", DB_ROLES_TABLE_USER_ID_COLUMN_KEY)?,
        optional("user id column", DB_USER_TABLE_ID_COLUMN_KEY)?,
    )?;

    Ok(schema)
}

impl UserStorageProviderFactory for ExternalDatabaseProviderFactory {
    type Provider = ExternalDatabaseProvider<SqlDirectory>;

    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn config_properties(&self) -> Vec<ConfigProperty> {
        let engines: Vec<&'static str> = DatabaseEngine::ALL.iter().map(|e| e.name()).collect();

        vec![
            ConfigProperty::list(DB_DATABASE_KEY, "Database", &engines)
                .default_value(DatabaseEngine::PostgreSql.name()),
            ConfigProperty::string(DB_HOST_KEY, "Database Host").default_value(DEFAULT_HOST),
            ConfigProperty::string(DB_PORT_KEY, "Database Port").default_value("5432"),
            ConfigProperty::string(DB_DATABASE_NAME_KEY, "Database Name"),
            ConfigProperty::string(DB_USERNAME_KEY, "Database Username")
                .default_value(DEFAULT_USERNAME),
            ConfigProperty::password(DB_PASSWORD_KEY, "Database Password"),
            ConfigProperty::string(DB_USER_TABLE_KEY, "User Table Name")
                .default_value(DEFAULT_USER_TABLE),
            ConfigProperty::string(DB_USER_TABLE_USERNAME_COLUMN_KEY, "Username Column Name")
                .default_value(DEFAULT_USERNAME_COLUMN),
            ConfigProperty::string(DB_USER_TABLE_EMAIL_COLUMN_KEY, "Email Column Name")
                .default_value(DEFAULT_EMAIL_COLUMN),
            ConfigProperty::string(DB_USER_TABLE_FIRST_NAME_COLUMN_KEY, "First Name Column Name"),
            ConfigProperty::string(DB_USER_TABLE_LAST_NAME_COLUMN_KEY, "Last Name Column Name"),
            ConfigProperty::string(DB_USER_TABLE_ENABLED_COLUMN_KEY, "Enabled Column Name"),
            ConfigProperty::list(
                DB_USER_TABLE_ENABLED_TYPE_KEY,
                "Enabled Column Type",
                &["boolean", "numeric"],
            )
            .default_value("boolean"),
            ConfigProperty::string(DB_USER_TABLE_PASSWORD_COLUMN_KEY, "Password Column Name")
                .default_value(DEFAULT_PASSWORD_COLUMN),
            ConfigProperty::string(DB_USER_TABLE_ID_COLUMN_KEY, "User Id Column Name"),
            ConfigProperty::string(DB_ROLES_TABLE_KEY, "Roles Table Name"),
            ConfigProperty::string(DB_ROLES_TABLE_ROLE_COLUMN_KEY, "Role Column Name"),
            ConfigProperty::string(DB_ROLES_TABLE_USER_ID_COLUMN_KEY, "Roles User Id Column Name"),
            ConfigProperty::list(
                DB_PASSWORD_HASHING_ALGORITHM_KEY,
                "Password Hashing Algorithm",
                &[PasswordHashingAlgorithm::PKCS5S2_NAME],
            )
            .default_value(PasswordHashingAlgorithm::PKCS5S2_NAME),
        ]
    }

    fn validate_configuration(&self, config: &FederationConfig) -> FederationResult<()> {
        self.database_config(config)?;
        Ok(())
    }

    async fn create(&self, config: &FederationConfig) -> FederationResult<Self::Provider> {
        let database = self.database_config(config)?;
        let connection = DirectoryConnection::connect(&database).await?;
        connection.test_connection().await?;
        let schema = Arc::new(database.schema);

        tracing::info!(
            provider = %config.id,
            name = %config.name,
            target_db = %connection.target(),
            table = %schema.user_table,
            roles = schema.supports_roles(),
            "Created external database provider"
        );

        let directory = SqlDirectory::new(Arc::clone(&schema), connection);
        Ok(ExternalDatabaseProvider::new(
            config.clone(),
            schema,
            database.hashing_algorithm,
            directory,
        ))
    }
}
