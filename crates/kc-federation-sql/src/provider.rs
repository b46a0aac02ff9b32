//! External database storage provider.
//!
//! Serves users from an existing, read-only user table. Single-user
//! lookups are cached per provider instance by username; bulk queries
//! always go to the database and never touch the cache.
//!
//! ## Security
//!
//! - The external store is never written to
//! - Passwords and stored hashes are never logged
//! - Password checks always read the current hash from the database

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use kc_federation::credential::PASSWORD;
use kc_federation::{
    CredentialInput, CredentialInputUpdater, CredentialInputValidator, FederatedUser,
    FederationConfig, FederationError, FederationResult, Pagination, RealmContext, StorageId,
    UserLookupProvider, UserQueryProvider, UserStorageProvider,
};

use crate::config::SchemaDescriptor;
use crate::directory::{SqlDirectory, UserDirectory};
use crate::factory::PROVIDER_ID;
use crate::mapper::{DirectoryRow, UserRowMapper};
use crate::password::PasswordHashingAlgorithm;
use crate::query::UserColumn;

/// Read-only user federation over an external database.
pub struct ExternalDatabaseProvider<D: UserDirectory = SqlDirectory> {
    /// Component configuration.
    config: FederationConfig,

    /// User table layout.
    schema: Arc<SchemaDescriptor>,

    /// Algorithm of the stored password hashes.
    hashing_algorithm: PasswordHashingAlgorithm,

    /// Directory client.
    directory: D,

    /// Row mapper.
    mapper: UserRowMapper,

    /// Users already looked up in this unit of work, by username.
    cache: DashMap<String, Arc<FederatedUser>>,

    closed: AtomicBool,
}

impl<D: UserDirectory> ExternalDatabaseProvider<D> {
    /// Creates a provider over an open directory.
    #[must_use]
    pub fn new(
        config: FederationConfig,
        schema: Arc<SchemaDescriptor>,
        hashing_algorithm: PasswordHashingAlgorithm,
        directory: D,
    ) -> Self {
        let mapper = UserRowMapper::new(&schema);
        Self {
            config,
            schema,
            hashing_algorithm,
            directory,
            mapper,
            cache: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the user table layout.
    #[must_use]
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Returns the configured hashing algorithm.
    #[must_use]
    pub const fn hashing_algorithm(&self) -> &PasswordHashingAlgorithm {
        &self.hashing_algorithm
    }

    /// Returns the directory client.
    #[must_use]
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Returns the number of cached users.
    #[must_use]
    pub fn cached_users(&self) -> usize {
        self.cache.len()
    }

    /// Returns true once [`close`](UserStorageProvider::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> FederationResult<()> {
        if self.is_closed() {
            return Err(FederationError::Closed);
        }
        Ok(())
    }

    async fn to_user(
        &self,
        realm: &dyn RealmContext,
        row: DirectoryRow,
    ) -> FederationResult<Arc<FederatedUser>> {
        let normalized = self.mapper.normalize(row);
        let user = self
            .mapper
            .to_federated_user(realm, self.config.id, &normalized)
            .await?;
        Ok(Arc::new(user))
    }

    async fn to_users(
        &self,
        realm: &dyn RealmContext,
        rows: Vec<DirectoryRow>,
    ) -> FederationResult<Vec<Arc<FederatedUser>>> {
        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(self.to_user(realm, row).await?);
        }
        Ok(users)
    }
}

impl<D: UserDirectory> std::fmt::Debug for ExternalDatabaseProvider<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalDatabaseProvider")
            .field("id", &self.config.id)
            .field("name", &self.config.name)
            .field("user_table", &self.schema.user_table)
            .field("cached_users", &self.cache.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

impl<D: UserDirectory> UserStorageProvider for ExternalDatabaseProvider<D> {
    fn config(&self) -> &FederationConfig {
        &self.config
    }

    fn provider_type(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn close(&self) -> FederationResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(FederationError::Closed);
        }

        self.cache.clear();
        self.directory.close().await?;

        tracing::info!(provider = %self.config.id, "Closed external database provider");
        Ok(())
    }
}

// ============================================================================
// Lookup
// ============================================================================

impl<D: UserDirectory> UserLookupProvider for ExternalDatabaseProvider<D> {
    async fn get_user_by_id(
        &self,
        realm: &dyn RealmContext,
        id: &str,
    ) -> FederationResult<Option<Arc<FederatedUser>>> {
        let storage_id = StorageId::parse(id);
        self.get_user_by_username(realm, storage_id.external_id())
            .await
    }

    async fn get_user_by_username(
        &self,
        realm: &dyn RealmContext,
        username: &str,
    ) -> FederationResult<Option<Arc<FederatedUser>>> {
        self.ensure_open()?;

        if let Some(cached) = self.cache.get(username) {
            tracing::debug!(username = %username, "User cache hit");
            return Ok(Some(Arc::clone(cached.value())));
        }

        tracing::debug!(username = %username, "User cache miss");
        let Some(row) = self.directory.find_user(UserColumn::Username, username).await? else {
            return Ok(None);
        };

        let user = self.to_user(realm, row).await?;
        let cached = self
            .cache
            .entry(username.to_string())
            .or_insert(user)
            .value()
            .clone();

        Ok(Some(cached))
    }

    async fn get_user_by_email(
        &self,
        realm: &dyn RealmContext,
        email: &str,
    ) -> FederationResult<Option<Arc<FederatedUser>>> {
        self.ensure_open()?;

        if self.schema.email_column.is_none() {
            tracing::debug!("Email column not configured, skipping email lookup");
            return Ok(None);
        }

        let Some(row) = self.directory.find_user(UserColumn::Email, email).await? else {
            return Ok(None);
        };

        let user = self.to_user(realm, row).await?;
        self.cache
            .insert(user.username().to_string(), Arc::clone(&user));

        Ok(Some(user))
    }
}

// ============================================================================
// Queries
// ============================================================================

impl<D: UserDirectory> UserQueryProvider for ExternalDatabaseProvider<D> {
    async fn get_users_count(&self, _realm: &dyn RealmContext) -> FederationResult<u64> {
        self.ensure_open()?;
        Ok(self.directory.count_users().await?)
    }

    async fn get_users(
        &self,
        realm: &dyn RealmContext,
        page: Pagination,
    ) -> FederationResult<Vec<Arc<FederatedUser>>> {
        self.ensure_open()?;
        let rows = self.directory.list_users(page).await?;
        self.to_users(realm, rows).await
    }

    async fn search_for_user(
        &self,
        realm: &dyn RealmContext,
        search: &str,
        page: Pagination,
    ) -> FederationResult<Vec<Arc<FederatedUser>>> {
        self.ensure_open()?;
        let rows = self.directory.search_text(search, page).await?;
        self.to_users(realm, rows).await
    }

    async fn search_for_user_by_params(
        &self,
        realm: &dyn RealmContext,
        params: &HashMap<String, String>,
        page: Pagination,
    ) -> FederationResult<Vec<Arc<FederatedUser>>> {
        self.ensure_open()?;
        let rows = self.directory.search_fields(params, page).await?;
        self.to_users(realm, rows).await
    }
}

// ============================================================================
// Credentials
// ============================================================================

impl<D: UserDirectory> CredentialInputValidator for ExternalDatabaseProvider<D> {
    fn supports_credential_type(&self, credential_type: &str) -> bool {
        credential_type == PASSWORD
    }

    fn is_configured_for(
        &self,
        _realm: &dyn RealmContext,
        _user: &FederatedUser,
        credential_type: &str,
    ) -> bool {
        self.supports_credential_type(credential_type)
    }

    async fn is_valid(
        &self,
        _realm: &dyn RealmContext,
        user: &FederatedUser,
        input: &CredentialInput,
    ) -> FederationResult<bool> {
        self.ensure_open()?;

        if !self.supports_credential_type(input.credential_type()) {
            return Ok(false);
        }
        if !self.hashing_algorithm.is_supported() {
            tracing::warn!(
                algorithm = %self.hashing_algorithm,
                "Rejecting password check, hashing algorithm is not supported"
            );
            return Ok(false);
        }

        let Some(stored_hash) = self.directory.find_credential(user.username()).await? else {
            tracing::debug!(username = %user.username(), "No stored credential");
            return Ok(false);
        };

        Ok(self
            .hashing_algorithm
            .verify(input.challenge_response(), &stored_hash))
    }
}

impl<D: UserDirectory> CredentialInputUpdater for ExternalDatabaseProvider<D> {
    async fn update_credential(
        &self,
        _realm: &dyn RealmContext,
        user: &FederatedUser,
        input: &CredentialInput,
    ) -> FederationResult<bool> {
        self.ensure_open()?;

        tracing::warn!(
            username = %user.username(),
            credential_type = %input.credential_type(),
            "Rejected credential update on read-only provider"
        );
        Err(FederationError::read_only("update credential"))
    }

    async fn disable_credential_type(
        &self,
        _realm: &dyn RealmContext,
        _user: &FederatedUser,
        _credential_type: &str,
    ) -> FederationResult<()> {
        self.ensure_open()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kc_federation::credential::OTP;
    use kc_federation::RoleRef;
    use uuid::Uuid;

    use super::*;
    use crate::config::{EnabledValue, Identifier, RoleSchema};
    use crate::error::{SqlFederationError, SqlResult};
    use crate::password::pkcs5s2_hash;

    // ------------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct MemoryDirectory {
        rows: Mutex<Vec<DirectoryRow>>,
        lookups: AtomicUsize,
        credential_reads: AtomicUsize,
        fail: AtomicBool,
        closed: AtomicBool,
        case_insensitive: bool,
    }

    impl MemoryDirectory {
        fn with_rows(rows: Vec<DirectoryRow>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Self::default()
            }
        }

        fn check(&self) -> SqlResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SqlFederationError::connection("connection reset"));
            }
            Ok(())
        }

        fn page(&self, page: Pagination, keep: impl Fn(&DirectoryRow) -> bool) -> Vec<DirectoryRow> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|row| keep(*row))
                .take(page.row_cap().unwrap_or(usize::MAX))
                .skip(page.skip())
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl UserDirectory for MemoryDirectory {
        async fn find_user(&self, column: UserColumn, value: &str) -> SqlResult<Option<DirectoryRow>> {
            self.check()?;
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|row| match column {
                    UserColumn::Username if self.case_insensitive => {
                        row.username.eq_ignore_ascii_case(value)
                    }
                    UserColumn::Username => row.username == value,
                    UserColumn::Email => row.email.as_deref() == Some(value),
                })
                .cloned())
        }

        async fn find_credential(&self, username: &str) -> SqlResult<Option<String>> {
            self.check()?;
            self.credential_reads.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|row| row.username == username)
                .and_then(|row| row.password_hash.clone()))
        }

        async fn count_users(&self) -> SqlResult<u64> {
            self.check()?;
            Ok(self.rows.lock().unwrap().len() as u64)
        }

        async fn list_users(&self, page: Pagination) -> SqlResult<Vec<DirectoryRow>> {
            self.check()?;
            Ok(self.page(page, |_| true))
        }

        async fn search_text(&self, term: &str, page: Pagination) -> SqlResult<Vec<DirectoryRow>> {
            self.check()?;
            let term = term.to_lowercase();
            Ok(self.page(page, |row| row.username.to_lowercase().contains(&term)))
        }

        async fn search_fields(
            &self,
            params: &HashMap<String, String>,
            page: Pagination,
        ) -> SqlResult<Vec<DirectoryRow>> {
            self.check()?;
            if let Some(key) = params.keys().find(|k| k.as_str() != "username") {
                return Err(SqlFederationError::unsupported(key.clone()));
            }
            let wanted = params.get("username").cloned();
            Ok(self.page(page, |row| {
                wanted.as_deref().map_or(true, |w| row.username.contains(w))
            }))
        }

        async fn close(&self) -> SqlResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct TestRealm {
        roles: Mutex<HashMap<String, RoleRef>>,
    }

    #[async_trait]
    impl RealmContext for TestRealm {
        fn realm_id(&self) -> Uuid {
            Uuid::nil()
        }

        async fn get_role(&self, name: &str) -> FederationResult<Option<RoleRef>> {
            Ok(self.roles.lock().unwrap().get(name).cloned())
        }

        async fn add_role(&self, name: &str) -> FederationResult<RoleRef> {
            let role = RoleRef::new(Uuid::now_v7(), name);
            self.roles
                .lock()
                .unwrap()
                .insert(name.to_string(), role.clone());
            Ok(role)
        }
    }

    const SALT: [u8; 16] = [7; 16];

    fn ident(name: &str) -> Identifier {
        Identifier::new("test", name).unwrap()
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(ident("users"), ident("username"), ident("password"))
            .with_email_column(ident("email"))
            .with_enabled_column(ident("enabled"), crate::config::EnabledEncoding::Boolean)
            .with_roles(RoleSchema {
                roles_table: ident("roles"),
                role_column: ident("name"),
                user_foreign_key_column: ident("user_id"),
                user_primary_key_column: ident("id"),
            })
    }

    fn user_row(username: &str, password: &str) -> DirectoryRow {
        DirectoryRow {
            username: username.to_string(),
            email: Some(format!("{username}@x.com")),
            first_name: None,
            last_name: None,
            enabled: Some(EnabledValue::Boolean(Some(true))),
            password_hash: Some(pkcs5s2_hash(password, SALT)),
            roles: Vec::new(),
        }
    }

    fn provider_with(
        schema: SchemaDescriptor,
        algorithm: PasswordHashingAlgorithm,
        rows: Vec<DirectoryRow>,
    ) -> ExternalDatabaseProvider<MemoryDirectory> {
        let config = FederationConfig::builder()
            .provider_type(PROVIDER_ID)
            .name("legacy users")
            .build();
        ExternalDatabaseProvider::new(
            config,
            Arc::new(schema),
            algorithm,
            MemoryDirectory::with_rows(rows),
        )
    }

    fn provider(rows: Vec<DirectoryRow>) -> ExternalDatabaseProvider<MemoryDirectory> {
        provider_with(schema(), PasswordHashingAlgorithm::Pkcs5S2, rows)
    }

    fn alice_only() -> ExternalDatabaseProvider<MemoryDirectory> {
        provider(vec![user_row("alice", "secret")])
    }

    // ------------------------------------------------------------------------
    // Lookup and cache
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn repeated_lookup_returns_cached_object() {
        let provider = alice_only();
        let realm = TestRealm::default();

        let first = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();
        let second = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cached_users(), 1);
    }

    #[tokio::test]
    async fn lookup_is_cached_under_requested_username() {
        let mut provider = alice_only();
        provider.directory.case_insensitive = true;
        let realm = TestRealm::default();

        let first = provider.get_user_by_username(&realm, "ALICE").await.unwrap().unwrap();
        let second = provider.get_user_by_username(&realm, "ALICE").await.unwrap().unwrap();

        assert_eq!(first.username(), "alice");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_user_is_none_and_not_cached() {
        let provider = alice_only();
        let realm = TestRealm::default();

        assert!(provider.get_user_by_username(&realm, "bob").await.unwrap().is_none());
        assert!(provider.get_user_by_username(&realm, "bob").await.unwrap().is_none());
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cached_users(), 0);
    }

    #[tokio::test]
    async fn lookup_by_composite_id_uses_username() {
        let provider = alice_only();
        let realm = TestRealm::default();
        let id = format!("f:{}:alice", provider.config().id);

        let user = provider.get_user_by_id(&realm, &id).await.unwrap().unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.id().to_string(), id);
    }

    #[tokio::test]
    async fn email_lookup_is_cached_under_username() {
        let provider = alice_only();
        let realm = TestRealm::default();

        let by_email = provider
            .get_user_by_email(&realm, "alice@x.com")
            .await
            .unwrap()
            .unwrap();
        let by_name = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&by_email, &by_name));
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 1);

        provider.get_user_by_email(&realm, "alice@x.com").await.unwrap();
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn email_lookup_without_email_column_skips_directory() {
        let plain = SchemaDescriptor::new(ident("users"), ident("username"), ident("password"));
        let provider = provider_with(
            plain,
            PasswordHashingAlgorithm::Pkcs5S2,
            vec![user_row("alice", "secret")],
        );

        let user = provider
            .get_user_by_email(&TestRealm::default(), "alice@x.com")
            .await
            .unwrap();
        assert!(user.is_none());
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn roles_resolve_through_realm() {
        let mut row = user_row("alice", "secret");
        row.roles = vec!["admin".to_string(), "user".to_string()];
        let provider = provider(vec![row]);
        let realm = TestRealm::default();

        let user = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();
        assert!(user.has_role("admin"));
        assert!(user.has_role("user"));
        assert!(realm.get_role("admin").await.unwrap().is_some());
    }

    // ------------------------------------------------------------------------
    // Bulk queries
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn bulk_queries_bypass_the_cache() {
        let provider = provider(vec![user_row("alice", "a"), user_row("bob", "b")]);
        let realm = TestRealm::default();

        let users = provider.get_users(&realm, Pagination::all()).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(provider.cached_users(), 0);

        let cached = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();
        let listed = provider.get_users(&realm, Pagination::all()).await.unwrap();
        assert!(!Arc::ptr_eq(&cached, &listed[0]));
        assert_eq!(provider.directory().lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pagination_is_passed_through() {
        let rows = ["ann", "ben", "cal", "dan", "eve"]
            .into_iter()
            .map(|name| user_row(name, "pw"))
            .collect();
        let provider = provider(rows);
        let realm = TestRealm::default();

        let page = provider.get_users(&realm, Pagination::new(1, 2)).await.unwrap();
        let names: Vec<&str> = page.iter().map(|u| u.username()).collect();
        assert_eq!(names, ["ben", "cal"]);

        let all = provider.get_users(&realm, Pagination::all()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(provider.get_users_count(&realm).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn searches_delegate_to_directory() {
        let provider = provider(vec![user_row("alice", "a"), user_row("bob", "b")]);
        let realm = TestRealm::default();

        let found = provider
            .search_for_user(&realm, "ALI", Pagination::all())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username(), "alice");

        let params = HashMap::from([("username".to_string(), "bo".to_string())]);
        let found = provider
            .search_for_user_by_params(&realm, &params, Pagination::all())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username(), "bob");

        let everyone = provider
            .search_for_user_by_params(&realm, &HashMap::new(), Pagination::all())
            .await
            .unwrap();
        assert_eq!(everyone.len(), 2);
    }

    #[tokio::test]
    async fn unsupported_search_parameter_is_reported() {
        let provider = alice_only();
        let params = HashMap::from([("nickname".to_string(), "al".to_string())]);

        let err = provider
            .search_for_user_by_params(&TestRealm::default(), &params, Pagination::all())
            .await
            .unwrap_err();
        assert!(matches!(err, FederationError::UnsupportedParameter(p) if p == "nickname"));
    }

    #[tokio::test]
    async fn directory_failures_propagate() {
        let provider = alice_only();
        provider.directory().fail.store(true, Ordering::SeqCst);
        let realm = TestRealm::default();

        let err = provider.get_user_by_username(&realm, "alice").await.unwrap_err();
        assert!(err.is_directory_error());

        let user = FederatedUser::new(provider.config().id, "alice");
        let err = provider
            .is_valid(&realm, &user, &CredentialInput::password("secret"))
            .await
            .unwrap_err();
        assert!(err.is_directory_error());
    }

    // ------------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn password_check_accepts_only_matching_secret() {
        let provider = alice_only();
        let realm = TestRealm::default();
        let alice = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();

        assert!(provider
            .is_valid(&realm, &alice, &CredentialInput::password("secret"))
            .await
            .unwrap());
        assert!(!provider
            .is_valid(&realm, &alice, &CredentialInput::password("wrong"))
            .await
            .unwrap());
        assert!(provider.get_user_by_username(&realm, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn password_check_reads_current_hash() {
        let provider = alice_only();
        let realm = TestRealm::default();
        let alice = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();

        provider.directory().rows.lock().unwrap()[0].password_hash =
            Some(pkcs5s2_hash("rotated", SALT));

        let input = CredentialInput::password("rotated");
        assert!(provider.is_valid(&realm, &alice, &input).await.unwrap());
        assert_eq!(provider.directory().credential_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsupported_credential_type_is_rejected_without_query() {
        let provider = alice_only();
        let realm = TestRealm::default();
        let alice = FederatedUser::new(provider.config().id, "alice");

        let otp = CredentialInput::new(OTP, "123456");
        assert!(!provider.is_valid(&realm, &alice, &otp).await.unwrap());
        assert_eq!(provider.directory().credential_reads.load(Ordering::SeqCst), 0);

        assert!(provider.supports_credential_type(PASSWORD));
        assert!(!provider.supports_credential_type(OTP));
        assert!(provider.is_configured_for(&realm, &alice, PASSWORD));
    }

    #[tokio::test]
    async fn missing_credential_is_invalid() {
        let mut row = user_row("alice", "secret");
        row.password_hash = None;
        let provider = provider(vec![row]);
        let realm = TestRealm::default();

        let alice = FederatedUser::new(provider.config().id, "alice");
        let ghost = FederatedUser::new(provider.config().id, "ghost");
        let input = CredentialInput::password("secret");

        assert!(!provider.is_valid(&realm, &alice, &input).await.unwrap());
        assert!(!provider.is_valid(&realm, &ghost, &input).await.unwrap());
    }

    #[tokio::test]
    async fn unsupported_algorithm_is_always_invalid() {
        let provider = provider_with(
            schema(),
            PasswordHashingAlgorithm::Unsupported("bcrypt".to_string()),
            vec![user_row("alice", "secret")],
        );
        let realm = TestRealm::default();
        let alice = FederatedUser::new(provider.config().id, "alice");

        let input = CredentialInput::password("secret");
        assert!(!provider.is_valid(&realm, &alice, &input).await.unwrap());
    }

    #[tokio::test]
    async fn credential_updates_are_read_only() {
        let provider = alice_only();
        let realm = TestRealm::default();
        let alice = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();

        for credential_type in [PASSWORD, OTP] {
            let input = CredentialInput::new(credential_type, "new-secret");
            let err = provider.update_credential(&realm, &alice, &input).await.unwrap_err();
            assert!(err.is_read_only());
        }

        provider
            .disable_credential_type(&realm, &alice, PASSWORD)
            .await
            .unwrap();
        assert!(provider.disableable_credential_types(&realm, &alice).is_empty());
        assert!(provider
            .is_valid(&realm, &alice, &CredentialInput::password("secret"))
            .await
            .unwrap());
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn calls_after_close_fail_fast() {
        let provider = alice_only();
        let realm = TestRealm::default();
        let alice = provider.get_user_by_username(&realm, "alice").await.unwrap().unwrap();

        provider.close().await.unwrap();
        assert!(provider.is_closed());
        assert!(provider.directory().closed.load(Ordering::SeqCst));
        assert_eq!(provider.cached_users(), 0);

        let err = provider.get_user_by_username(&realm, "alice").await.unwrap_err();
        assert!(matches!(err, FederationError::Closed));
        let err = provider.get_users_count(&realm).await.unwrap_err();
        assert!(matches!(err, FederationError::Closed));

        let input = CredentialInput::password("secret");
        let err = provider.update_credential(&realm, &alice, &input).await.unwrap_err();
        assert!(matches!(err, FederationError::Closed));
        let err = provider
            .disable_credential_type(&realm, &alice, PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, FederationError::Closed));

        assert!(matches!(provider.close().await, Err(FederationError::Closed)));
    }

    #[test]
    fn provider_reports_its_type() {
        let provider = alice_only();
        assert_eq!(provider.provider_type(), "external-database");
        assert!(provider.schema().supports_roles());
    }
}
