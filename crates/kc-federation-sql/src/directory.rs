//! Directory client: runs built statements and decodes rows.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kc_federation::Pagination;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::config::{EnabledEncoding, EnabledValue, SchemaDescriptor};
use crate::connection::DirectoryConnection;
use crate::error::{SqlFederationError, SqlResult};
use crate::mapper::DirectoryRow;
use crate::query::{QueryBuilder, SqlQuery, UserColumn};

/// Read access to the external user table.
///
/// Implementations run each call as one statement and return raw rows;
/// normalization and caching happen in the provider.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the first row whose column equals `value`.
    async fn find_user(&self, column: UserColumn, value: &str) -> SqlResult<Option<DirectoryRow>>;

    /// Returns the stored password hash of a user.
    ///
    /// `None` when the user does not exist or the hash is `NULL`.
    async fn find_credential(&self, username: &str) -> SqlResult<Option<String>>;

    /// Counts the rows of the user table.
    async fn count_users(&self) -> SqlResult<u64>;

    /// Lists users.
    async fn list_users(&self, page: Pagination) -> SqlResult<Vec<DirectoryRow>>;

    /// Free-text search.
    async fn search_text(&self, term: &str, page: Pagination) -> SqlResult<Vec<DirectoryRow>>;

    /// Field-wise search.
    async fn search_fields(
        &self,
        params: &HashMap<String, String>,
        page: Pagination,
    ) -> SqlResult<Vec<DirectoryRow>>;

    /// Releases the underlying connection.
    async fn close(&self) -> SqlResult<()>;
}

/// [`UserDirectory`] over a live database connection.
#[derive(Debug)]
pub struct SqlDirectory {
    schema: Arc<SchemaDescriptor>,
    connection: DirectoryConnection,
}

impl SqlDirectory {
    /// Creates a directory client.
    #[must_use]
    pub const fn new(schema: Arc<SchemaDescriptor>, connection: DirectoryConnection) -> Self {
        Self { schema, connection }
    }

    fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.schema)
    }

    /// Streams rows, stopping after `first + max` and dropping the first
    /// `first` of them.
    async fn fetch_page(&self, query: SqlQuery, page: Pagination) -> SqlResult<Vec<DirectoryRow>> {
        let mut conn = self.connection.acquire().await?;

        let mut statement = sqlx::query(&query.sql);
        for param in &query.params {
            statement = statement.bind(param.as_str());
        }

        let rows: Vec<PgRow> = statement
            .fetch(&mut *conn)
            .take(page.row_cap().unwrap_or(usize::MAX))
            .skip(page.skip())
            .try_collect()
            .await
            .map_err(SqlFederationError::query_failed)?;

        tracing::debug!(
            table = %self.schema.user_table,
            rows = rows.len(),
            first = page.skip(),
            max = ?page.max,
            "Fetched directory page"
        );

        rows.iter().map(|row| self.decode(row)).collect()
    }

    fn decode(&self, row: &PgRow) -> SqlResult<DirectoryRow> {
        let enabled = match (&self.schema.enabled_column, self.schema.enabled_encoding) {
            (None, _) => None,
            (Some(_), EnabledEncoding::Boolean) => {
                Some(EnabledValue::Boolean(column(row, 4, "enabled")?))
            }
            (Some(_), EnabledEncoding::Numeric) => {
                Some(EnabledValue::Numeric(column(row, 4, "enabled")?))
            }
        };

        let roles = if self.schema.supports_roles() {
            column::<Option<Vec<String>>>(row, 6, "roles")?.unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(DirectoryRow {
            username: column(row, 0, "username")?,
            email: column(row, 1, "email")?,
            first_name: column(row, 2, "first name")?,
            last_name: column(row, 3, "last name")?,
            enabled,
            password_hash: column(row, 5, "password")?,
            roles,
        })
    }
}

fn column<'r, T>(row: &'r PgRow, index: usize, name: &'static str) -> SqlResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(index).map_err(|e| SqlFederationError::Decode {
        column: name,
        message: e.to_string(),
    })
}

#[async_trait]
impl UserDirectory for SqlDirectory {
    async fn find_user(&self, column: UserColumn, value: &str) -> SqlResult<Option<DirectoryRow>> {
        let query = self.queries().find_by(column, value)?;
        let rows = self.fetch_page(query, Pagination::new(0, 1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_credential(&self, username: &str) -> SqlResult<Option<String>> {
        let query = self.queries().credential(username);
        let mut conn = self.connection.acquire().await?;

        let hash: Option<Option<String>> = sqlx::query_scalar(&query.sql)
            .bind(username)
            .fetch_optional(&mut *conn)
            .await
            .map_err(SqlFederationError::query_failed)?;

        Ok(hash.flatten())
    }

    async fn count_users(&self) -> SqlResult<u64> {
        let query = self.queries().count();
        let mut conn = self.connection.acquire().await?;

        let count: Option<i64> = sqlx::query_scalar(&query.sql)
            .fetch_optional(&mut *conn)
            .await
            .map_err(SqlFederationError::query_failed)?;

        let count = count.ok_or(SqlFederationError::MissingCount)?;
        u64::try_from(count).map_err(|e| SqlFederationError::Decode {
            column: "count",
            message: e.to_string(),
        })
    }

    async fn list_users(&self, page: Pagination) -> SqlResult<Vec<DirectoryRow>> {
        self.fetch_page(self.queries().list(), page).await
    }

    async fn search_text(&self, term: &str, page: Pagination) -> SqlResult<Vec<DirectoryRow>> {
        self.fetch_page(self.queries().search_text(term), page).await
    }

    async fn search_fields(
        &self,
        params: &HashMap<String, String>,
        page: Pagination,
    ) -> SqlResult<Vec<DirectoryRow>> {
        let query = self.queries().search_fields(params)?;
        self.fetch_page(query, page).await
    }

    async fn close(&self) -> SqlResult<()> {
        self.connection.close().await
    }
}
