//! SQL construction over a [`SchemaDescriptor`].
//!
//! Every statement shares one projection so rows can be read positionally:
//!
//! | # | column                | type        |
//! |---|-----------------------|-------------|
//! | 1 | username              | `text`      |
//! | 2 | email                 | `text`      |
//! | 3 | first name            | `text`      |
//! | 4 | last name             | `text`      |
//! | 5 | enabled               | `boolean` or `bigint` |
//! | 6 | password hash         | `text`      |
//! | 7 | role names (if roles) | `text[]`    |
//!
//! Unconfigured optional columns are projected as typed `NULL`s. Identifiers
//! come only from the validated descriptor and every value is a bind
//! parameter.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::config::{EnabledEncoding, Identifier, SchemaDescriptor};
use crate::error::{SqlFederationError, SqlResult};

const USER_ALIAS: &str = "u";
const ROLE_ALIAS: &str = "r";

// ============================================================================
// Columns and Fields
// ============================================================================

/// Columns usable for an exact single-user lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    /// The username column.
    Username,
    /// The email column.
    Email,
}

impl fmt::Display for UserColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Email => f.write_str("email"),
        }
    }
}

/// Fields accepted by structured search.
///
/// The derived ordering fixes the order predicates are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchField {
    /// `username`
    Username,
    /// `email`
    Email,
    /// `first`
    FirstName,
    /// `last`
    LastName,
    /// `enabled`
    Enabled,
}

impl SearchField {
    /// Returns the parameter name of this field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::FirstName => "first",
            Self::LastName => "last",
            Self::Enabled => "enabled",
        }
    }
}

impl FromStr for SearchField {
    type Err = SqlFederationError;

    fn from_str(s: &str) -> SqlResult<Self> {
        match s {
            "username" => Ok(Self::Username),
            "email" => Ok(Self::Email),
            "first" => Ok(Self::FirstName),
            "last" => Ok(Self::LastName),
            "enabled" => Ok(Self::Enabled),
            other => Err(SqlFederationError::unsupported(other)),
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// A statement with its positional text parameters (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    /// Statement text.
    pub sql: String,
    /// Parameter values, bound in order.
    pub params: Vec<String>,
}

impl SqlQuery {
    fn new(sql: String, params: Vec<String>) -> Self {
        Self { sql, params }
    }
}

/// Wraps a search term in `%` wildcards.
///
/// The term is trimmed first; a side that already starts or ends with `%`
/// is left as is.
#[must_use]
pub fn wrap_wildcards(term: &str) -> String {
    let term = term.trim();
    let mut wrapped = String::with_capacity(term.len() + 2);
    if !term.starts_with('%') {
        wrapped.push('%');
    }
    wrapped.push_str(term);
    if !wrapped.ends_with('%') {
        wrapped.push('%');
    }
    wrapped
}

// ============================================================================
// Query Builder
// ============================================================================

/// Builds the statements the directory client runs.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    schema: &'a SchemaDescriptor,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder for a schema.
    #[must_use]
    pub const fn new(schema: &'a SchemaDescriptor) -> Self {
        Self { schema }
    }

    /// Exact match on one column.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedParameter` if the column is not configured.
    pub fn find_by(&self, column: UserColumn, value: &str) -> SqlResult<SqlQuery> {
        let target = match column {
            UserColumn::Username => &self.schema.username_column,
            UserColumn::Email => self
                .schema
                .email_column
                .as_ref()
                .ok_or_else(|| SqlFederationError::unsupported(column.to_string()))?,
        };

        let filter = format!("{} = $1", qualified(USER_ALIAS, target));
        Ok(SqlQuery::new(
            self.select(Some(&filter)),
            vec![value.to_string()],
        ))
    }

    /// Current password hash of one user.
    #[must_use]
    pub fn credential(&self, username: &str) -> SqlQuery {
        let sql = format!(
            "SELECT {} FROM {} AS {USER_ALIAS} WHERE {} = $1",
            qualified(USER_ALIAS, &self.schema.password_column),
            self.schema.user_table.quoted(),
            qualified(USER_ALIAS, &self.schema.username_column),
        );
        SqlQuery::new(sql, vec![username.to_string()])
    }

    /// Row count of the user table.
    #[must_use]
    pub fn count(&self) -> SqlQuery {
        SqlQuery::new(
            format!("SELECT COUNT(*) FROM {}", self.schema.user_table.quoted()),
            Vec::new(),
        )
    }

    /// Every user.
    #[must_use]
    pub fn list(&self) -> SqlQuery {
        SqlQuery::new(self.select(None), Vec::new())
    }

    /// Case-insensitive match of one term against username, email and
    /// `first || ' ' || last`.
    #[must_use]
    pub fn search_text(&self, term: &str) -> SqlQuery {
        let mut targets = vec![qualified(USER_ALIAS, &self.schema.username_column)];
        if let Some(email) = &self.schema.email_column {
            targets.push(qualified(USER_ALIAS, email));
        }
        match (&self.schema.first_name_column, &self.schema.last_name_column) {
            (Some(first), Some(last)) => targets.push(format!(
                "({} || ' ' || {})",
                qualified(USER_ALIAS, first),
                qualified(USER_ALIAS, last)
            )),
            (Some(only), None) | (None, Some(only)) => targets.push(qualified(USER_ALIAS, only)),
            (None, None) => {}
        }

        let filter = targets
            .iter()
            .map(|target| format!("{target} ILIKE $1"))
            .collect::<Vec<_>>()
            .join(" OR ");

        SqlQuery::new(
            self.select(Some(&format!("({filter})"))),
            vec![wrap_wildcards(term)],
        )
    }

    /// Field-wise match, predicates joined with `AND`.
    ///
    /// Text fields use `LIKE` with wildcard wrapping. `enabled` is an
    /// equality test in the column's encoding. An empty map matches every
    /// row.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedParameter` for unknown keys and for fields whose
    /// column is not configured.
    pub fn search_fields(&self, params: &HashMap<String, String>) -> SqlResult<SqlQuery> {
        let mut fields = BTreeMap::new();
        for (key, value) in params {
            let field: SearchField = key.parse()?;
            fields.insert(field, value.as_str());
        }

        let mut predicates = Vec::with_capacity(fields.len());
        let mut binds = Vec::with_capacity(fields.len());

        for (field, value) in fields {
            let column = self
                .column_for(field)
                .ok_or_else(|| SqlFederationError::unsupported(field.as_str()))?;
            let target = qualified(USER_ALIAS, column);

            if field == SearchField::Enabled {
                let enabled = EnabledEncoding::parse_flag(value);
                match self.schema.enabled_encoding {
                    EnabledEncoding::Boolean => {
                        binds.push(enabled.to_string());
                        predicates.push(format!("{target} = CAST(${} AS BOOLEAN)", binds.len()));
                    }
                    EnabledEncoding::Numeric if enabled => {
                        predicates.push(format!("{target} = 1"));
                    }
                    EnabledEncoding::Numeric => {
                        predicates.push(format!("{target} IS DISTINCT FROM 1"));
                    }
                }
            } else {
                binds.push(wrap_wildcards(value));
                predicates.push(format!("{target} LIKE ${}", binds.len()));
            }
        }

        let filter = (!predicates.is_empty()).then(|| predicates.join(" AND "));
        Ok(SqlQuery::new(self.select(filter.as_deref()), binds))
    }

    fn column_for(&self, field: SearchField) -> Option<&'a Identifier> {
        let schema = self.schema;
        match field {
            SearchField::Username => Some(&schema.username_column),
            SearchField::Email => schema.email_column.as_ref(),
            SearchField::FirstName => schema.first_name_column.as_ref(),
            SearchField::LastName => schema.last_name_column.as_ref(),
            SearchField::Enabled => schema.enabled_column.as_ref(),
        }
    }

    /// Projection, source, optional filter, grouping and ordering.
    fn select(&self, filter: Option<&str>) -> String {
        let schema = self.schema;
        let optional_text = |column: &Option<Identifier>| match column {
            Some(c) => qualified(USER_ALIAS, c),
            None => "NULL::text".to_string(),
        };
        let enabled = match (&schema.enabled_column, schema.enabled_encoding) {
            (Some(c), EnabledEncoding::Boolean) => qualified(USER_ALIAS, c),
            (Some(c), EnabledEncoding::Numeric) => {
                format!("CAST({} AS BIGINT)", qualified(USER_ALIAS, c))
            }
            (None, EnabledEncoding::Boolean) => "NULL::boolean".to_string(),
            (None, EnabledEncoding::Numeric) => "NULL::bigint".to_string(),
        };

        let mut sql = format!(
            "SELECT {}, {}, {}, {}, {}, {}",
            qualified(USER_ALIAS, &schema.username_column),
            optional_text(&schema.email_column),
            optional_text(&schema.first_name_column),
            optional_text(&schema.last_name_column),
            enabled,
            qualified(USER_ALIAS, &schema.password_column),
        );

        if let Some(roles) = &schema.roles {
            sql.push_str(&format!(
                ", array_remove(array_agg(CAST({} AS TEXT)), NULL)",
                qualified(ROLE_ALIAS, &roles.role_column)
            ));
        }

        sql.push_str(&format!(" FROM {} AS {USER_ALIAS}", schema.user_table.quoted()));

        if let Some(roles) = &schema.roles {
            sql.push_str(&format!(
                " LEFT OUTER JOIN {} AS {ROLE_ALIAS} ON {} = {}",
                roles.roles_table.quoted(),
                qualified(ROLE_ALIAS, &roles.user_foreign_key_column),
                qualified(USER_ALIAS, &roles.user_primary_key_column),
            ));
        }

        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }

        if schema.supports_roles() {
            sql.push_str(" GROUP BY 1, 2, 3, 4, 5, 6");
        }

        sql.push_str(" ORDER BY 1");
        sql
    }
}

fn qualified(alias: &str, column: &Identifier) -> String {
    format!("{alias}.{}", column.quoted())
}
