//! Parameterized SQL assembly for the `users` table.
//!
//! Every caller-supplied value travels as a positional parameter (`$1`, `$2`, ...).
//! Only the static templates below and allow-listed column names ever reach
//! the SQL text.

use sea_orm::{DbBackend, Statement, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{PageSpec, SortSpec, UserChanges, UserFilter};

pub const USERS_TABLE: &str = "users";

pub const USER_COLUMNS: &str =
    "id, email, full_name, phone, role, is_active, created_at, updated_at";

const DEFAULT_SORT_COLUMN: &str = "created_at";

/// Columns a listing may be ordered by
const SORTABLE_COLUMNS: [&str; 7] = [
    "id",
    "email",
    "full_name",
    "role",
    "is_active",
    "created_at",
    "updated_at",
];

/// Marker replaced by the positional placeholder of the fragment's value
const PARAM: &str = "{p}";

/// A SQL fragment template paired with the single value it binds.
/// The template may reference that value more than once.
#[derive(Debug, Clone)]
struct Fragment {
    template: &'static str,
    value: Value,
}

impl Fragment {
    fn new(template: &'static str, value: impl Into<Value>) -> Self {
        Self {
            template,
            value: value.into(),
        }
    }
}

/// Positional parameter list. Placeholders are numbered from 1 in bind order.
#[derive(Debug, Default)]
struct Params {
    values: Vec<Value>,
}

impl Params {
    fn starting_with(values: Vec<Value>) -> Self {
        Self { values }
    }

    fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    fn render(&mut self, fragment: Fragment) -> String {
        let placeholder = self.bind(fragment.value);
        fragment.template.replace(PARAM, &placeholder)
    }

    fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Boolean predicate over `users` rows plus its bound values.
/// An empty expression means the query carries no WHERE clause at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    pub sql: String,
    pub values: Vec<Value>,
}

impl FilterExpression {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    fn where_clause(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Translate listing criteria into an AND-joined predicate.
///
/// Conditions are emitted in a fixed order (role, is_active, search,
/// email_domain, created_from, created_to, updated_from, updated_to) so the
/// placeholder numbering is deterministic for a given set of criteria.
pub fn build_filter_expression(filter: Option<&UserFilter>) -> FilterExpression {
    let Some(filter) = filter else {
        return FilterExpression::default();
    };

    let mut fragments = Vec::new();

    if let Some(role) = filter.role {
        fragments.push(Fragment::new("role = {p}", role.as_str()));
    }
    if let Some(is_active) = filter.is_active {
        fragments.push(Fragment::new("is_active = {p}", is_active));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            fragments.push(Fragment::new(
                "(LOWER(full_name) LIKE LOWER({p}) OR LOWER(email) LIKE LOWER({p}))",
                format!("%{search}%"),
            ));
        }
    }
    if let Some(domain) = filter.email_domain.as_deref() {
        if !domain.is_empty() {
            fragments.push(Fragment::new("email LIKE {p}", format!("%@{domain}%")));
        }
    }
    if let Some(from) = filter.created_from {
        fragments.push(Fragment::new("created_at >= {p}", from));
    }
    if let Some(to) = filter.created_to {
        fragments.push(Fragment::new("created_at <= {p}", to));
    }
    if let Some(from) = filter.updated_from {
        fragments.push(Fragment::new("updated_at >= {p}", from));
    }
    if let Some(to) = filter.updated_to {
        fragments.push(Fragment::new("updated_at <= {p}", to));
    }

    let mut params = Params::default();
    let conditions: Vec<String> = fragments
        .into_iter()
        .map(|fragment| params.render(fragment))
        .collect();

    FilterExpression {
        sql: conditions.join(" AND "),
        values: params.into_values(),
    }
}

/// Translate a sort request into an ORDER BY clause.
///
/// Field names outside the allow-list fall back to `created_at` instead of
/// failing; the name is never copied into the SQL.
pub fn build_order_expression(sort: Option<&SortSpec>) -> String {
    let Some(sort) = sort else {
        return format!("ORDER BY {DEFAULT_SORT_COLUMN} ASC");
    };

    let column = SORTABLE_COLUMNS
        .iter()
        .find(|column| **column == sort.field)
        .copied()
        .unwrap_or(DEFAULT_SORT_COLUMN);

    format!("ORDER BY {} {}", column, sort.order.as_sql())
}

/// Whether `field` is accepted by [`build_order_expression`] as-is
pub fn is_sortable(field: &str) -> bool {
    SORTABLE_COLUMNS.contains(&field)
}

/// `SELECT COUNT(*)` over the rows matching `filter`
pub fn build_count_statement(filter: &FilterExpression) -> Statement {
    let sql = format!(
        "SELECT COUNT(*) AS count FROM {USERS_TABLE}{}",
        filter.where_clause()
    );

    Statement::from_sql_and_values(DbBackend::Postgres, sql, filter.values.clone())
}

/// Page of rows matching `filter`. Page size and offset are bound after the
/// filter values, as the last two parameters.
pub fn build_list_statement(filter: &FilterExpression, order: &str, page: &PageSpec) -> Statement {
    let mut params = Params::starting_with(filter.values.clone());
    let limit = params.bind(to_bigint(page.page_size()));
    let offset = params.bind(to_bigint(page.offset()));

    let sql = format!(
        "SELECT {USER_COLUMNS} FROM {USERS_TABLE}{} {order} LIMIT {limit} OFFSET {offset}",
        filter.where_clause()
    );

    Statement::from_sql_and_values(DbBackend::Postgres, sql, params.into_values())
}

/// Lightweight existence probe by primary key
pub fn build_exists_statement(id: Uuid) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!("SELECT id FROM {USERS_TABLE} WHERE id = $1"),
        [Value::from(id)],
    )
}

/// Partial update touching only the supplied columns plus `updated_at`.
///
/// Returns `None` when `changes` carries no settable field, since the
/// statement would only bump the timestamp.
pub fn build_update_statement(
    id: Uuid,
    changes: &UserChanges,
    now: OffsetDateTime,
) -> Option<Statement> {
    let mut assignments = Vec::new();

    if let Some(email) = &changes.email {
        assignments.push(Fragment::new("email = {p}", email.clone()));
    }
    if let Some(full_name) = &changes.full_name {
        assignments.push(Fragment::new("full_name = {p}", full_name.clone()));
    }
    if let Some(phone) = &changes.phone {
        assignments.push(Fragment::new("phone = {p}", phone.clone()));
    }
    if let Some(role) = changes.role {
        assignments.push(Fragment::new("role = {p}", role.as_str()));
    }
    if let Some(is_active) = changes.is_active {
        assignments.push(Fragment::new("is_active = {p}", is_active));
    }

    if assignments.is_empty() {
        return None;
    }

    assignments.push(Fragment::new("updated_at = {p}", now));

    let mut params = Params::default();
    let set_clause: Vec<String> = assignments
        .into_iter()
        .map(|fragment| params.render(fragment))
        .collect();
    let id_param = params.bind(Value::from(id));

    let sql = format!(
        "UPDATE {USERS_TABLE} SET {} WHERE id = {id_param} RETURNING {USER_COLUMNS}",
        set_clause.join(", ")
    );

    Some(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        params.into_values(),
    ))
}

fn to_bigint(value: u64) -> Value {
    Value::BigInt(Some(i64::try_from(value).unwrap_or(i64::MAX)))
}
