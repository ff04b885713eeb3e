use std::collections::BTreeMap;

use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr, Value};
use serde_json::{json, Value as Json};
use time::macros::datetime;
use uuid::Uuid;

use user_service::entity::user;

/// Empty Postgres mock
pub fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

/// Stored user row as the database would return it
#[allow(dead_code)]
pub fn user_row(email: &str, role: &str) -> user::Model {
    user::Model {
        id: Uuid::new_v4(),
        email: email.to_string(),
        full_name: "Test User".to_string(),
        phone: None,
        role: role.to_string(),
        is_active: true,
        created_at: datetime!(2024-01-15 09:30 UTC),
        updated_at: datetime!(2024-01-15 09:30 UTC),
    }
}

/// Row returned by the existence probe
#[allow(dead_code)]
pub fn id_row(id: Uuid) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("id", Value::from(id))])
}

/// Row returned by the count query
#[allow(dead_code)]
pub fn count_row(count: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("count", Value::BigInt(Some(count)))])
}

#[allow(dead_code)]
pub fn deleted(rows: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: rows,
    }
}

#[allow(dead_code)]
pub fn store_error(message: &str) -> DbErr {
    DbErr::Query(RuntimeErr::Internal(message.to_string()))
}

#[allow(dead_code)]
pub fn duplicate_email() -> DbErr {
    store_error("duplicate key value violates unique constraint \"users_email_key\"")
}

/// Valid create payload with a unique email under the given domain
#[allow(dead_code)]
pub fn create_payload(domain: &str, role: &str) -> Json {
    json!({
        "email": format!("user-{}@{}", Uuid::new_v4(), domain),
        "full_name": "Test User",
        "role": role
    })
}
